//! Splits template source into content runs and mustache tags, and tokenizes
//! the inside of each tag.

use crate::CompileError;
use crate::error::LineIndex;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    Content(Content),
    Tag(Tag),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Content {
    /// Text after whitespace control has been applied.
    pub value: String,
    /// Text exactly as written, used to detect standalone lines.
    pub original: String,
    pub leading_stripped: bool,
    pub trailing_stripped: bool,
}

impl Content {
    fn new(text: String) -> Self {
        Self {
            original: text.clone(),
            value: text,
            leading_stripped: false,
            trailing_stripped: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagKind {
    Mustache { escaped: bool },
    BlockOpen,
    InverseOpen,
    /// `{{else}}`, `{{^}}` or a chained `{{else name ...}}`.
    Else,
    Close,
    Partial,
    Comment,
}

impl TagKind {
    /// Whether the tag disappears together with its line when it stands alone on it.
    pub fn can_stand_alone(self) -> bool {
        !matches!(self, Self::Mustache { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Tag {
    pub kind: TagKind,
    pub tokens: Vec<Token>,
    pub strip_open: bool,
    pub strip_close: bool,
    /// Byte range of the whole tag, braces included.
    pub start: usize,
    pub end: usize,
    pub indent: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Id(String),
    /// `[segment]` written with brackets; never treated as `this` or `..`.
    LiteralId(String),
    /// `.` or `/` between path segments.
    Sep(char),
    Data,
    String(String),
    Number(String),
    Boolean(bool),
    Null,
    Undefined,
    OpenSexpr,
    CloseSexpr,
    Equals,
    OpenBlockParams,
    CloseBlockParams,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

pub(crate) struct Scanner<'a> {
    source: &'a str,
    lines: &'a LineIndex<'a>,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str, lines: &'a LineIndex<'a>) -> Self {
        Self {
            source,
            lines,
            pos: 0,
        }
    }

    pub fn scan(mut self) -> Result<Vec<Segment>, CompileError> {
        let mut segments = Vec::new();
        let mut text = String::new();
        loop {
            let rest = self.rest();
            let Some(found) = rest.find("{{") else {
                text.push_str(rest);
                break;
            };
            let before = &rest[..found];
            let open = self.pos + found;
            if let Some(escaped) = before.strip_suffix('\\') {
                if let Some(backslash) = escaped.strip_suffix('\\') {
                    // `\\{{` is a literal backslash followed by a real tag.
                    text.push_str(backslash);
                    text.push('\\');
                } else {
                    text.push_str(escaped);
                    text.push_str("{{");
                    self.pos = open + 2;
                    continue;
                }
            } else {
                text.push_str(before);
            }

            self.pos = open;
            if !text.is_empty() {
                segments.push(Segment::Content(Content::new(std::mem::take(&mut text))));
            }
            segments.push(Segment::Tag(self.scan_tag()?));
        }
        if !text.is_empty() {
            segments.push(Segment::Content(Content::new(text)));
        }
        Ok(segments)
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn eat(&mut self, prefix: &str) -> bool {
        if self.rest().starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    fn error_at(&self, message: impl Into<String>, start: usize, end: usize) -> CompileError {
        CompileError::syntax(message, self.lines.location(start, end))
    }

    fn scan_tag(&mut self) -> Result<Tag, CompileError> {
        let start = self.pos;
        if self.rest().starts_with("{{{{") {
            return Err(self.error_at("raw blocks are not supported", start, start + 4));
        }

        if self.eat("{{{") {
            let strip_open = self.eat("~");
            let (tokens, strip_close) = self.scan_tokens(start, "}}}")?;
            return Ok(self.tag(
                TagKind::Mustache { escaped: false },
                tokens,
                strip_open,
                strip_close,
                start,
            ));
        }

        self.pos += 2;
        let strip_open = self.eat("~");

        if self.eat("!--") {
            return self.scan_comment(start, strip_open, "--");
        }
        if self.eat("!") {
            return self.scan_comment(start, strip_open, "");
        }

        let rest = self.rest();
        if rest.starts_with("#>") {
            return Err(self.error_at("partial blocks are not supported", start, self.pos + 2));
        }
        if rest.starts_with("#*") || rest.starts_with('*') {
            return Err(self.error_at("decorators are not supported", start, self.pos + 2));
        }

        let kind = if self.eat("#") {
            TagKind::BlockOpen
        } else if self.eat("^") {
            if self.at_tag_close("}}") {
                TagKind::Else
            } else {
                TagKind::InverseOpen
            }
        } else if self.eat("/") {
            TagKind::Close
        } else if self.eat(">") {
            TagKind::Partial
        } else if self.eat("&") {
            TagKind::Mustache { escaped: false }
        } else if self.eat_else_keyword() {
            TagKind::Else
        } else {
            TagKind::Mustache { escaped: true }
        };

        let (tokens, strip_close) = self.scan_tokens(start, "}}")?;
        Ok(self.tag(kind, tokens, strip_open, strip_close, start))
    }

    fn tag(
        &self,
        kind: TagKind,
        tokens: Vec<Token>,
        strip_open: bool,
        strip_close: bool,
        start: usize,
    ) -> Tag {
        Tag {
            kind,
            tokens,
            strip_open,
            strip_close,
            start,
            end: self.pos,
            indent: String::new(),
        }
    }

    fn at_tag_close(&self, close: &str) -> bool {
        let rest = self.rest().trim_start();
        rest.starts_with(close) || rest.strip_prefix('~').is_some_and(|r| r.starts_with(close))
    }

    fn eat_else_keyword(&mut self) -> bool {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        let Some(after) = trimmed.strip_prefix("else") else {
            return false;
        };
        if after
            .chars()
            .next()
            .is_some_and(|c| c.is_whitespace() || c == '~' || c == '}')
        {
            self.pos += rest.len() - after.len();
            true
        } else {
            false
        }
    }

    fn scan_comment(
        &mut self,
        start: usize,
        strip_open: bool,
        dashes: &str,
    ) -> Result<Tag, CompileError> {
        let mut search_from = self.pos;
        loop {
            let Some(found) = self
                .source
                .get(search_from..)
                .and_then(|rest| rest.find(dashes))
                .map(|ix| ix + search_from)
            else {
                break;
            };
            let after = &self.source[found + dashes.len()..];
            let strip_close = after.starts_with("~}}");
            if strip_close || after.starts_with("}}") {
                self.pos = found + dashes.len() + if strip_close { 3 } else { 2 };
                return Ok(self.tag(TagKind::Comment, Vec::new(), strip_open, strip_close, start));
            }
            let Some(next) = self.source[found..].chars().next() else {
                break;
            };
            search_from = found + next.len_utf8();
        }
        Err(self.error_at("unterminated comment", start, self.source.len()))
    }

    fn scan_tokens(
        &mut self,
        tag_start: usize,
        close: &str,
    ) -> Result<(Vec<Token>, bool), CompileError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(self.error_at("unclosed mustache", tag_start, self.source.len()));
            }
            if rest.strip_prefix('~').is_some_and(|r| r.starts_with(close)) {
                self.pos += 1 + close.len();
                return Ok((tokens, true));
            }
            if rest.starts_with(close) {
                self.pos += close.len();
                return Ok((tokens, false));
            }
            tokens.push(self.scan_token()?);
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn scan_token(&mut self) -> Result<Token, CompileError> {
        let start = self.pos;
        let rest = self.rest();
        let Some(first) = rest.chars().next() else {
            return Err(self.error_at("unexpected end of template", start, start));
        };

        let (kind, len) = match first {
            '(' => (TokenKind::OpenSexpr, 1),
            ')' => (TokenKind::CloseSexpr, 1),
            '=' => (TokenKind::Equals, 1),
            '|' => (TokenKind::CloseBlockParams, 1),
            '@' => (TokenKind::Data, 1),
            '"' | '\'' => self.string_literal(first)?,
            '[' => self.segment_literal()?,
            _ if rest.starts_with("..") && is_id_lookahead(&rest[2..]) => {
                (TokenKind::Id("..".into()), 2)
            }
            '.' if is_id_lookahead(&rest[1..]) => (TokenKind::Id(".".into()), 1),
            '.' | '/' => (TokenKind::Sep(first), 1),
            _ => {
                if let Some(len) = number_literal(rest) {
                    (TokenKind::Number(rest[..len].to_string()), len)
                } else if let Some((kind, len)) = keyword_literal(rest) {
                    (kind, len)
                } else if let Some(len) = open_block_params(rest) {
                    (TokenKind::OpenBlockParams, len)
                } else {
                    let len: usize = rest
                        .chars()
                        .take_while(|c| is_id_char(*c))
                        .map(char::len_utf8)
                        .sum();
                    if len == 0 {
                        return Err(self.error_at(
                            format!("unexpected character '{first}'"),
                            start,
                            start + first.len_utf8(),
                        ));
                    }
                    (TokenKind::Id(rest[..len].to_string()), len)
                }
            }
        };

        self.pos += len;
        Ok(Token {
            kind,
            start,
            end: self.pos,
        })
    }

    fn string_literal(&self, quote: char) -> Result<(TokenKind, usize), CompileError> {
        let rest = self.rest();
        let mut value = String::new();
        let mut chars = rest.char_indices().skip(1);
        while let Some((ix, c)) = chars.next() {
            if c == '\\' && rest[ix + 1..].starts_with(quote) {
                value.push(quote);
                chars.next();
            } else if c == quote {
                return Ok((TokenKind::String(value), ix + 1));
            } else {
                value.push(c);
            }
        }
        Err(self.error_at("unterminated string literal", self.pos, self.source.len()))
    }

    fn segment_literal(&self) -> Result<(TokenKind, usize), CompileError> {
        let rest = self.rest();
        let mut value = String::new();
        let mut chars = rest.char_indices().skip(1);
        while let Some((ix, c)) = chars.next() {
            match c {
                '\\' if rest[ix + 1..].starts_with([']', '\\']) => {
                    if let Some((_, escaped)) = chars.next() {
                        value.push(escaped);
                    }
                }
                ']' => return Ok((TokenKind::LiteralId(value), ix + 1)),
                _ => value.push(c),
            }
        }
        Err(self.error_at("unterminated path segment", self.pos, self.source.len()))
    }
}

fn is_id_char(c: char) -> bool {
    !c.is_whitespace()
        && !matches!(
            c,
            '!' | '"'
                | '#'
                | '%'
                | '&'
                | '\''
                | '('
                | ')'
                | '*'
                | '+'
                | ','
                | '.'
                | '/'
                | ';'
                | '<'
                | '='
                | '>'
                | '@'
                | '['
                | '\\'
                | ']'
                | '^'
                | '`'
                | '{'
                | '|'
                | '}'
                | '~'
        )
}

/// Characters that may follow an identifier.
fn is_id_lookahead(rest: &str) -> bool {
    rest.chars().next().is_none_or(|c| {
        c.is_whitespace() || matches!(c, '=' | '~' | '}' | '/' | '.' | ')' | '|')
    })
}

/// Characters that may follow a number or keyword literal.
fn is_literal_lookahead(rest: &str) -> bool {
    rest.chars()
        .next()
        .is_none_or(|c| c.is_whitespace() || matches!(c, '~' | '}' | ')'))
}

fn number_literal(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    let mut len = usize::from(bytes.first() == Some(&b'-'));
    let digits = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };
    let integer = digits(len);
    if integer == 0 {
        return None;
    }
    len += integer;
    if bytes.get(len) == Some(&b'.') {
        let fraction = digits(len + 1);
        if fraction > 0 {
            len += 1 + fraction;
        }
    }
    is_literal_lookahead(&rest[len..]).then_some(len)
}

fn keyword_literal(rest: &str) -> Option<(TokenKind, usize)> {
    [
        ("true", TokenKind::Boolean(true)),
        ("false", TokenKind::Boolean(false)),
        ("null", TokenKind::Null),
        ("undefined", TokenKind::Undefined),
    ]
    .into_iter()
    .find(|(keyword, _)| {
        rest.strip_prefix(keyword)
            .is_some_and(is_literal_lookahead)
    })
    .map(|(keyword, kind)| (kind, keyword.len()))
}

/// `as |`, which opens a block parameter list.
fn open_block_params(rest: &str) -> Option<usize> {
    let after = rest.strip_prefix("as")?;
    let trimmed = after.trim_start();
    if trimmed.len() == after.len() || !trimmed.starts_with('|') {
        return None;
    }
    Some(rest.len() - trimmed.len() + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scan(source: &str) -> Vec<Segment> {
        let lines = LineIndex::new(source);
        Scanner::new(source, &lines).scan().unwrap()
    }

    fn token_kinds(source: &str) -> Vec<TokenKind> {
        match scan(source).into_iter().next() {
            Some(Segment::Tag(tag)) => tag.tokens.into_iter().map(|t| t.kind).collect(),
            other => panic!("expected a tag, got {other:?}"),
        }
    }

    #[test]
    fn test_tag_kinds() {
        let template = "a{{b}}{{{c}}}{{&d}}{{#e}}{{^}}{{else}}{{^f}}{{/e}}{{> g}}{{! h }}";
        let kinds: Vec<_> = scan(template)
            .into_iter()
            .filter_map(|segment| match segment {
                Segment::Tag(tag) => Some(tag.kind),
                Segment::Content(_) => None,
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                TagKind::Mustache { escaped: true },
                TagKind::Mustache { escaped: false },
                TagKind::Mustache { escaped: false },
                TagKind::BlockOpen,
                TagKind::Else,
                TagKind::Else,
                TagKind::InverseOpen,
                TagKind::Close,
                TagKind::Partial,
                TagKind::Comment,
            ]
        );
    }

    #[test]
    fn test_tokens() {
        assert_eq!(
            token_kinds(
                r#"{{foo ../bar.baz @index "q\"s" 'x' -1.5 true null undefined [a b] k=(v)}}"#
            ),
            vec![
                TokenKind::Id("foo".into()),
                TokenKind::Id("..".into()),
                TokenKind::Sep('/'),
                TokenKind::Id("bar".into()),
                TokenKind::Sep('.'),
                TokenKind::Id("baz".into()),
                TokenKind::Data,
                TokenKind::Id("index".into()),
                TokenKind::String("q\"s".into()),
                TokenKind::String("x".into()),
                TokenKind::Number("-1.5".into()),
                TokenKind::Boolean(true),
                TokenKind::Null,
                TokenKind::Undefined,
                TokenKind::LiteralId("a b".into()),
                TokenKind::Id("k".into()),
                TokenKind::Equals,
                TokenKind::OpenSexpr,
                TokenKind::Id("v".into()),
                TokenKind::CloseSexpr,
            ]
        );
        assert_eq!(
            token_kinds("{{#each items as |item idx|}}"),
            vec![
                TokenKind::Id("each".into()),
                TokenKind::Id("items".into()),
                TokenKind::OpenBlockParams,
                TokenKind::Id("item".into()),
                TokenKind::Id("idx".into()),
                TokenKind::CloseBlockParams,
            ]
        );
        assert_eq!(
            token_kinds("{{truthy 12ab}}"),
            vec![TokenKind::Id("truthy".into()), TokenKind::Id("12ab".into())]
        );
    }

    #[test]
    fn test_escaped_mustaches_are_content() {
        assert_eq!(
            scan(r"a \{{b}} c"),
            vec![Segment::Content(Content::new("a {{b}} c".into()))]
        );
        let segments = scan(r"a \\{{b}}");
        assert_eq!(segments[0], Segment::Content(Content::new(r"a \".into())));
        assert!(matches!(segments[1], Segment::Tag(_)));
    }

    #[test]
    fn test_whitespace_control_flags() {
        let segments = scan("{{~#if a~}}{{!-- x }} --~}}");
        let Segment::Tag(open) = &segments[0] else {
            panic!("expected tag")
        };
        assert!(open.strip_open && open.strip_close);
        let Segment::Tag(comment) = &segments[1] else {
            panic!("expected tag")
        };
        assert_eq!(comment.kind, TagKind::Comment);
        assert!(!comment.strip_open && comment.strip_close);
    }

    #[test]
    fn test_unsupported_and_unclosed() {
        let lines = LineIndex::new("{{{{raw}}}}");
        let error = Scanner::new("{{{{raw}}}}", &lines).scan().unwrap_err();
        assert_eq!(
            error.to_string(),
            "Parse error on line 1: raw blocks are not supported"
        );

        let source = "line\n{{foo";
        let lines = LineIndex::new(source);
        let error = Scanner::new(source, &lines).scan().unwrap_err();
        assert_eq!(
            error.to_string(),
            "Parse error on line 2: unclosed mustache"
        );
    }
}
