use crate::ast::{Block, Call, Expr, Hash, Mustache, Partial, PathExpr, Program, Statement};
use crate::error::LineIndex;
use crate::lexer::{Scanner, Segment, Tag, TagKind, Token, TokenKind};
use crate::{CompileError, SourceLocation, whitespace};

/// Parses template source into a [`Program`].
pub fn parse(source: &str) -> Result<Program, CompileError> {
    let lines = LineIndex::new(source);
    let mut segments = Scanner::new(source, &lines).scan()?;
    whitespace::apply(&mut segments);
    TreeBuilder {
        lines: &lines,
        frames: Vec::new(),
        root: Vec::new(),
    }
    .build(segments)
}

/// An open block waiting for its closing tag.
struct Frame {
    call: Call,
    block_params: Vec<String>,
    start: usize,
    inverted: bool,
    /// Opened by `{{else name}}`; closed implicitly by the enclosing block's close tag.
    chained: bool,
    program: Vec<Statement>,
    inverse: Option<Vec<Statement>>,
}

impl Frame {
    fn body(&mut self) -> &mut Vec<Statement> {
        match &mut self.inverse {
            Some(inverse) => inverse,
            None => &mut self.program,
        }
    }

    fn finish(mut self, location: SourceLocation) -> Statement {
        self.call.location = location;
        let program = Program {
            body: self.program,
            block_params: self.block_params,
        };
        let inverse = self.inverse.map(|body| Program {
            body,
            block_params: Vec::new(),
        });
        let (program, inverse) = if self.inverted {
            (inverse, Some(program))
        } else {
            (Some(program), inverse)
        };
        Statement::Block(Block {
            call: self.call,
            program,
            inverse,
        })
    }
}

struct TreeBuilder<'a> {
    lines: &'a LineIndex<'a>,
    frames: Vec<Frame>,
    root: Vec<Statement>,
}

impl TreeBuilder<'_> {
    fn build(mut self, segments: Vec<Segment>) -> Result<Program, CompileError> {
        for segment in segments {
            match segment {
                Segment::Content(content) => {
                    if !content.value.is_empty() {
                        self.body().push(Statement::Content(content.value));
                    }
                }
                Segment::Tag(tag) => self.tag(tag)?,
            }
        }

        if let Some(frame) = self.frames.pop() {
            return Err(CompileError::syntax(
                format!("unclosed block '{}'", frame.call.path.original),
                self.lines.location(frame.start, frame.start),
            ));
        }
        Ok(Program {
            body: self.root,
            block_params: Vec::new(),
        })
    }

    fn body(&mut self) -> &mut Vec<Statement> {
        match self.frames.last_mut() {
            Some(frame) => frame.body(),
            None => &mut self.root,
        }
    }

    fn tag(&mut self, tag: Tag) -> Result<(), CompileError> {
        let location = self.lines.location(tag.start, tag.end);
        let mut tokens = Tokens::new(&tag.tokens, self.lines, location);
        match tag.kind {
            TagKind::Comment => {}
            TagKind::Mustache { escaped } => {
                let call = tokens.call(location)?;
                tokens.expect_end()?;
                let mustache = Mustache { call, escaped };
                self.body().push(Statement::Mustache(mustache));
            }
            TagKind::Partial => {
                if tokens.peek_is(|kind| matches!(kind, TokenKind::OpenSexpr)) {
                    return Err(CompileError::syntax(
                        "dynamic partial names are not supported",
                        location,
                    ));
                }
                let call = tokens.call(location)?;
                tokens.expect_end()?;
                let count = call.params.len();
                if count > 1 {
                    return Err(CompileError::semantic(
                        format!("Unsupported number of partial arguments: {count}"),
                        location,
                    ));
                }
                self.body().push(Statement::Partial(Partial {
                    name: call.path.original,
                    params: call.params,
                    hash: call.hash,
                    indent: tag.indent,
                    location,
                }));
            }
            TagKind::BlockOpen | TagKind::InverseOpen => {
                let call = tokens.call(location)?;
                let block_params = tokens.block_params()?;
                tokens.expect_end()?;
                self.frames.push(Frame {
                    call,
                    block_params,
                    start: tag.start,
                    inverted: tag.kind == TagKind::InverseOpen,
                    chained: false,
                    program: Vec::new(),
                    inverse: None,
                });
            }
            TagKind::Else => {
                let Some(frame) = self.frames.last_mut() else {
                    return Err(CompileError::syntax("unexpected {{else}}", location));
                };
                if frame.inverse.is_some() {
                    return Err(CompileError::syntax(
                        format!("duplicate {{{{else}}}} in '{}'", frame.call.path.original),
                        location,
                    ));
                }
                frame.inverse = Some(Vec::new());
                if !tokens.is_empty() {
                    let call = tokens.call(location)?;
                    let block_params = tokens.block_params()?;
                    tokens.expect_end()?;
                    self.frames.push(Frame {
                        call,
                        block_params,
                        start: tag.start,
                        inverted: false,
                        chained: true,
                        program: Vec::new(),
                        inverse: None,
                    });
                }
            }
            TagKind::Close => {
                let close = tokens.path_or_literal()?;
                tokens.expect_end()?;
                self.close(close, &tag)?;
            }
        }
        Ok(())
    }

    fn close(&mut self, close: PathExpr, tag: &Tag) -> Result<(), CompileError> {
        loop {
            let Some(frame) = self.frames.pop() else {
                return Err(CompileError::syntax(
                    format!("unexpected closing tag '{}'", close.original),
                    self.lines.location(tag.start, tag.end),
                ));
            };
            let location = self.lines.location(frame.start, tag.end);
            if frame.chained {
                let block = frame.finish(location);
                self.body().push(block);
                continue;
            }
            let open = &frame.call.path.original;
            if *open != close.original {
                return Err(CompileError::semantic(
                    format!("{open} doesn't match {}", close.original),
                    location,
                ));
            }
            let block = frame.finish(location);
            self.body().push(block);
            return Ok(());
        }
    }
}

/// Cursor over the tokens of one tag.
struct Tokens<'a> {
    tokens: &'a [Token],
    ix: usize,
    lines: &'a LineIndex<'a>,
    tag_location: SourceLocation,
}

impl<'a> Tokens<'a> {
    fn new(tokens: &'a [Token], lines: &'a LineIndex<'a>, tag_location: SourceLocation) -> Self {
        Self {
            tokens,
            ix: 0,
            lines,
            tag_location,
        }
    }

    fn is_empty(&self) -> bool {
        self.ix >= self.tokens.len()
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.ix)
    }

    fn peek_is(&self, predicate: impl FnOnce(&TokenKind) -> bool) -> bool {
        self.peek().is_some_and(|token| predicate(&token.kind))
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.ix)?;
        self.ix += 1;
        Some(token)
    }

    fn unexpected(&self, token: Option<&Token>, expected: &str) -> CompileError {
        match token {
            Some(token) => CompileError::syntax(
                format!("expected {expected}, got {}", describe(&token.kind)),
                self.lines.location(token.start, token.end),
            ),
            None => CompileError::syntax(format!("expected {expected}"), self.tag_location),
        }
    }

    fn expect_end(&mut self) -> Result<(), CompileError> {
        match self.peek() {
            None => Ok(()),
            token => Err(self.unexpected(token, "end of tag")),
        }
    }

    /// `head param* (key=value)*`, where a literal head is read as a path.
    fn call(&mut self, location: SourceLocation) -> Result<Call, CompileError> {
        let path = self.path_or_literal()?;
        let mut params = Vec::new();
        let mut pairs = Vec::new();
        while let Some(token) = self.peek() {
            if matches!(
                token.kind,
                TokenKind::CloseSexpr | TokenKind::OpenBlockParams
            ) {
                break;
            }
            let key = match (&token.kind, self.tokens.get(self.ix + 1)) {
                (TokenKind::Id(key) | TokenKind::LiteralId(key), Some(next))
                    if next.kind == TokenKind::Equals =>
                {
                    Some(key.clone())
                }
                _ => None,
            };
            if let Some(key) = key {
                self.ix += 2;
                pairs.push((key, self.expr()?));
            } else if !pairs.is_empty() {
                return Err(self.unexpected(Some(token), "hash argument"));
            } else {
                params.push(self.expr()?);
            }
        }
        Ok(Call {
            path,
            params,
            hash: (!pairs.is_empty()).then_some(Hash { pairs }),
            location,
        })
    }

    fn block_params(&mut self) -> Result<Vec<String>, CompileError> {
        if !self.peek_is(|kind| *kind == TokenKind::OpenBlockParams) {
            return Ok(Vec::new());
        }
        self.ix += 1;
        let mut names = Vec::new();
        loop {
            match self.next() {
                Some(Token {
                    kind: TokenKind::Id(name),
                    ..
                }) => names.push(name.clone()),
                Some(Token {
                    kind: TokenKind::CloseBlockParams,
                    ..
                }) if !names.is_empty() => return Ok(names),
                token => return Err(self.unexpected(token, "block parameter name")),
            }
        }
    }

    fn expr(&mut self) -> Result<Expr, CompileError> {
        let Some(token) = self.peek() else {
            return Err(self.unexpected(None, "expression"));
        };
        let expr = match &token.kind {
            TokenKind::OpenSexpr => {
                self.ix += 1;
                let start = token.start;
                let mut call = self.call(self.tag_location)?;
                match self.next() {
                    Some(close @ Token {
                        kind: TokenKind::CloseSexpr,
                        ..
                    }) => call.location = self.lines.location(start, close.end),
                    token => return Err(self.unexpected(token, "')'")),
                }
                return Ok(Expr::SubExpr(Box::new(call)));
            }
            TokenKind::String(value) => Expr::String(value.clone()),
            TokenKind::Number(value) => Expr::Number(value.clone()),
            TokenKind::Boolean(value) => Expr::Boolean(*value),
            TokenKind::Null => Expr::Null,
            TokenKind::Undefined => Expr::Undefined,
            TokenKind::Data | TokenKind::Id(_) | TokenKind::LiteralId(_) => {
                return Ok(Expr::Path(self.path()?));
            }
            _ => return Err(self.unexpected(Some(token), "expression")),
        };
        self.ix += 1;
        Ok(expr)
    }

    /// A path, or a literal standing in for one (`{{"with space"}}`, `{{/"name"}}`).
    fn path_or_literal(&mut self) -> Result<PathExpr, CompileError> {
        let Some(token) = self.peek() else {
            return Err(self.unexpected(None, "helper name or path"));
        };
        let literal = match &token.kind {
            TokenKind::String(value) | TokenKind::Number(value) => value.clone(),
            TokenKind::Boolean(value) => value.to_string(),
            TokenKind::Null => "null".to_string(),
            TokenKind::Undefined => "undefined".to_string(),
            TokenKind::Data | TokenKind::Id(_) | TokenKind::LiteralId(_) => return self.path(),
            TokenKind::OpenSexpr => {
                return Err(CompileError::syntax(
                    "subexpressions cannot be used as helper names",
                    self.lines.location(token.start, token.end),
                ));
            }
            _ => return Err(self.unexpected(Some(token), "helper name or path")),
        };
        self.ix += 1;
        Ok(PathExpr {
            data: false,
            depth: 0,
            parts: vec![literal.clone()],
            original: literal,
            location: self.lines.location(token.start, token.end),
        })
    }

    fn path(&mut self) -> Result<PathExpr, CompileError> {
        let start = self.peek().map_or(0, |token| token.start);
        let data = self.peek_is(|kind| *kind == TokenKind::Data);
        if data {
            self.ix += 1;
        }

        let mut segments = Vec::new();
        let mut separator = None;
        let mut end = start;
        loop {
            let token = self.next();
            let (part, literal) = match token.map(|token| &token.kind) {
                Some(TokenKind::Id(part)) => (part.clone(), false),
                Some(TokenKind::LiteralId(part)) => (part.clone(), true),
                _ => return Err(self.unexpected(token, "path segment")),
            };
            end = token.map_or(end, |token| token.end);
            segments.push(PathSegment {
                part,
                literal,
                separator,
            });

            match (self.tokens.get(self.ix), self.tokens.get(self.ix + 1)) {
                (
                    Some(Token {
                        kind: TokenKind::Sep(sep),
                        start: sep_start,
                        end: sep_end,
                    }),
                    Some(next),
                ) if *sep_start == end
                    && next.start == *sep_end
                    && matches!(next.kind, TokenKind::Id(_) | TokenKind::LiteralId(_)) =>
                {
                    separator = Some(*sep);
                    self.ix += 1;
                }
                _ => break,
            }
        }

        prepare_path(data, segments, self.lines.location(start, end))
    }
}

struct PathSegment {
    part: String,
    /// Written as `[part]`, so never read as `this`, `.` or `..`.
    literal: bool,
    separator: Option<char>,
}

/// Folds `this`, `.` and `..` segments into the path's depth.
fn prepare_path(
    data: bool,
    segments: Vec<PathSegment>,
    location: SourceLocation,
) -> Result<PathExpr, CompileError> {
    let mut original = String::from(if data { "@" } else { "" });
    let mut parts = Vec::new();
    let mut depth = 0;
    for segment in segments {
        original.extend(segment.separator);
        original.push_str(&segment.part);
        if !segment.literal && matches!(segment.part.as_str(), ".." | "." | "this") {
            if !parts.is_empty() {
                return Err(CompileError::semantic(
                    format!("Invalid path: {original}"),
                    location,
                ));
            }
            if segment.part == ".." {
                depth += 1;
            }
        } else {
            parts.push(segment.part);
        }
    }
    Ok(PathExpr {
        data,
        depth,
        parts,
        original,
        location,
    })
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Id(id) => format!("'{id}'"),
        TokenKind::LiteralId(id) => format!("'[{id}]'"),
        TokenKind::Sep(sep) => format!("'{sep}'"),
        TokenKind::Data => "'@'".into(),
        TokenKind::String(value) => format!("string {value:?}"),
        TokenKind::Number(value) => format!("number {value}"),
        TokenKind::Boolean(value) => format!("'{value}'"),
        TokenKind::Null => "'null'".into(),
        TokenKind::Undefined => "'undefined'".into(),
        TokenKind::OpenSexpr => "'('".into(),
        TokenKind::CloseSexpr => "')'".into(),
        TokenKind::Equals => "'='".into(),
        TokenKind::OpenBlockParams => "'as |'".into(),
        TokenKind::CloseBlockParams => "'|'".into(),
    }
}
