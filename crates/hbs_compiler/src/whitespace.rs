//! Whitespace control: `~` markers and standalone lines.
//!
//! A block, else, close, comment or partial tag that is the only thing on its
//! line takes the line's indentation and newline with it. Partials remember the
//! indentation so the runtime can indent every line of the partial's output.

use crate::lexer::{Segment, TagKind};

pub(crate) fn apply(segments: &mut [Segment]) {
    for ix in 0..segments.len() {
        let Segment::Tag(tag) = &segments[ix] else {
            continue;
        };
        let (kind, strip_open, strip_close) = (tag.kind, tag.strip_open, tag.strip_close);

        if strip_close {
            strip_following(segments, ix, true);
        }
        if strip_open {
            strip_preceding(segments, ix, true);
        }

        if kind.can_stand_alone()
            && preceded_by_line_start(segments, ix)
            && followed_by_line_end(segments, ix)
        {
            strip_following(segments, ix, false);
            let indent = match ix.checked_sub(1).map(|prev| &segments[prev]) {
                Some(Segment::Content(content)) => trailing_blanks(&content.original).to_string(),
                _ => String::new(),
            };
            if strip_preceding(segments, ix, false)
                && kind == TagKind::Partial
                && let Segment::Tag(tag) = &mut segments[ix]
            {
                tag.indent = indent;
            }
        }
    }
}

fn trailing_blanks(text: &str) -> &str {
    &text[text.trim_end_matches([' ', '\t']).len()..]
}

fn preceded_by_line_start(segments: &[Segment], ix: usize) -> bool {
    let Some(prev) = ix.checked_sub(1) else {
        return true;
    };
    let Segment::Content(content) = &segments[prev] else {
        return false;
    };
    let text = content.original.as_str();
    let trimmed = text.trim_end();
    text[trimmed.len()..].contains('\n') || (prev == 0 && trimmed.is_empty())
}

fn followed_by_line_end(segments: &[Segment], ix: usize) -> bool {
    let Some(Segment::Content(content)) = segments.get(ix + 1) else {
        return ix + 1 == segments.len();
    };
    let text = content.original.as_str();
    let trimmed = text.trim_start();
    text[..text.len() - trimmed.len()].contains('\n')
        || (ix + 2 == segments.len() && trimmed.is_empty())
}

/// Strips whitespace from the start of the content after `ix`. Without `all`,
/// only blanks up to and including one newline go, and only once per content.
fn strip_following(segments: &mut [Segment], ix: usize, all: bool) -> bool {
    let Some(Segment::Content(content)) = segments.get_mut(ix + 1) else {
        return false;
    };
    if !all && content.leading_stripped {
        return false;
    }
    let value = content.value.as_str();
    let stripped = if all {
        value.trim_start()
    } else {
        let rest = value.trim_start_matches([' ', '\t']);
        rest.strip_prefix("\r\n")
            .or_else(|| rest.strip_prefix('\n'))
            .unwrap_or(rest)
    };
    let changed = stripped.len() != value.len();
    content.value = stripped.to_string();
    content.leading_stripped = changed;
    changed
}

/// Strips whitespace from the end of the content before `ix`. Without `all`,
/// only trailing blanks go, and only once per content.
fn strip_preceding(segments: &mut [Segment], ix: usize, all: bool) -> bool {
    let Some(prev) = ix.checked_sub(1) else {
        return false;
    };
    let Segment::Content(content) = &mut segments[prev] else {
        return false;
    };
    if !all && content.trailing_stripped {
        return false;
    }
    let value = content.value.as_str();
    let stripped = if all {
        value.trim_end()
    } else {
        value.trim_end_matches([' ', '\t'])
    };
    let changed = stripped.len() != value.len();
    content.value = stripped.to_string();
    content.trailing_stripped = changed;
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LineIndex;
    use crate::lexer::Scanner;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn contents(source: &str) -> Vec<String> {
        let lines = LineIndex::new(source);
        let mut segments = Scanner::new(source, &lines).scan().unwrap();
        apply(&mut segments);
        segments
            .into_iter()
            .filter_map(|segment| match segment {
                Segment::Content(content) => Some(content.value),
                Segment::Tag(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_standalone_block_lines_disappear() {
        let source = indoc! {"
            <ul>
              {{#each items}}
              <li>{{name}}</li>
              {{/each}}
            </ul>
        "};
        assert_eq!(
            contents(source),
            vec!["<ul>\n", "  <li>", "</li>\n", "</ul>\n"]
        );
    }

    #[test]
    fn test_inline_tags_keep_whitespace() {
        assert_eq!(contents("a {{#if x}} b {{/if}} c"), vec!["a ", " b ", " c"]);
    }

    #[test]
    fn test_tilde_strips_all_adjacent_whitespace() {
        assert_eq!(contents("a \n {{~x~}} \n b"), vec!["a", "b"]);
    }

    #[test]
    fn test_standalone_partial_records_indent() {
        let source = "x\n    {{> item}}\ny";
        let lines = LineIndex::new(source);
        let mut segments = Scanner::new(source, &lines).scan().unwrap();
        apply(&mut segments);
        let Segment::Tag(tag) = &segments[1] else {
            panic!("expected partial tag");
        };
        assert_eq!(tag.indent, "    ");
        assert_eq!(
            contents(source),
            vec!["x\n".to_string(), "y".to_string()]
        );
    }

    #[test]
    fn test_standalone_at_template_edges() {
        assert_eq!(contents("{{#if a}}\nx\n{{/if}}"), vec!["x\n"]);
        assert_eq!(contents("  {{! note }}\nbody"), vec!["", "body"]);
    }
}
