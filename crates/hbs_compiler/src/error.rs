use serde::Serialize;
use thiserror::Error;

/// A point in template source. Lines start at 1, columns at 0 and count chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// The span of a template node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct SourceLocation {
    pub start: Position,
    pub end: Position,
}

impl SourceLocation {
    /// The location as the runtime expects it in helper options (`options.loc`).
    pub fn to_json(&self) -> String {
        format!(
            "{{\"start\":{{\"line\":{},\"column\":{}}},\"end\":{{\"line\":{},\"column\":{}}}}}",
            self.start.line, self.start.column, self.end.line, self.end.column
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The template is not well-formed.
    #[error("Parse error on line {}: {message}", .location.start.line)]
    Syntax {
        message: String,
        location: SourceLocation,
    },
    /// The template parsed but cannot be compiled with the given options.
    #[error("{message} - {}:{}", .location.start.line, .location.start.column)]
    Semantic {
        message: String,
        location: SourceLocation,
    },
}

impl CompileError {
    pub(crate) fn syntax(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::Syntax {
            message: message.into(),
            location,
        }
    }

    pub(crate) fn semantic(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::Semantic {
            message: message.into(),
            location,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Syntax { message, .. } | Self::Semantic { message, .. } => message,
        }
    }

    pub fn location(&self) -> SourceLocation {
        match self {
            Self::Syntax { location, .. } | Self::Semantic { location, .. } => *location,
        }
    }
}

/// Maps byte offsets into [`Position`]s.
pub(crate) struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(ix, _)| ix + 1))
            .collect();
        Self {
            source,
            line_starts,
        }
    }

    pub fn position(&self, offset: usize) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next.saturating_sub(1),
        };
        let line_start = self.line_starts[line];
        let column = self
            .source
            .get(line_start..offset)
            .map_or(0, |text| text.chars().count());
        Position {
            line: line + 1,
            column,
        }
    }

    pub fn location(&self, start: usize, end: usize) -> SourceLocation {
        SourceLocation {
            start: self.position(start),
            end: self.position(end),
        }
    }
}
