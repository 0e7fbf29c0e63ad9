use std::path::Path;

use hbs_compiler::CompileError;
use serde::{Deserialize, Serialize};

/// Outcome of loading one template: module source for the bundler, or the
/// messages explaining why there is none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompiledModule {
    Source(String),
    Errors(Vec<Message>),
}

impl CompiledModule {
    pub fn error(message: Message) -> Self {
        Self::Errors(vec![message])
    }

    pub fn source(&self) -> Option<&str> {
        match self {
            Self::Source(source) => Some(source),
            Self::Errors(_) => None,
        }
    }

    pub fn errors(&self) -> &[Message] {
        match self {
            Self::Source(_) => &[],
            Self::Errors(errors) => errors,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Source(_))
    }

    /// Points every located error message at `path`.
    pub fn attribute_to(mut self, path: &Path) -> Self {
        if let Self::Errors(errors) = &mut self {
            for location in errors.iter_mut().filter_map(|error| error.location.as_mut()) {
                location.file = path.display().to_string();
            }
        }
        self
    }
}

/// A diagnostic in the shape the host bundler reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            location: None,
        }
    }

    /// The compiler's own text, located at the error's start when the source is at hand.
    pub fn from_compile_error(error: &CompileError, source: &str) -> Self {
        let start = error.location().start;
        let location = (start.line > 0).then(|| {
            let line_text = source.lines().nth(start.line - 1).unwrap_or_default();
            Location {
                file: String::new(),
                line: start.line,
                column: byte_column(line_text, start.column),
                line_text: line_text.to_string(),
            }
        });
        Self {
            text: error.to_string(),
            location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub file: String,
    /// 1-based.
    pub line: usize,
    /// 0-based, in UTF-8 bytes of `line_text`.
    pub column: usize,
    pub line_text: String,
}

/// Byte offset of the `chars`-th character, clamped to the end of the line.
fn byte_column(line_text: &str, chars: usize) -> usize {
    line_text
        .char_indices()
        .nth(chars)
        .map_or(line_text.len(), |(ix, _)| ix)
}
