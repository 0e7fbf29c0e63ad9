//! Syntax tree produced by [`crate::parse`].

use crate::SourceLocation;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Vec<Statement>,
    /// Names bound by `as |a b|` on the block that owns this program.
    pub block_params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Content(String),
    Mustache(Mustache),
    Block(Block),
    Partial(Partial),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mustache {
    pub call: Call,
    pub escaped: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub call: Call,
    pub program: Option<Program>,
    pub inverse: Option<Program>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Partial {
    pub name: String,
    pub params: Vec<Expr>,
    pub hash: Option<Hash>,
    /// Leading whitespace removed from a standalone partial line, re-applied by the runtime.
    pub indent: String,
    pub location: SourceLocation,
}

/// A helper name or path followed by its arguments.
///
/// Mustaches, block openers and subexpressions all share this shape. The
/// location spans the whole statement (or the parenthesized subexpression).
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub path: PathExpr,
    pub params: Vec<Expr>,
    pub hash: Option<Hash>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hash {
    pub pairs: Vec<(String, Expr)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Path(PathExpr),
    SubExpr(Box<Call>),
    String(String),
    /// Numbers keep their source spelling.
    Number(String),
    Boolean(bool),
    Null,
    Undefined,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    /// `@`-prefixed paths read from the data frame instead of the context.
    pub data: bool,
    /// Number of leading `../` segments.
    pub depth: usize,
    /// Segments after `this`, `.` and `..` have been removed.
    pub parts: Vec<String>,
    pub original: String,
    pub location: SourceLocation,
}

impl PathExpr {
    /// Paths that start with `.` or mention `this` are never helper names.
    pub fn is_scoped(&self) -> bool {
        self.original.starts_with('.')
            || self.original.match_indices("this").any(|(ix, needle)| {
                self.original[ix + needle.len()..]
                    .chars()
                    .next()
                    .is_none_or(|next| !(next.is_alphanumeric() || next == '_'))
            })
    }

    /// A single bare segment such as `foo`, the only shape that can name a helper
    /// without arguments.
    pub fn is_simple_id(&self) -> bool {
        self.parts.len() == 1 && !self.is_scoped() && self.depth == 0
    }

    pub fn head(&self) -> &str {
        self.parts
            .first()
            .map_or(self.original.as_str(), String::as_str)
    }
}
