//! Precompiles Handlebars templates into the template spec object the
//! Handlebars 4.x runtime accepts through `Handlebars.template(spec)`.
//!
//! ```ignore
//! let spec = hbs_compiler::precompile("Hello {{name}}", &PrecompileOptions::default())?;
//! ```
//!
//! Every property access in the generated code is produced by a [`NameLookup`].
//! [`precompile_with`] lets callers substitute their own to observe which
//! helpers, partials and context names a template refers to.

mod ast;
mod codegen;
mod error;
mod lexer;
mod name_lookup;
mod options;
mod parser;
mod whitespace;

pub use ast::{Block, Call, Expr, Hash, Mustache, Partial, PathExpr, Program, Statement};
pub use codegen::{COMPILER_REVISION, COMPILER_VERSION};
pub use error::{CompileError, Position, SourceLocation};
pub use name_lookup::{DefaultNameLookup, LookupKind, NameLookup, quoted_string};
pub use options::{BUILTIN_HELPERS, PrecompileOptions};
pub use parser::parse;

use codegen::JavaScriptCompiler;

/// Compiles `source` with the default name lookup.
pub fn precompile(source: &str, options: &PrecompileOptions) -> Result<String, CompileError> {
    precompile_with(source, options, &mut DefaultNameLookup)
}

/// Compiles `source`, routing every generated property access through `lookup`.
pub fn precompile_with(
    source: &str,
    options: &PrecompileOptions,
    lookup: &mut dyn NameLookup,
) -> Result<String, CompileError> {
    let program = parse(source)?;
    let features = codegen::check(&program, options)?;
    let spec = JavaScriptCompiler::new(options, features, lookup)
        .compile(&program)?;
    log::trace!("precompiled template into {} bytes", spec.len());
    Ok(spec)
}
