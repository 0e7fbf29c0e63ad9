//! Template compile pipeline: precompile with helper discovery, then wrap the
//! template spec in an ES module that imports and registers the helpers the
//! template actually uses.

use hbs_compiler::{PrecompileOptions, precompile_with};

use crate::discovery::HelperDiscovery;
use crate::module::{CompiledModule, Message};
use crate::registry::HelperRegistry;

pub const RUNTIME_IMPORT: &str = "import * as Handlebars from 'handlebars/runtime';";

const RESERVED_WORDS: &[&str] = &[
    "arguments",
    "await",
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "eval",
    "export",
    "extends",
    "false",
    "finally",
    "for",
    "function",
    "if",
    "implements",
    "import",
    "in",
    "instanceof",
    "interface",
    "let",
    "new",
    "null",
    "package",
    "private",
    "protected",
    "public",
    "return",
    "static",
    "super",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
    "yield",
];

/// Compiles one template against `registry`.
///
/// Only registry names count as helpers: unregistered helper calls are
/// compile errors, and bare unregistered names are read from the context.
pub fn compile_template(
    source: &str,
    registry: &HelperRegistry,
    options: &PrecompileOptions,
) -> CompiledModule {
    let options = PrecompileOptions {
        known_helpers: registry.known_helpers(),
        known_helpers_only: true,
        ..options.clone()
    };

    let mut discovery = HelperDiscovery::new();
    match precompile_with(source, &options, &mut discovery) {
        Ok(spec) => {
            let helpers = discovery.into_helpers();
            log::trace!("template uses helpers {helpers:?}");
            CompiledModule::Source(module_source(&spec, registry.matched(&helpers)))
        }
        Err(error) => CompiledModule::error(Message::from_compile_error(&error, source)),
    }
}

fn module_source<'a>(spec: &str, helpers: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let mut lines = vec![RUNTIME_IMPORT.to_string()];
    let mut registrations = Vec::new();
    let mut aliases = 0;
    for (name, specifier) in helpers {
        let binding = if is_plain_identifier(name) {
            registrations.push(name.to_string());
            name.to_string()
        } else {
            let alias = format!("__helper{aliases}");
            aliases += 1;
            registrations.push(format!("{}:{alias}", hbs_compiler::quoted_string(name)));
            alias
        };
        lines.push(format!("import {binding} from '{}';", escape_specifier(specifier)));
    }
    lines.push(format!(
        "Handlebars.registerHelper({{{}}});",
        registrations.join(",")
    ));
    lines.push(format!("export default Handlebars.template({spec});"));
    lines.join("\n")
}

/// Names usable directly as an import binding and shorthand property.
fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !RESERVED_WORDS.contains(&name)
}

fn escape_specifier(specifier: &str) -> String {
    specifier.replace('\\', "\\\\").replace('\'', "\\'")
}
