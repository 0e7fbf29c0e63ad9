use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Helpers the runtime always provides.
pub const BUILTIN_HELPERS: [&str; 8] = [
    "helperMissing",
    "blockHelperMissing",
    "each",
    "if",
    "unless",
    "with",
    "log",
    "lookup",
];

/// Options accepted by [`crate::precompile`], spelled the way the JavaScript
/// tooling spells them so they can be passed through from JSON configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrecompileOptions {
    /// Names to treat as helpers. Merged over [`BUILTIN_HELPERS`]; `false`
    /// turns a builtin off.
    pub known_helpers: BTreeMap<String, bool>,
    /// Reject helper calls to names outside `known_helpers`.
    pub known_helpers_only: bool,
    /// Pass the `@data` frame to helpers.
    pub data: bool,
    pub no_escape: bool,
    /// Missing context properties throw at render time.
    pub strict: bool,
    /// Like `strict`, but only for intermediate path segments.
    pub assume_objects: bool,
    /// Partials without an argument get no context instead of the current one.
    pub explicit_partial_context: bool,
}

impl Default for PrecompileOptions {
    fn default() -> Self {
        Self {
            known_helpers: BTreeMap::new(),
            known_helpers_only: false,
            data: true,
            no_escape: false,
            strict: false,
            assume_objects: false,
            explicit_partial_context: false,
        }
    }
}

impl PrecompileOptions {
    pub fn is_known_helper(&self, name: &str) -> bool {
        match self.known_helpers.get(name) {
            Some(known) => *known,
            None => BUILTIN_HELPERS.contains(&name),
        }
    }
}
