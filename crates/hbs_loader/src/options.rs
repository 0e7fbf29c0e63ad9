use anyhow::{Context as _, Result};
use hbs_compiler::PrecompileOptions;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::registry::HelperRegistry;

pub const DEFAULT_FILTER: &str = r"(?i)\.(hbs|handlebars)$";

/// Plugin configuration, usually read from the project's JSON config.
///
/// ```json
/// {
///   "filter": "\\.hbs$",
///   "additionalHelpers": { "upper": "./helpers/upper.js" },
///   "precompileOptions": { "strict": true }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginOptions {
    /// Regex matched against load paths.
    pub filter: String,
    pub additional_helpers: HelperRegistry,
    /// Passed through to the compiler. The known-helper options are always
    /// replaced by the helper registry.
    pub precompile_options: PrecompileOptions,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            additional_helpers: HelperRegistry::default(),
            precompile_options: PrecompileOptions::default(),
        }
    }
}

impl PluginOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .context("failed to parse handlebars plugin options")
    }

    /// Reads options from a JSON file, falling back to defaults when it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!(
                "no handlebars plugin options at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read plugin options from {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("in {}", path.display()))
    }

    pub fn filter_regex(&self) -> Result<Regex> {
        Regex::new(&self.filter)
            .with_context(|| format!("invalid load filter {:?}", self.filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let options = PluginOptions::from_json("{}").unwrap();
        assert_eq!(options, PluginOptions::default());
        let filter = options.filter_regex().unwrap();
        assert!(filter.is_match("views/page.hbs"));
        assert!(filter.is_match("views/PAGE.Handlebars"));
        assert!(!filter.is_match("views/page.hbs.js"));
        assert!(!filter.is_match("views/page.html"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("handlebars.json");
        std::fs::write(
            &path,
            indoc! {r#"
                {
                  "filter": "\\.tpl$",
                  "additionalHelpers": { "upper": "./helpers/upper.js" },
                  "precompileOptions": { "noEscape": true }
                }
            "#},
        )
        .unwrap();

        let options = PluginOptions::load_from(&path).unwrap();
        assert_eq!(options.filter, r"\.tpl$");
        assert_eq!(
            options.additional_helpers.specifier("upper"),
            Some("./helpers/upper.js")
        );
        assert!(options.precompile_options.no_escape);
        assert!(options.precompile_options.data);

        let missing = dir.path().join("missing.json");
        let options = PluginOptions::load_from(&missing).unwrap();
        assert_eq!(options, PluginOptions::default());
    }

    #[test]
    fn test_invalid_input() {
        assert!(PluginOptions::from_json("{\"filter\": 3}").is_err());
        let options = PluginOptions {
            filter: "(".into(),
            ..Default::default()
        };
        assert!(options.filter_regex().is_err());
    }
}
