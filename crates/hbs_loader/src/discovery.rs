use hbs_compiler::{DefaultNameLookup, LookupKind, NameLookup};

/// Records the helper names a compilation refers to, in first-use order,
/// while leaving the generated code to the wrapped lookup.
///
/// One collector serves exactly one compilation; it is created by the caller
/// and handed to [`hbs_compiler::precompile_with`].
#[derive(Debug, Default)]
pub struct HelperDiscovery<L = DefaultNameLookup> {
    inner: L,
    helpers: Vec<String>,
}

impl HelperDiscovery {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<L: NameLookup> HelperDiscovery<L> {
    pub fn wrap(inner: L) -> Self {
        Self {
            inner,
            helpers: Vec::new(),
        }
    }

    pub fn helpers(&self) -> &[String] {
        &self.helpers
    }

    pub fn into_helpers(self) -> Vec<String> {
        self.helpers
    }
}

impl<L: NameLookup> NameLookup for HelperDiscovery<L> {
    fn name_lookup(&mut self, parent: &str, name: &str, kind: LookupKind) -> String {
        if kind == LookupKind::Helper && !self.helpers.iter().any(|helper| helper == name) {
            self.helpers.push(name.to_string());
        }
        self.inner.name_lookup(parent, name, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hbs_compiler::{PrecompileOptions, precompile, precompile_with};
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn options(known: &[&str]) -> PrecompileOptions {
        PrecompileOptions {
            known_helpers: known.iter().map(|name| (name.to_string(), true)).collect(),
            known_helpers_only: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_records_helpers_in_discovery_order_once() {
        let source = indoc! {"
            {{#if items}}
              {{#each items}}{{upper (trim name)}}{{/each}}
              {{upper title}}
            {{/if}}
        "};
        let mut discovery = HelperDiscovery::new();
        let options = options(&["upper", "trim"]);
        precompile_with(source, &options, &mut discovery).unwrap();
        assert_eq!(discovery.helpers(), ["trim", "upper", "each", "if"]);
    }

    #[test]
    fn test_generated_code_is_unchanged() {
        let source = "{{#with user}}{{format name style=\"short\"}}{{/with}}";
        let options = options(&["format"]);
        let mut discovery = HelperDiscovery::new();
        assert_eq!(
            precompile_with(source, &options, &mut discovery).unwrap(),
            precompile(source, &options).unwrap()
        );
        assert_eq!(discovery.into_helpers(), ["format", "with"]);
    }

    /// Reads every name with plain member access.
    struct DotLookup;

    impl NameLookup for DotLookup {
        fn name_lookup(&mut self, parent: &str, name: &str, _kind: LookupKind) -> String {
            format!("{parent}.{name}")
        }
    }

    #[test]
    fn test_wrapped_lookup_generates_the_code() {
        let mut discovery = HelperDiscovery::wrap(DotLookup);
        let options = options(&["upper"]);
        let spec = precompile_with("{{upper title}}", &options, &mut discovery).unwrap();
        assert!(spec.contains("helpers.upper.call("));
        assert!(spec.contains("(depth0 != null ? depth0.title : depth0)"));
        assert_eq!(discovery.into_helpers(), ["upper"]);
    }

    #[test]
    fn test_ignores_non_helper_lookups() {
        let mut discovery = HelperDiscovery::new();
        let source = "{{> card}}{{title}}{{@index}}";
        let spec = precompile_with(source, &options(&[]), &mut discovery);
        assert!(spec.is_ok());
        assert!(discovery.helpers().is_empty());
    }
}
