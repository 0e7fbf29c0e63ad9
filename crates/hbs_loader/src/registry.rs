use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Helper names a template may call, each with the module specifier that
/// default-exports the helper function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HelperRegistry(BTreeMap<String, String>);

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, specifier: impl Into<String>) {
        self.0.insert(name.into(), specifier.into());
    }

    pub fn specifier(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every registered name marked as a known helper.
    pub fn known_helpers(&self) -> BTreeMap<String, bool> {
        self.0.keys().map(|name| (name.clone(), true)).collect()
    }

    /// The registered subset of `discovered`, keeping its order.
    pub fn matched<'a>(
        &'a self,
        discovered: &'a [String],
    ) -> impl Iterator<Item = (&'a str, &'a str)> {
        discovered
            .iter()
            .filter_map(|name| Some((name.as_str(), self.specifier(name)?)))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HelperRegistry {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, specifier)| (name.into(), specifier.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_matched_keeps_discovery_order() {
        let registry: HelperRegistry = [("b", "./b"), ("a", "./a")].into_iter().collect();
        let discovered = vec!["b".to_string(), "if".to_string(), "a".to_string()];
        assert_eq!(
            registry.matched(&discovered).collect::<Vec<_>>(),
            [("b", "./b"), ("a", "./a")]
        );
        assert_eq!(
            registry.known_helpers().into_iter().collect::<Vec<_>>(),
            [("a".to_string(), true), ("b".to_string(), true)]
        );
    }

    #[test]
    fn test_deserializes_from_plain_map() {
        let registry: HelperRegistry =
            serde_json::from_str(r#"{"upper": "./helpers/upper.js"}"#).unwrap();
        assert_eq!(registry.specifier("upper"), Some("./helpers/upper.js"));
        assert_eq!(registry.len(), 1);
    }
}
