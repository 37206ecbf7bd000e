//! Layered property merge.
//!
//! Layers are applied in push order; a key present in a later layer replaces
//! the value from any earlier one. Keys are never merged deeply.

use crate::types::Properties;

/// Ordered list of property layers (global, then project, then extra).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyScope {
    layers: Vec<Properties>,
}

impl PropertyScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer that overrides every layer pushed before it.
    pub fn with_layer(mut self, layer: Properties) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn push(&mut self, layer: Properties) {
        self.layers.push(layer);
    }

    pub fn layers(&self) -> &[Properties] {
        &self.layers
    }

    pub fn merge(&self) -> Properties {
        merge(self.layers.iter())
    }
}

/// Flat key overwrite across `layers`, later wins.
pub fn merge<'a>(layers: impl IntoIterator<Item = &'a Properties>) -> Properties {
    let mut merged = Properties::new();
    for layer in layers {
        merged.extend(layer.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn props(pairs: &[(&str, &str)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[rstest]
    #[case::extra_wins("k", Some("g"), Some("p"), Some("e"), "e")]
    #[case::project_over_global("k", Some("g"), Some("p"), None, "p")]
    #[case::global_only("k", Some("g"), None, None, "g")]
    #[case::extra_over_global("k", Some("g"), None, Some("e"), "e")]
    #[case::project_only("k", None, Some("p"), None, "p")]
    fn later_layers_override(
        #[case] key: &str,
        #[case] global: Option<&str>,
        #[case] project: Option<&str>,
        #[case] extra: Option<&str>,
        #[case] expected: &str,
    ) {
        let layer = |v: Option<&str>| v.map(|v| props(&[(key, v)])).unwrap_or_default();
        let merged = PropertyScope::new()
            .with_layer(layer(global))
            .with_layer(layer(project))
            .with_layer(layer(extra))
            .merge();
        assert_eq!(merged.get(key).map(String::as_str), Some(expected));
    }

    #[test]
    fn disjoint_keys_are_all_kept() {
        let merged = PropertyScope::new()
            .with_layer(props(&[("region", "us")]))
            .with_layer(props(&[("env", "prod")]))
            .merge();
        assert_eq!(merged, props(&[("env", "prod"), ("region", "us")]));
    }

    #[test]
    fn empty_scope_merges_to_empty() {
        assert!(PropertyScope::new().merge().is_empty());
    }
}
