//! Eligibility rules for source objects: allowed extensions and source prefix.

use crate::config::FilterConfig;

/// Decides whether an object key is in scope for the pipeline.
///
/// Pure and total: no I/O, never fails.
#[derive(Debug, Clone)]
pub struct EligibilityFilter {
    source_prefix: String,
    /// Lowercased, dot-prefixed suffixes (".jpg")
    suffixes: Vec<String>,
}

impl EligibilityFilter {
    /// Build a filter from config.
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            source_prefix: config.source_prefix.clone(),
            suffixes: config
                .allowed_extensions
                .iter()
                .map(|ext| format!(".{}", ext.to_lowercase()))
                .collect(),
        }
    }

    /// Whether the key ends in one of the allowed image extensions
    /// (case-insensitive).
    pub fn is_eligible(&self, key: &str) -> bool {
        let lower = key.to_lowercase();
        self.suffixes.iter().any(|suffix| lower.ends_with(suffix))
    }

    /// Whether the key lives under the source prefix.
    pub fn has_source_prefix(&self, key: &str) -> bool {
        key.starts_with(&self.source_prefix)
    }

    /// Prefix and extension check combined.
    pub fn in_scope(&self, key: &str) -> bool {
        self.has_source_prefix(key) && self.is_eligible(key)
    }
}

impl Default for EligibilityFilter {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_image_extensions() {
        let filter = EligibilityFilter::default();
        assert!(!filter.is_eligible("a.gif"));
        assert!(!filter.is_eligible("a.GIF"));
        assert!(!filter.is_eligible("a"));
        assert!(!filter.is_eligible(""));
    }

    #[test]
    fn test_accepts_image_extensions_any_case() {
        let filter = EligibilityFilter::default();
        assert!(filter.is_eligible("a.JPG"));
        assert!(filter.is_eligible("a.png"));
        assert!(filter.is_eligible("a.jpeg"));
        assert!(filter.is_eligible("incoming/holiday/IMG_0001.JpEg"));
    }

    #[test]
    fn test_extension_must_be_a_suffix() {
        let filter = EligibilityFilter::default();
        assert!(!filter.is_eligible("a.png.txt"));
        assert!(!filter.is_eligible("apng"));
    }

    #[test]
    fn test_in_scope_requires_prefix() {
        let filter = EligibilityFilter::default();
        assert!(filter.in_scope("incoming/a.png"));
        assert!(!filter.in_scope("other/a.png"));
        assert!(!filter.in_scope("metadata/a.png.json"));
        assert!(!filter.in_scope("incoming/a.gif"));
    }

    #[test]
    fn test_custom_extensions_are_normalized() {
        let filter = EligibilityFilter::new(&FilterConfig {
            source_prefix: String::new(),
            allowed_extensions: vec!["WEBP".to_string()],
        });
        assert!(filter.in_scope("photo.webp"));
        assert!(!filter.in_scope("photo.png"));
    }
}
