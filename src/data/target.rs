//! Search targets derived from dataset entries.

use std::sync::Arc;

use super::Flavor;
use crate::search::normalize;

/// One searchable entry of a dataset partition.
#[derive(Debug, Clone)]
pub struct SearchTarget {
    pub key: String,
    /// The key run through the identifier normalizer.
    pub normalized_text: Arc<str>,
    /// The entry's display text (a localized string, or the key itself).
    pub raw_text: String,
    pub flavor: Flavor,
    /// What the ranker aligns queries against.
    haystack: String,
}

impl SearchTarget {
    pub fn new(key: &str, raw_text: &str, flavor: Flavor) -> Self {
        let normalized_text: Arc<str> = Arc::from(normalize(key));
        let raw_lower = raw_text.to_lowercase();
        let haystack = if raw_lower.is_empty() || raw_lower == *normalized_text {
            normalized_text.to_string()
        } else {
            format!("{normalized_text} {raw_lower}")
        };
        Self {
            key: key.to_owned(),
            normalized_text,
            raw_text: raw_text.to_owned(),
            flavor,
            haystack,
        }
    }

    pub fn haystack(&self) -> &str {
        &self.haystack
    }
}

/// Borrow targets as `(key, haystack)` pairs for the ranker.
pub fn corpus(targets: &[SearchTarget]) -> Vec<(&str, &str)> {
    targets
        .iter()
        .map(|t| (t.key.as_str(), t.haystack.as_str()))
        .collect()
}
