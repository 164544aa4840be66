//! Labeled examples used to fit the category classifier.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A `(description, category)` pair taken from a user's own history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrainingExample {
    pub description: String,
    pub category: String,
}

impl TrainingExample {
    /// Builds an example, rejecting blank descriptions or categories.
    pub fn new(description: impl Into<String>, category: impl Into<String>) -> Option<Self> {
        let description = description.into();
        let category = category.into();
        if description.trim().is_empty() || category.trim().is_empty() {
            return None;
        }
        Some(Self {
            description,
            category,
        })
    }
}

/// Counts the distinct category labels present in `examples`.
pub fn distinct_categories(examples: &[TrainingExample]) -> usize {
    examples
        .iter()
        .map(|example| example.category.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}
