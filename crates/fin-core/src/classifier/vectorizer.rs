//! Bag-of-words feature transform over transaction descriptions.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Sparse term counts keyed by vocabulary index.
pub type TermCounts = BTreeMap<usize, u32>;

/// Splits text into lowercase alphanumeric tokens of at least two characters.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_lowercase)
}

/// A fitted vocabulary mapping terms to feature indices.
///
/// Indices follow the alphabetical order of the kept terms so the same corpus always
/// yields the same feature layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BagOfWords {
    vocabulary: BTreeMap<String, usize>,
}

impl BagOfWords {
    /// Learns a vocabulary of at most `max_features` terms, keeping the terms with the
    /// highest total frequency across `documents` (ties broken alphabetically).
    pub fn fit<'a, I>(documents: I, max_features: usize) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut frequencies: HashMap<String, u64> = HashMap::new();
        for document in documents {
            for token in tokenize(document) {
                *frequencies.entry(token).or_default() += 1;
            }
        }

        let mut ranked: Vec<(String, u64)> = frequencies.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(max_features);

        let mut terms: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        terms.sort();
        let vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(index, term)| (term, index))
            .collect();
        Self { vocabulary }
    }

    /// Counts the known terms of `document`. Unknown terms are ignored.
    pub fn transform(&self, document: &str) -> TermCounts {
        let mut counts = TermCounts::new();
        for token in tokenize(document) {
            if let Some(&index) = self.vocabulary.get(&token) {
                *counts.entry(index).or_default() += 1;
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.vocabulary.contains_key(term)
    }

    /// Every index is unique and below the vocabulary size.
    pub fn is_consistent(&self) -> bool {
        let mut seen = vec![false; self.vocabulary.len()];
        for &index in self.vocabulary.values() {
            match seen.get_mut(index) {
                Some(slot) if !*slot => *slot = true,
                _ => return false,
            }
        }
        true
    }
}
