//! Multinomial Naive Bayes over term-count features.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::vectorizer::TermCounts;
use crate::CoreError;

/// Most likely class for a sample together with its posterior probability.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassScore<'a> {
    pub class: &'a str,
    pub probability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MultinomialNaiveBayes {
    classes: Vec<String>,
    class_log_prior: Vec<f64>,
    /// `feature_log_prob[class][feature]`
    feature_log_prob: Vec<Vec<f64>>,
    n_features: usize,
    smoothing: f64,
}

impl MultinomialNaiveBayes {
    /// Fits class priors and Laplace/Lidstone-smoothed per-class term probabilities.
    ///
    /// `samples` and `labels` are parallel; classes are kept in sorted order.
    pub fn fit(
        samples: &[TermCounts],
        labels: &[&str],
        n_features: usize,
        smoothing: f64,
    ) -> Result<Self, CoreError> {
        if samples.len() != labels.len() {
            return Err(CoreError::Classifier(format!(
                "{} samples but {} labels",
                samples.len(),
                labels.len()
            )));
        }
        if samples.is_empty() {
            return Err(CoreError::Classifier("no samples to fit".into()));
        }
        if n_features == 0 {
            return Err(CoreError::Classifier("empty vocabulary".into()));
        }
        if !(smoothing.is_finite() && smoothing > 0.0) {
            return Err(CoreError::Classifier(format!(
                "smoothing must be positive, got {smoothing}"
            )));
        }

        let mut per_class: BTreeMap<&str, (usize, Vec<f64>)> = BTreeMap::new();
        for (sample, label) in samples.iter().zip(labels) {
            let (count, totals) = per_class
                .entry(*label)
                .or_insert_with(|| (0, vec![0.0; n_features]));
            *count += 1;
            for (&feature, &value) in sample {
                let slot = totals.get_mut(feature).ok_or_else(|| {
                    CoreError::Classifier(format!(
                        "feature index {feature} outside vocabulary of {n_features}"
                    ))
                })?;
                *slot += f64::from(value);
            }
        }

        let total_samples = samples.len() as f64;
        let mut classes = Vec::with_capacity(per_class.len());
        let mut class_log_prior = Vec::with_capacity(per_class.len());
        let mut feature_log_prob = Vec::with_capacity(per_class.len());
        for (label, (count, totals)) in per_class {
            let denominator = totals.iter().sum::<f64>() + smoothing * n_features as f64;
            classes.push(label.to_string());
            class_log_prior.push((count as f64 / total_samples).ln());
            feature_log_prob.push(
                totals
                    .iter()
                    .map(|total| ((total + smoothing) / denominator).ln())
                    .collect(),
            );
        }

        Ok(Self {
            classes,
            class_log_prior,
            feature_log_prob,
            n_features,
            smoothing,
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Checks the fitted tables agree with each other.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.classes.is_empty() {
            return Err(CoreError::Classifier("model has no classes".into()));
        }
        if self.class_log_prior.len() != self.classes.len()
            || self.feature_log_prob.len() != self.classes.len()
        {
            return Err(CoreError::Classifier(format!(
                "model tables disagree on class count ({} classes, {} priors, {} rows)",
                self.classes.len(),
                self.class_log_prior.len(),
                self.feature_log_prob.len()
            )));
        }
        if let Some(row) = self
            .feature_log_prob
            .iter()
            .find(|row| row.len() != self.n_features)
        {
            return Err(CoreError::Classifier(format!(
                "feature row has {} entries, expected {}",
                row.len(),
                self.n_features
            )));
        }
        Ok(())
    }

    /// Unnormalized log posterior per class, in [`classes`](Self::classes) order.
    pub fn joint_log_likelihood(&self, sample: &TermCounts) -> Result<Vec<f64>, CoreError> {
        self.validate()?;
        self.class_log_prior
            .iter()
            .zip(&self.feature_log_prob)
            .map(|(prior, row)| {
                sample.iter().try_fold(*prior, |acc, (&feature, &value)| {
                    row.get(feature)
                        .map(|log_prob| acc + f64::from(value) * log_prob)
                        .ok_or_else(|| {
                            CoreError::Classifier(format!(
                                "feature index {feature} outside model of {}",
                                self.n_features
                            ))
                        })
                })
            })
            .collect()
    }

    /// Maximum-likelihood class. Ties resolve to the alphabetically first class.
    pub fn predict(&self, sample: &TermCounts) -> Result<ClassScore<'_>, CoreError> {
        let scores = self.joint_log_likelihood(sample)?;
        let mut best = 0;
        for (index, score) in scores.iter().enumerate().skip(1) {
            if *score > scores[best] {
                best = index;
            }
        }
        let max = scores[best];
        if !max.is_finite() {
            return Err(CoreError::Classifier("non-finite class score".into()));
        }
        let normalizer: f64 = scores.iter().map(|score| (score - max).exp()).sum();
        Ok(ClassScore {
            class: &self.classes[best],
            probability: 1.0 / normalizer,
        })
    }
}
