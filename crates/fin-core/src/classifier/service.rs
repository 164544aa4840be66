//! Lifecycle of the per-user category classifier: load, train, persist, predict.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use fin_domain::{distinct_categories, TrainingExample};

use super::{
    naive_bayes::MultinomialNaiveBayes,
    vectorizer::{BagOfWords, TermCounts},
};
use crate::{
    storage::{FinanceStore, ModelArtifactStore, ModelArtifacts},
    CoreError,
};

pub const MIN_TRAINING_EXAMPLES: usize = 10;
pub const MIN_DISTINCT_CATEGORIES: usize = 2;
pub const MAX_VOCABULARY_TERMS: usize = 1000;
pub const DEFAULT_SMOOTHING: f64 = 1.0;
const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// How the classifier reacts to a "data changed" notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetrainPolicy {
    /// Retrain from the full history right away.
    #[default]
    Immediate,
    /// Mark the model stale; the next `load_or_train` retrains.
    Deferred,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierSettings {
    pub min_examples: usize,
    pub min_categories: usize,
    pub max_features: usize,
    pub smoothing: f64,
    pub retrain_policy: RetrainPolicy,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            min_examples: MIN_TRAINING_EXAMPLES,
            min_categories: MIN_DISTINCT_CATEGORIES,
            max_features: MAX_VOCABULARY_TERMS,
            smoothing: DEFAULT_SMOOTHING,
            retrain_policy: RetrainPolicy::default(),
        }
    }
}

/// A suggested category and the model's posterior probability for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub category: String,
    pub probability: f64,
}

#[derive(Serialize, Deserialize)]
struct VectorizerArtifact {
    format_version: u32,
    model_id: Uuid,
    trained_at: DateTime<Utc>,
    vectorizer: BagOfWords,
}

#[derive(Serialize, Deserialize)]
struct ClassifierArtifact {
    format_version: u32,
    model_id: Uuid,
    examples: usize,
    classifier: MultinomialNaiveBayes,
}

/// A fitted feature transform and the classifier trained on its output.
///
/// The two halves are only ever constructed together.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    model_id: Uuid,
    trained_at: DateTime<Utc>,
    examples: usize,
    vectorizer: BagOfWords,
    classifier: MultinomialNaiveBayes,
}

impl TrainedModel {
    pub fn fit(
        examples: &[TrainingExample],
        settings: &ClassifierSettings,
    ) -> Result<Self, CoreError> {
        let vectorizer = BagOfWords::fit(
            examples.iter().map(|example| example.description.as_str()),
            settings.max_features,
        );
        let samples: Vec<TermCounts> = examples
            .iter()
            .map(|example| vectorizer.transform(&example.description))
            .collect();
        let labels: Vec<&str> = examples
            .iter()
            .map(|example| example.category.as_str())
            .collect();
        let classifier =
            MultinomialNaiveBayes::fit(&samples, &labels, vectorizer.len(), settings.smoothing)?;
        Ok(Self {
            model_id: Uuid::new_v4(),
            trained_at: Utc::now(),
            examples: examples.len(),
            vectorizer,
            classifier,
        })
    }

    /// Rebuilds a model from its persisted pair, rejecting halves from different fits.
    pub fn from_artifacts(artifacts: &ModelArtifacts) -> Result<Self, CoreError> {
        let vectorizer: VectorizerArtifact = serde_json::from_str(&artifacts.vectorizer)
            .map_err(|err| CoreError::ArtifactCorrupt(format!("vectorizer: {err}")))?;
        let classifier: ClassifierArtifact = serde_json::from_str(&artifacts.classifier)
            .map_err(|err| CoreError::ArtifactCorrupt(format!("classifier: {err}")))?;

        if vectorizer.format_version != ARTIFACT_FORMAT_VERSION
            || classifier.format_version != ARTIFACT_FORMAT_VERSION
        {
            return Err(CoreError::ArtifactCorrupt(format!(
                "unsupported format versions {}/{}",
                vectorizer.format_version, classifier.format_version
            )));
        }
        if vectorizer.model_id != classifier.model_id {
            return Err(CoreError::ArtifactCorrupt(format!(
                "vectorizer {} does not belong to classifier {}",
                vectorizer.model_id, classifier.model_id
            )));
        }
        if !vectorizer.vectorizer.is_consistent()
            || vectorizer.vectorizer.len() != classifier.classifier.n_features()
        {
            return Err(CoreError::ArtifactCorrupt(
                "vocabulary does not match classifier features".into(),
            ));
        }
        classifier
            .classifier
            .validate()
            .map_err(|err| CoreError::ArtifactCorrupt(err.to_string()))?;

        Ok(Self {
            model_id: vectorizer.model_id,
            trained_at: vectorizer.trained_at,
            examples: classifier.examples,
            vectorizer: vectorizer.vectorizer,
            classifier: classifier.classifier,
        })
    }

    pub fn to_artifacts(&self) -> Result<ModelArtifacts, CoreError> {
        let vectorizer = serde_json::to_string(&VectorizerArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            model_id: self.model_id,
            trained_at: self.trained_at,
            vectorizer: self.vectorizer.clone(),
        })
        .map_err(|err| CoreError::Serde(err.to_string()))?;
        let classifier = serde_json::to_string(&ClassifierArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            model_id: self.model_id,
            examples: self.examples,
            classifier: self.classifier.clone(),
        })
        .map_err(|err| CoreError::Serde(err.to_string()))?;
        Ok(ModelArtifacts {
            vectorizer,
            classifier,
        })
    }

    /// Descriptions with no known terms, or no terms at all, get the class prior's pick.
    pub fn suggest(&self, description: &str) -> Result<Suggestion, CoreError> {
        let features = self.vectorizer.transform(description);
        let score = self.classifier.predict(&features)?;
        Ok(Suggestion {
            category: score.class.to_string(),
            probability: score.probability,
        })
    }

    pub fn model_id(&self) -> Uuid {
        self.model_id
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn examples(&self) -> usize {
        self.examples
    }

    pub fn categories(&self) -> &[String] {
        self.classifier.classes()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vectorizer.len()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ClassifierState {
    #[default]
    Uninitialized,
    Untrained,
    Ready(TrainedModel),
}

/// Suggests a category for a transaction description from the user's own history.
pub struct CategoryClassifier {
    user_id: String,
    settings: ClassifierSettings,
    artifacts: Arc<dyn ModelArtifactStore>,
    state: ClassifierState,
    stale: bool,
}

impl CategoryClassifier {
    pub fn new(
        user_id: impl Into<String>,
        settings: ClassifierSettings,
        artifacts: Arc<dyn ModelArtifactStore>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            settings,
            artifacts,
            state: ClassifierState::Uninitialized,
            stale: false,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    pub fn state(&self) -> &ClassifierState {
        &self.state
    }

    pub fn model(&self) -> Option<&TrainedModel> {
        match &self.state {
            ClassifierState::Ready(model) => Some(model),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.model().is_some()
    }

    /// A deferred data change is waiting to be folded into the model.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Ensures a model is available, loading persisted artifacts before falling back to
    /// training. Does nothing when already ready, unless forced or stale.
    pub fn load_or_train(
        &mut self,
        store: &dyn FinanceStore,
        force_retrain: bool,
    ) -> Result<(), CoreError> {
        if self.is_ready() && !force_retrain && !self.stale {
            return Ok(());
        }
        if !force_retrain && !self.stale {
            match self.load() {
                Ok(true) => return Ok(()),
                Ok(false) => debug!(user = %self.user_id, "no persisted classifier artifacts"),
                Err(err) => {
                    warn!(user = %self.user_id, error = %err, "discarding unusable classifier artifacts")
                }
            }
        }
        self.train(store)
    }

    /// Fits a new model from the user's labeled history and persists it.
    ///
    /// Refuses with [`CoreError::DataInsufficient`] below the configured minimums (which
    /// can raise, never lower, the built-in 10 examples and 2 categories); the
    /// classifier is then `Untrained` and any previously persisted artifacts are removed.
    /// A failed artifact write is logged and the fresh model still serves predictions.
    pub fn train(&mut self, store: &dyn FinanceStore) -> Result<(), CoreError> {
        let examples = store.labeled_transactions_for_training(&self.user_id)?;
        self.stale = false;
        let categories = distinct_categories(&examples);
        if examples.len() < self.settings.min_examples.max(MIN_TRAINING_EXAMPLES)
            || categories < self.settings.min_categories.max(MIN_DISTINCT_CATEGORIES)
        {
            warn!(
                user = %self.user_id,
                examples = examples.len(),
                categories,
                "not enough labeled transactions to train the category classifier"
            );
            self.state = ClassifierState::Untrained;
            if let Err(err) = self.artifacts.delete_artifacts(&self.user_id) {
                warn!(user = %self.user_id, error = %err, "failed to remove outdated classifier artifacts");
            }
            return Err(CoreError::DataInsufficient {
                examples: examples.len(),
                categories,
            });
        }

        let model = match TrainedModel::fit(&examples, &self.settings) {
            Ok(model) => model,
            Err(err) => {
                self.state = ClassifierState::Untrained;
                return Err(err);
            }
        };
        info!(
            user = %self.user_id,
            examples = model.examples(),
            categories = model.categories().len(),
            vocabulary = model.vocabulary_size(),
            "category classifier trained"
        );
        if let Err(err) = model
            .to_artifacts()
            .and_then(|artifacts| self.artifacts.write_artifacts(&self.user_id, &artifacts))
        {
            warn!(user = %self.user_id, error = %err, "classifier kept in memory only; persisting failed");
        }
        self.state = ClassifierState::Ready(model);
        Ok(())
    }

    /// The most likely category for `description`, or `None` when no model is ready or
    /// the model cannot produce an answer.
    pub fn predict(&self, description: &str) -> Option<String> {
        self.suggest(description)
            .map(|suggestion| suggestion.category)
    }

    pub fn suggest(&self, description: &str) -> Option<Suggestion> {
        let model = self.model()?;
        match model.suggest(description) {
            Ok(suggestion) => Some(suggestion),
            Err(err) => {
                warn!(user = %self.user_id, error = %err, "category prediction failed");
                None
            }
        }
    }

    /// Reacts to an insert, update or delete of the user's transactions.
    pub fn notify_data_changed(&mut self, store: &dyn FinanceStore) -> Result<(), CoreError> {
        match self.settings.retrain_policy {
            RetrainPolicy::Immediate => self.train(store),
            RetrainPolicy::Deferred => {
                self.stale = true;
                debug!(user = %self.user_id, "classifier marked stale");
                Ok(())
            }
        }
    }

    /// Drops the in-memory model and deletes its persisted artifacts.
    pub fn invalidate(&mut self) -> Result<(), CoreError> {
        self.state = ClassifierState::Untrained;
        self.stale = false;
        self.artifacts.delete_artifacts(&self.user_id)
    }

    fn load(&mut self) -> Result<bool, CoreError> {
        let Some(artifacts) = self.artifacts.read_artifacts(&self.user_id)? else {
            return Ok(false);
        };
        let model = TrainedModel::from_artifacts(&artifacts)?;
        info!(
            user = %self.user_id,
            model_id = %model.model_id(),
            examples = model.examples(),
            "category classifier loaded"
        );
        self.state = ClassifierState::Ready(model);
        Ok(true)
    }
}
