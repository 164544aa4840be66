//! Per-user session: the seam between the presentation layer and the core services.
//!
//! Every mutation of the user's transactions goes through here so the classifier
//! hears about it.

use std::{path::Path, sync::Arc};

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use fin_config::{ClassifierConfig, Config, ConfigManager, RetrainMode};
use fin_core::{
    CategoryClassifier, ClassifierSettings, Clock, DueCheckReport, FinanceStore,
    ModelArtifactStore, RecurrenceEngine, RetrainPolicy, Suggestion, SystemClock,
};
use fin_domain::{Displayable, NewTransaction, RecurringRule, Transaction};
use fin_storage_json::{JsonArtifactStore, JsonFinanceStore, StoragePaths};

use crate::errors::Result;

pub struct Session {
    config: Config,
    paths: StoragePaths,
    store: JsonFinanceStore,
    classifier: CategoryClassifier,
    clock: Box<dyn Clock>,
}

impl Session {
    /// Loads `<root>/config/config.json` (defaults when absent) and opens a session on it.
    pub fn from_data_root(root: &Path) -> Result<Self> {
        let mut config = ConfigManager::with_base_dir(root.to_path_buf())?.load()?;
        if config.data_root.is_none() {
            config.data_root = Some(root.to_path_buf());
        }
        Self::open(config)
    }

    pub fn open(config: Config) -> Result<Self> {
        Self::with_clock(config, Box::new(SystemClock))
    }

    pub fn with_clock(config: Config, clock: Box<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let paths = StoragePaths::under(&config.resolve_data_root());
        let store = JsonFinanceStore::new(paths.users_root.clone())?;
        let artifacts: Arc<dyn ModelArtifactStore> =
            Arc::new(JsonArtifactStore::new(paths.models_root.clone())?);
        let classifier = CategoryClassifier::new(
            config.user_id.clone(),
            classifier_settings(&config.classifier),
            artifacts,
        );
        info!(user = %config.user_id, root = %paths.users_root.display(), "session opened");
        Ok(Self {
            config,
            paths,
            store,
            classifier,
            clock,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.config.user_id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    pub fn store(&self) -> &JsonFinanceStore {
        &self.store
    }

    pub fn classifier(&self) -> &CategoryClassifier {
        &self.classifier
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Generates everything due as of the session clock's today.
    pub fn run_due_check(&mut self) -> Result<DueCheckReport> {
        let today = self.today();
        self.run_due_check_on(today)
    }

    pub fn run_due_check_on(&mut self, today: NaiveDate) -> Result<DueCheckReport> {
        let report = RecurrenceEngine::run_due_check(&self.store, self.user_id(), today)?;
        if report.generated > 0 {
            self.refresh_classifier();
        }
        Ok(report)
    }

    pub fn add_rule(&mut self, rule: &RecurringRule) -> Result<()> {
        self.store.add_rule(self.user_id(), rule)?;
        Ok(())
    }

    pub fn delete_rule(&mut self, rule_id: Uuid) -> Result<()> {
        self.store.delete_rule(self.user_id(), rule_id)?;
        Ok(())
    }

    pub fn transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.store.transactions(self.user_id())?)
    }

    pub fn record_transaction(&mut self, transaction: NewTransaction) -> Result<Uuid> {
        let id = self.store.insert_transaction(self.user_id(), transaction)?;
        self.refresh_classifier();
        Ok(id)
    }

    pub fn update_transaction(&mut self, transaction: Transaction) -> Result<()> {
        self.store.update_transaction(self.user_id(), transaction)?;
        self.refresh_classifier();
        Ok(())
    }

    pub fn delete_transaction(&mut self, id: Uuid) -> Result<Transaction> {
        let removed = self.store.delete_transaction(self.user_id(), id)?;
        info!(user = %self.config.user_id, transaction = %removed.display_label(), "transaction deleted");
        self.refresh_classifier();
        Ok(removed)
    }

    /// Loads the persisted classifier, training it when nothing usable is on disk.
    pub fn load_classifier(&mut self) -> Result<()> {
        self.classifier.load_or_train(&self.store, false)?;
        Ok(())
    }

    /// Discards the current model and fits a new one from the full history.
    pub fn retrain(&mut self) -> Result<()> {
        self.classifier.load_or_train(&self.store, true)?;
        Ok(())
    }

    /// Best category for `description`, training or loading on first use.
    ///
    /// Returns `None` whenever no model can be produced.
    pub fn suggest_category(&mut self, description: &str) -> Option<Suggestion> {
        if !self.classifier.is_ready() || self.classifier.is_stale() {
            if let Err(err) = self.classifier.load_or_train(&self.store, false) {
                debug!(user = %self.config.user_id, error = %err, "no classifier available for suggestions");
                return None;
            }
        }
        self.classifier.suggest(description)
    }

    fn refresh_classifier(&mut self) {
        if let Err(err) = self.classifier.notify_data_changed(&self.store) {
            if err.is_recoverable() {
                debug!(user = %self.config.user_id, error = %err, "classifier left untrained");
            } else {
                warn!(user = %self.config.user_id, error = %err, "classifier refresh failed");
            }
        }
    }
}

pub fn classifier_settings(config: &ClassifierConfig) -> ClassifierSettings {
    ClassifierSettings {
        min_examples: config.min_examples,
        min_categories: config.min_categories,
        max_features: config.max_features,
        smoothing: config.smoothing,
        retrain_policy: match config.retrain_policy {
            RetrainMode::Immediate => RetrainPolicy::Immediate,
            RetrainMode::Deferred => RetrainPolicy::Deferred,
        },
    }
}
