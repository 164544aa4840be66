use chrono::NaiveDate;
use uuid::Uuid;

use fin_domain::{NewTransaction, RecurringRuleRecord, TrainingExample};

use crate::CoreError;

/// Row-oriented persistence consumed by the recurrence engine and the classifier.
///
/// Every call is scoped by the owning user's identifier.
pub trait FinanceStore: Send + Sync {
    fn recurring_rules(&self, user_id: &str) -> Result<Vec<RecurringRuleRecord>, CoreError>;
    fn insert_transaction(
        &self,
        user_id: &str,
        transaction: NewTransaction,
    ) -> Result<Uuid, CoreError>;
    fn update_rule_last_generated_date(
        &self,
        user_id: &str,
        rule_id: Uuid,
        date: NaiveDate,
    ) -> Result<(), CoreError>;
    /// Pairs with a non-null category and a non-blank description.
    fn labeled_transactions_for_training(
        &self,
        user_id: &str,
    ) -> Result<Vec<TrainingExample>, CoreError>;
}

/// The two serialized halves of a fitted classifier. They are only valid together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifacts {
    pub vectorizer: String,
    pub classifier: String,
}

/// Stable storage for classifier artifacts.
pub trait ModelArtifactStore: Send + Sync {
    /// `Ok(None)` when neither artifact exists; an error when only one does or reading fails.
    fn read_artifacts(&self, user_id: &str) -> Result<Option<ModelArtifacts>, CoreError>;
    fn write_artifacts(&self, user_id: &str, artifacts: &ModelArtifacts) -> Result<(), CoreError>;
    fn delete_artifacts(&self, user_id: &str) -> Result<(), CoreError>;
}
