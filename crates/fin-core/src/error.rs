use fin_domain::RuleDataError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Rule not found: {0}")]
    RuleNotFound(Uuid),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),
    #[error("Malformed rule {rule_id}: {reason}")]
    MalformedRule { rule_id: Uuid, reason: RuleDataError },
    #[error("Insufficient training data: {examples} examples across {categories} categories")]
    DataInsufficient { examples: usize, categories: usize },
    #[error("Model artifacts unusable: {0}")]
    ArtifactCorrupt(String),
    #[error("Classifier error: {0}")]
    Classifier(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Whether the failure leaves the caller able to carry on with a degraded result.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CoreError::DataInsufficient { .. }
                | CoreError::ArtifactCorrupt(_)
                | CoreError::MalformedRule { .. }
        )
    }
}
