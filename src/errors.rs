use std::result::Result as StdResult;

use fin_config::ConfigError;
use fin_core::CoreError;
use thiserror::Error;

/// Unified error surfaced by the session and the CLI.
#[derive(Debug, Error)]
pub enum FinError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = StdResult<T, FinError>;

impl From<std::io::Error> for FinError {
    fn from(err: std::io::Error) -> Self {
        FinError::Core(CoreError::Io(err))
    }
}

impl From<fin_domain::RuleDataError> for FinError {
    fn from(err: fin_domain::RuleDataError) -> Self {
        FinError::InvalidInput(err.to_string())
    }
}

impl FinError {
    /// Process exit code used by the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            FinError::InvalidInput(_) => 2,
            FinError::Config(_) => 3,
            FinError::Core(_) => 1,
        }
    }
}
