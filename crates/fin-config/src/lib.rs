//! fin-config
//!
//! Persistent per-installation settings: active user, data root, log filter
//! and classifier tuning. Owns the Config data structure plus disk persistence.

pub mod error;
pub mod manager;
pub mod model;

pub use error::ConfigError;
pub use manager::ConfigManager;
pub use model::{ClassifierConfig, Config, RetrainMode, DATA_ROOT_ENV};
