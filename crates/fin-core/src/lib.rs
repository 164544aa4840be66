//! fin-core
//!
//! Business logic for the finance tracker: recurring-transaction generation and
//! category suggestion. Depends on fin-domain. No terminal I/O and no concrete
//! storage; persistence is reached through the traits in [`storage`].

pub mod classifier;
pub mod error;
pub mod recurrence_service;
pub mod storage;
pub mod time;

#[cfg(test)]
mod tests;

pub use classifier::*;
pub use error::CoreError;
pub use recurrence_service::*;
pub use storage::{FinanceStore, ModelArtifactStore, ModelArtifacts};
pub use time::{Clock, FixedClock, SystemClock};
