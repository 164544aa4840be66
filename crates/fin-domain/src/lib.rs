//! fin-domain
//!
//! Pure domain models (transactions, recurring rules, training examples).
//! No I/O, no storage. Only data types, core enums and calendar arithmetic.

pub mod common;
pub mod recurrence;
pub mod training;
pub mod transaction;

pub use common::*;
pub use recurrence::*;
pub use training::*;
pub use transaction::*;
