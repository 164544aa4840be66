#![doc(test(attr(deny(warnings))))]

//! fintrack wires the recurrence engine, the category classifier, JSON storage
//! and configuration into a per-user session, plus the `fintrack_cli` front end.

pub mod cli;
pub mod errors;
pub mod session;
pub mod utils;

pub use errors::{FinError, Result};
pub use session::Session;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing with the default filter.
pub fn init() {
    init_with_filter(None);
}

/// Initializes global tracing, preferring `RUST_LOG`, then `directive`, then `fintrack=info`.
pub fn init_with_filter(directive: Option<&str>) {
    INIT_TRACING.call_once(|| {
        utils::init_tracing(directive);
        tracing::debug!("fintrack tracing initialized.");
    });
}
