//! fin-storage-json
//!
//! Filesystem-backed JSON persistence for per-user finance books and classifier
//! artifacts. Implements the storage traits declared by fin-core.

mod artifacts;
mod book;
mod fs_util;

use std::path::{Path, PathBuf};

pub use artifacts::{JsonArtifactStore, CLASSIFIER_FILE, VECTORIZER_FILE};
pub use book::{JsonFinanceStore, UserBook};

const USERS_DIR: &str = "users";
const MODELS_DIR: &str = "models";

/// Directory layout used by the JSON stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    pub users_root: PathBuf,
    pub models_root: PathBuf,
}

impl StoragePaths {
    /// Standard layout below a data root: `<root>/users` and `<root>/models`.
    pub fn under(root: &Path) -> Self {
        Self {
            users_root: root.join(USERS_DIR),
            models_root: root.join(MODELS_DIR),
        }
    }
}
