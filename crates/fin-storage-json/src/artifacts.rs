use std::{fs, path::PathBuf};

use tracing::debug;

use fin_core::{
    storage::{ModelArtifactStore, ModelArtifacts},
    CoreError,
};

use crate::fs_util::{canonical_name, remove_if_exists, write_atomic};

pub const VECTORIZER_FILE: &str = "vectorizer.json";
pub const CLASSIFIER_FILE: &str = "classifier.json";

/// Stores each user's classifier pair under `<models_root>/<user>/`.
#[derive(Debug, Clone)]
pub struct JsonArtifactStore {
    models_dir: PathBuf,
}

impl JsonArtifactStore {
    pub fn new(models_dir: PathBuf) -> Result<Self, CoreError> {
        fs::create_dir_all(&models_dir)?;
        Ok(Self { models_dir })
    }

    pub fn user_dir(&self, user_id: &str) -> PathBuf {
        self.models_dir.join(canonical_name(user_id))
    }

    pub fn vectorizer_path(&self, user_id: &str) -> PathBuf {
        self.user_dir(user_id).join(VECTORIZER_FILE)
    }

    pub fn classifier_path(&self, user_id: &str) -> PathBuf {
        self.user_dir(user_id).join(CLASSIFIER_FILE)
    }
}

impl ModelArtifactStore for JsonArtifactStore {
    fn read_artifacts(&self, user_id: &str) -> Result<Option<ModelArtifacts>, CoreError> {
        let vectorizer_path = self.vectorizer_path(user_id);
        let classifier_path = self.classifier_path(user_id);
        match (vectorizer_path.exists(), classifier_path.exists()) {
            (false, false) => Ok(None),
            (true, true) => Ok(Some(ModelArtifacts {
                vectorizer: fs::read_to_string(&vectorizer_path)?,
                classifier: fs::read_to_string(&classifier_path)?,
            })),
            (true, false) => Err(CoreError::ArtifactCorrupt(format!(
                "{} missing",
                classifier_path.display()
            ))),
            (false, true) => Err(CoreError::ArtifactCorrupt(format!(
                "{} missing",
                vectorizer_path.display()
            ))),
        }
    }

    fn write_artifacts(&self, user_id: &str, artifacts: &ModelArtifacts) -> Result<(), CoreError> {
        write_atomic(&self.vectorizer_path(user_id), &artifacts.vectorizer)?;
        write_atomic(&self.classifier_path(user_id), &artifacts.classifier)?;
        debug!(user = user_id, dir = %self.user_dir(user_id).display(), "classifier artifacts written");
        Ok(())
    }

    fn delete_artifacts(&self, user_id: &str) -> Result<(), CoreError> {
        remove_if_exists(&self.vectorizer_path(user_id))?;
        remove_if_exists(&self.classifier_path(user_id))?;
        Ok(())
    }
}
