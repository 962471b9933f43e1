//! Local file-based document storage backend.
//!
//! Documents are written to a temporary sibling file, synced, and renamed over
//! the target so a crash never leaves a half-written state behind.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{Result, SolutionError, StateError};
use crate::model::Solution;

use super::store::{decode, encode, SolutionStore};

/// Local YAML file store.
#[derive(Debug, Clone)]
pub struct LocalSolutionStore {
    /// Path to the document.
    path: PathBuf,
}

impl LocalSolutionStore {
    /// Creates a store for the document at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensures the parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty())
            && !parent.exists()
        {
            debug!("Creating state directory: {}", parent.display());
            fs::create_dir_all(parent).await.map_err(|e| write_failed("create directory", &e))?;
        }
        Ok(())
    }
}

fn write_failed(step: &str, e: &std::io::Error) -> SolutionError {
    SolutionError::State(StateError::WriteFailed {
        message: format!("Failed to {step}: {e}"),
    })
}

#[async_trait]
impl SolutionStore for LocalSolutionStore {
    async fn load(&self) -> Result<Option<Solution>> {
        if !self.path.exists() {
            debug!("Document does not exist: {}", self.path.display());
            return Ok(None);
        }

        debug!("Loading document from: {}", self.path.display());

        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            SolutionError::State(StateError::Corrupted {
                message: format!("Failed to read {}: {e}", self.path.display()),
            })
        })?;

        decode(&content, &self.location()).map(Some)
    }

    async fn save(&self, solution: &Solution) -> Result<()> {
        self.ensure_dir().await?;

        debug!("Saving document to: {}", self.path.display());

        let content = encode(solution)?;
        let temp_path = self.path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| write_failed("create temp file", &e))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| write_failed("write document", &e))?;
        file.sync_all().await.map_err(|e| write_failed("sync document", &e))?;

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| write_failed("rename document", &e))?;

        info!("Saved {}", self.path.display());
        Ok(())
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self.path.exists())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Asset, Attribute};
    use tempfile::TempDir;

    fn create_test_store() -> (LocalSolutionStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = LocalSolutionStore::new(temp_dir.path().join(".solution").join("state.yaml"));
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (store, _temp) = create_test_store();

        let state = Solution {
            assets: vec![Asset::new("Tank1")
                .with_id("A1")
                .with_attribute(Attribute::new("temperature", "number").with_id("T1"))],
            ..Solution::default()
        };
        store.save(&state).await.expect("Failed to save state");

        let loaded = store
            .load()
            .await
            .expect("Failed to load state")
            .expect("State should exist");

        assert_eq!(loaded, state);
        assert!(!store.path().with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_load_nonexistent() {
        let (store, _temp) = create_test_store();

        let result = store.load().await.expect("Load should not fail");
        assert!(result.is_none());
        assert!(!store.exists().await.expect("exists check failed"));
    }

    #[tokio::test]
    async fn test_empty_file_is_empty_solution() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("empty.yaml");
        std::fs::write(&path, "").expect("write");

        let loaded = LocalSolutionStore::new(path).load().await.expect("load");
        assert_eq!(loaded, Some(Solution::default()));
    }

    #[tokio::test]
    async fn test_corrupted_file() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("state.yaml");
        std::fs::write(&path, "assets: {not: [a list").expect("write");

        let err = LocalSolutionStore::new(path).load().await.unwrap_err();
        assert!(matches!(err, SolutionError::State(StateError::Corrupted { .. })));
    }
}
