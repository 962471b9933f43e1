//! Plan and state loading.
//!
//! The plan is read from the operator's YAML file and validated. The state
//! comes from a [`SolutionStore`]; when none exists yet it is seeded from the
//! plan, and that first write needs the operator's consent.

use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::{SolutionValidator, StateLocation};
use crate::error::{ConfigError, ReconcileError, Result, SolutionError};
use crate::model::Solution;
use crate::reconciler::Confirmer;

use super::local::LocalSolutionStore;
use super::s3::S3SolutionStore;
use super::store::SolutionStore;

/// Loads plan and state documents.
#[derive(Debug, Default)]
pub struct SolutionLoader {
    validator: SolutionValidator,
}

impl SolutionLoader {
    /// Creates a loader.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            validator: SolutionValidator::new(),
        }
    }

    /// Reads and validates the plan document at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unparsable, or invalid.
    pub async fn load_plan(&self, path: &Path) -> Result<Solution> {
        if !path.exists() {
            return Err(SolutionError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        debug!("Loading plan from: {}", path.display());
        let content = tokio::fs::read_to_string(path).await?;

        let plan: Solution = if content.trim().is_empty() {
            Solution::default()
        } else {
            serde_yaml::from_str(&content).map_err(|e| {
                SolutionError::Config(ConfigError::ParseError {
                    message: e.to_string(),
                    location: Some(path.display().to_string()),
                })
            })?
        };

        let result = self.validator.validate_plan(&plan)?;
        for warning in &result.warnings {
            warn!("{warning}");
        }

        Ok(plan)
    }

    /// Writes the plan document back, after an import added entries to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save_plan(&self, path: &Path, plan: &Solution) -> Result<()> {
        LocalSolutionStore::new(path).save(plan).await
    }

    /// Loads the state, seeding it from `plan` if the store is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Aborted`] if the operator declines creating
    /// the state, or a store or validation error.
    pub async fn load_state(
        &self,
        store: &dyn SolutionStore,
        plan: &Solution,
        confirmer: &Confirmer<'_>,
    ) -> Result<Solution> {
        if let Some(state) = store.load().await? {
            self.validator.validate_state(&state)?;
            return Ok(state);
        }

        let mut state = plan.clone();
        state.last_applied = None;

        let question = format!("No state found at {}. Create it from the plan?", store.location());
        if !confirmer.confirm(&question)? {
            return Err(SolutionError::Reconcile(ReconcileError::Aborted {
                reason: String::from("state creation declined"),
            }));
        }

        store.save(&state).await?;
        info!("Initialized state at {}", store.location());
        Ok(state)
    }

    /// Loads the state, treating a missing document as empty.
    ///
    /// # Errors
    ///
    /// Returns a store or validation error.
    pub async fn load_existing_state(&self, store: &dyn SolutionStore) -> Result<Solution> {
        match store.load().await? {
            Some(state) => {
                self.validator.validate_state(&state)?;
                Ok(state)
            }
            None => {
                debug!("No state at {}", store.location());
                Ok(Solution::default())
            }
        }
    }
}

/// Opens the store for a state location.
///
/// # Errors
///
/// Returns an error if the S3 client cannot be initialized.
pub async fn open_store(location: &StateLocation, region: Option<&str>) -> Result<Box<dyn SolutionStore>> {
    let store: Box<dyn SolutionStore> = match location {
        StateLocation::Local(path) => Box::new(LocalSolutionStore::new(path.clone())),
        StateLocation::S3 { bucket, prefix } => {
            Box::new(S3SolutionStore::new(bucket, prefix.as_deref(), region).await?)
        }
    };

    debug!("Using {} state backend at {}", store.backend_type(), store.location());
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Asset;
    use crate::reconciler::scripted::ScriptedPrompter;
    use crate::reconciler::ConfirmPolicy;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_plan() {
        let temp = TempDir::new().expect("temp dir");
        let err = SolutionLoader::new()
            .load_plan(&temp.path().join("solution.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, SolutionError::Config(ConfigError::FileNotFound { .. })));
    }

    #[tokio::test]
    async fn test_unparsable_plan_names_file() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("solution.yaml");
        std::fs::write(&path, "assets: 12").expect("write");

        let err = SolutionLoader::new().load_plan(&path).await.unwrap_err();
        let SolutionError::Config(ConfigError::ParseError { location, .. }) = err else {
            panic!("expected a parse error, got {err}");
        };
        assert_eq!(location, Some(path.display().to_string()));
    }

    #[tokio::test]
    async fn test_state_seeded_from_plan_after_consent() {
        let temp = TempDir::new().expect("temp dir");
        let store = LocalSolutionStore::new(temp.path().join("state.yaml"));
        let plan = Solution {
            assets: vec![Asset::new("Tank1")],
            ..Solution::default()
        };
        let prompter = ScriptedPrompter::answering(&[true]);
        let confirmer = Confirmer::new(ConfirmPolicy::AlwaysAsk, &prompter);

        let state = SolutionLoader::new()
            .load_state(&store, &plan, &confirmer)
            .await
            .expect("state");

        assert_eq!(state, plan);
        assert!(store.exists().await.expect("exists"));
    }

    #[tokio::test]
    async fn test_declined_seed_aborts_without_writing() {
        let temp = TempDir::new().expect("temp dir");
        let store = LocalSolutionStore::new(temp.path().join("state.yaml"));
        let prompter = ScriptedPrompter::answering(&[false]);
        let confirmer = Confirmer::new(ConfirmPolicy::AlwaysAsk, &prompter);

        let err = SolutionLoader::new()
            .load_state(&store, &Solution::default(), &confirmer)
            .await
            .unwrap_err();

        assert!(matches!(err, SolutionError::Reconcile(ReconcileError::Aborted { .. })));
        assert!(!store.exists().await.expect("exists"));
    }
}
