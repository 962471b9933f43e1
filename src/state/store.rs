//! Solution store trait definition.
//!
//! This module defines the common interface for document storage backends.
//! Plans and states share the same schema, so one trait serves both.

use async_trait::async_trait;

use crate::error::{Result, SolutionError, StateError};
use crate::model::Solution;

/// Trait for solution document storage backends.
///
/// Every `save` writes the whole document; there is no log and no versioning.
#[async_trait]
pub trait SolutionStore: Send + Sync {
    /// Loads the document.
    ///
    /// Returns `None` if no document exists yet.
    async fn load(&self) -> Result<Option<Solution>>;

    /// Overwrites the document.
    async fn save(&self, solution: &Solution) -> Result<()>;

    /// Checks if the document exists.
    async fn exists(&self) -> Result<bool>;

    /// Human-readable location, for prompts and logs.
    fn location(&self) -> String;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}

#[async_trait]
impl SolutionStore for Box<dyn SolutionStore> {
    async fn load(&self) -> Result<Option<Solution>> {
        (**self).load().await
    }

    async fn save(&self, solution: &Solution) -> Result<()> {
        (**self).save(solution).await
    }

    async fn exists(&self) -> Result<bool> {
        (**self).exists().await
    }

    fn location(&self) -> String {
        (**self).location()
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }
}

/// Parses a YAML solution document.
///
/// # Errors
///
/// Returns a corruption error naming `location` if the YAML is invalid.
pub fn decode(content: &str, location: &str) -> Result<Solution> {
    if content.trim().is_empty() {
        return Ok(Solution::default());
    }

    serde_yaml::from_str(content).map_err(|e| {
        SolutionError::State(StateError::Corrupted {
            message: format!("Failed to parse {location}: {e}"),
        })
    })
}

/// Renders a solution document as YAML.
///
/// # Errors
///
/// Returns a serialization error if the document cannot be rendered.
pub fn encode(solution: &Solution) -> Result<String> {
    serde_yaml::to_string(solution).map_err(|e| {
        SolutionError::State(StateError::serialization(format!(
            "Failed to serialize solution: {e}"
        )))
    })
}
