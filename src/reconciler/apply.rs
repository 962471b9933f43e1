//! Applying one resource against the engine.

use serde::Serialize;
use tracing::{info, warn};

use crate::config::MissingRemotePolicy;
use crate::error::{ReconcileError, RemoteError, Result, SolutionError};
use crate::model::Resource;
use crate::remote::RemoteEngine;

use super::confirm::{Confirmer, DiffResolution};
use super::diff::DiffEngine;

/// What applying a resource did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyAction {
    /// Created on the engine.
    Created,
    /// Local copy pushed over the remote one.
    Updated,
    /// Remote copy taken into the state.
    Accepted,
    /// Nothing differed.
    Unchanged,
    /// The operator declined.
    Skipped,
}

/// Outcome of [`ApplyExecutor::apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// What happened.
    pub action: ApplyAction,
    /// The resource to keep in the state.
    pub resource: Resource,
}

impl Applied {
    /// Whether the state entry must be replaced and persisted.
    #[must_use]
    pub const fn changed(&self) -> bool {
        matches!(
            self.action,
            ApplyAction::Created | ApplyAction::Updated | ApplyAction::Accepted
        )
    }

    const fn kept(action: ApplyAction, resource: Resource) -> Self {
        Self { action, resource }
    }
}

/// Creates and updates resources on the engine, one at a time.
pub struct ApplyExecutor<'a> {
    engine: &'a dyn RemoteEngine,
    diff: &'a DiffEngine,
    confirmer: Confirmer<'a>,
    missing_remote: MissingRemotePolicy,
}

impl<'a> ApplyExecutor<'a> {
    /// Creates an apply executor.
    #[must_use]
    pub fn new(
        engine: &'a dyn RemoteEngine,
        diff: &'a DiffEngine,
        confirmer: Confirmer<'a>,
        missing_remote: MissingRemotePolicy,
    ) -> Self {
        Self {
            engine,
            diff,
            confirmer,
            missing_remote,
        }
    }

    /// Converges one resource.
    ///
    /// `not_found_is_exception` is set for imported resources, which must
    /// already exist remotely.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::UndefinedId`] when a tracked id is gone and
    /// may not be recreated, or any engine error.
    pub async fn apply(&self, local: &Resource, not_found_is_exception: bool) -> Result<Applied> {
        let kind = local.kind();
        let Some(id) = local.id() else {
            return self.create(local.clone()).await;
        };

        let remote = self
            .engine
            .list_by_id(kind, id)
            .await?
            .into_iter()
            .find(|r| r.id() == Some(id));

        let Some(remote) = remote else {
            if not_found_is_exception || self.missing_remote == MissingRemotePolicy::Fail {
                return Err(SolutionError::Reconcile(ReconcileError::undefined(format!(
                    "{kind} '{}' with id '{id}' no longer exists remotely",
                    local.name()
                ))));
            }

            warn!("{kind} '{}' ({id}) not found remotely, recreating", local.name());
            let mut fresh = local.clone();
            fresh.clear_ids();
            return self.create(fresh).await;
        };

        let diff = self.diff.diff(local, &remote)?;
        if diff.is_empty() {
            return Ok(Applied::kept(ApplyAction::Unchanged, local.clone()));
        }

        self.confirmer.show(&diff.to_string());
        match self.confirmer.resolve_diff(kind, local.name())? {
            DiffResolution::AcceptRemote => {
                info!("Accepted remote {kind} '{}'", local.name());
                Ok(Applied::kept(ApplyAction::Accepted, remote))
            }
            DiffResolution::OverwriteRemote => {
                let saved = self.engine.save(local).await?;
                let refreshed = self.refetch(saved).await?;
                info!("Updated {kind} '{}'", local.name());
                Ok(Applied::kept(ApplyAction::Updated, refreshed))
            }
            DiffResolution::Skip => Ok(Applied::kept(ApplyAction::Skipped, local.clone())),
        }
    }

    async fn create(&self, local: Resource) -> Result<Applied> {
        let kind = local.kind();
        self.confirmer
            .show(&format!("{kind} '{}' will be created:\n{}", local.name(), local.render()));

        if !self.confirmer.confirm(&format!("Create {kind} '{}'?", local.name()))? {
            return Ok(Applied::kept(ApplyAction::Skipped, local));
        }

        let saved = self.engine.save(&local).await?;
        let created = self.refetch(saved).await?;
        info!("Created {kind} '{}' ({})", created.name(), created.id().unwrap_or_default());
        Ok(Applied::kept(ApplyAction::Created, created))
    }

    /// Re-reads a saved resource to pick up server-computed fields.
    async fn refetch(&self, saved: Resource) -> Result<Resource> {
        let kind = saved.kind();
        let id = saved.id().ok_or_else(|| {
            SolutionError::Remote(RemoteError::InvalidResponse {
                message: format!("engine returned {kind} '{}' without an id", saved.name()),
            })
        })?;

        Ok(self.engine.retrieve(kind, id).await?.unwrap_or(saved))
    }
}

impl std::fmt::Debug for ApplyExecutor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplyExecutor")
            .field("confirmer", &self.confirmer)
            .field("missing_remote", &self.missing_remote)
            .finish_non_exhaustive()
    }
}
