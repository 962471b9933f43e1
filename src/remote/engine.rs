//! The remote resource engine interface.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Resource, ResourceKind, RoutineObject};

/// Operations the reconciler needs from the resource engine.
///
/// Calls are awaited one at a time and never retried; a failure aborts the
/// current command.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteEngine: Send + Sync {
    /// Fetches a resource by id, or `None` if the engine has no such resource.
    async fn retrieve(&self, kind: ResourceKind, id: &str) -> Result<Option<Resource>>;

    /// Lists the resources of `kind` whose id is `id` (an `id__in` filter).
    async fn list_by_id(&self, kind: ResourceKind, id: &str) -> Result<Vec<Resource>>;

    /// Lists the routines owned by a component.
    async fn list_routines(&self, component_id: &str) -> Result<Vec<RoutineObject>>;

    /// Creates the resource if it has no id, updates it otherwise.
    async fn save(&self, resource: &Resource) -> Result<Resource>;

    /// Deletes the resource.
    async fn delete(&self, resource: &Resource) -> Result<()>;
}
