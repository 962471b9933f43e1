//! In-memory resource engine.
//!
//! Holds resources in a map and assigns UUIDs on create, mirroring what the
//! real engine does. Useful for dry runs and end-to-end tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

use crate::error::{RemoteError, Result, SolutionError};
use crate::model::{Resource, ResourceKind, RoutineObject};

use super::engine::RemoteEngine;

type Records = HashMap<(ResourceKind, String), Resource>;

/// A resource engine backed by a map.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    records: Mutex<Records>,
    writes: Mutex<usize>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn poisoned() -> SolutionError {
    SolutionError::internal("in-memory engine lock poisoned")
}

/// Fills in every id the engine would assign on save.
fn assign_ids(resource: &mut Resource) {
    if resource.id().is_none() {
        resource.set_id(Some(new_id()));
    }

    if let Resource::Asset(asset) = resource {
        for attribute in asset.attributes.iter_mut().filter(|a| a.id.is_none()) {
            attribute.id = Some(new_id());
        }
    }
}

impl InMemoryEngine {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> Result<MutexGuard<'_, Records>> {
        self.records.lock().map_err(|_| poisoned())
    }

    fn count_write(&self) -> Result<()> {
        *self.writes.lock().map_err(|_| poisoned())? += 1;
        Ok(())
    }

    /// Stores a resource directly, assigning ids where missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine lock is poisoned.
    pub fn insert(&self, mut resource: Resource) -> Result<Resource> {
        assign_ids(&mut resource);
        let key = (resource.kind(), resource.id().unwrap_or_default().to_string());
        self.records()?.insert(key, resource.clone());
        Ok(resource)
    }

    /// Removes a resource behind the reconciler's back.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine lock is poisoned.
    pub fn forget(&self, kind: ResourceKind, id: &str) -> Result<Option<Resource>> {
        Ok(self.records()?.remove(&(kind, id.to_string())))
    }

    /// Looks a resource up without going through the trait.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine lock is poisoned.
    pub fn get(&self, kind: ResourceKind, id: &str) -> Result<Option<Resource>> {
        Ok(self.records()?.get(&(kind, id.to_string())).cloned())
    }

    /// Number of stored resources of one kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine lock is poisoned.
    pub fn count(&self, kind: ResourceKind) -> Result<usize> {
        Ok(self.records()?.keys().filter(|(k, _)| *k == kind).count())
    }

    /// Number of saves and deletes served so far.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine lock is poisoned.
    pub fn writes(&self) -> Result<usize> {
        Ok(*self.writes.lock().map_err(|_| poisoned())?)
    }
}

#[async_trait]
impl RemoteEngine for InMemoryEngine {
    async fn retrieve(&self, kind: ResourceKind, id: &str) -> Result<Option<Resource>> {
        self.get(kind, id)
    }

    async fn list_by_id(&self, kind: ResourceKind, id: &str) -> Result<Vec<Resource>> {
        Ok(self.get(kind, id)?.into_iter().collect())
    }

    async fn list_routines(&self, component_id: &str) -> Result<Vec<RoutineObject>> {
        let mut routines: Vec<RoutineObject> = self
            .records()?
            .values()
            .filter_map(|r| match r {
                Resource::Routine(routine) if routine.component.as_deref() == Some(component_id) => {
                    Some(routine.clone())
                }
                _ => None,
            })
            .collect();
        routines.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(routines)
    }

    async fn save(&self, resource: &Resource) -> Result<Resource> {
        let kind = resource.kind();

        if let Some(id) = resource.id()
            && !self.records()?.contains_key(&(kind, id.to_string()))
        {
            return Err(SolutionError::Remote(RemoteError::NotFound {
                kind: kind.to_string(),
                id: id.to_string(),
            }));
        }

        self.count_write()?;
        let saved = self.insert(resource.clone())?;
        debug!("Stored {kind} '{}' as {}", saved.name(), saved.id().unwrap_or_default());
        Ok(saved)
    }

    async fn delete(&self, resource: &Resource) -> Result<()> {
        let kind = resource.kind();
        let id = resource.id().ok_or_else(|| {
            SolutionError::internal(format!("Cannot delete {kind} '{}' without an id", resource.name()))
        })?;

        self.count_write()?;
        self.records()?.remove(&(kind, id.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Asset, Attribute};

    #[tokio::test]
    async fn test_save_assigns_nested_ids() {
        let engine = InMemoryEngine::new();
        let asset = Asset::new("Tank1").with_attribute(Attribute::new("temperature", "number"));

        let saved = engine.save(&Resource::Asset(asset)).await.expect("save");

        let Resource::Asset(saved) = saved else {
            panic!("kind changed");
        };
        assert!(saved.id.is_some());
        assert!(saved.attributes[0].id.is_some());
        assert_eq!(engine.writes().expect("writes"), 1);
    }

    #[tokio::test]
    async fn test_update_of_unknown_id_fails() {
        let engine = InMemoryEngine::new();
        let err = engine
            .save(&Resource::Asset(Asset::new("Tank1").with_id("gone")))
            .await
            .unwrap_err();
        assert!(matches!(err, SolutionError::Remote(RemoteError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_routines_are_listed_by_component() {
        let engine = InMemoryEngine::new();
        let mut routine = RoutineObject::new("control");
        routine.component = Some(String::from("C1"));
        engine.insert(Resource::Routine(routine)).expect("insert");
        engine.insert(Resource::Routine(RoutineObject::new("orphan"))).expect("insert");

        let routines = engine.list_routines("C1").await.expect("list");
        assert_eq!(routines.len(), 1);
        assert_eq!(routines[0].name, "control");
    }
}
