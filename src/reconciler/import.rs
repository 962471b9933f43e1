//! Adopting existing engine resources.

use tracing::{debug, info};

use crate::error::{ReconcileError, RemoteError, Result, SolutionError};
use crate::model::{Resource, ResourceKind, Solution};
use crate::remote::RemoteEngine;

/// Pulls remote resources into the imported lists of plan and state.
pub struct Importer<'a> {
    engine: &'a dyn RemoteEngine,
}

impl<'a> Importer<'a> {
    /// Creates an importer.
    #[must_use]
    pub fn new(engine: &'a dyn RemoteEngine) -> Self {
        Self { engine }
    }

    /// Imports the resource `remote_id` of `kind`.
    ///
    /// Returns false if either document already tracks that id. On true the
    /// caller persists both documents.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::UnsupportedKind`] for routines, which come
    /// with their component, or [`RemoteError::NotFound`] if the engine has
    /// no such resource.
    pub async fn import_element(
        &self,
        kind: ResourceKind,
        remote_id: &str,
        plan: &mut Solution,
        state: &mut Solution,
    ) -> Result<bool> {
        if !kind.is_importable() {
            return Err(SolutionError::Reconcile(ReconcileError::UnsupportedKind {
                kind: kind.to_string(),
            }));
        }

        if plan.contains_id(kind, remote_id) || state.contains_id(kind, remote_id) {
            debug!("{kind} {remote_id} is already tracked");
            return Ok(false);
        }

        let mut resource = self.engine.retrieve(kind, remote_id).await?.ok_or_else(|| {
            SolutionError::Remote(RemoteError::NotFound {
                kind: kind.to_string(),
                id: remote_id.to_string(),
            })
        })?;

        if let Resource::Component(component) = &mut resource {
            component.routines = self.engine.list_routines(remote_id).await?;
            debug!("Fetched {} routines of component '{}'", component.routines.len(), component.name);
        }

        info!("Imported {kind} '{}' ({remote_id})", resource.name());
        plan.push(resource.clone(), true);
        state.push(resource, true);
        Ok(true)
    }
}

impl std::fmt::Debug for Importer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Importer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Asset, Component, RoutineObject};
    use crate::remote::InMemoryEngine;

    #[tokio::test]
    async fn test_import_appends_to_both_documents() {
        let engine = InMemoryEngine::new();
        let boiler = engine.insert(Resource::Asset(Asset::new("Boiler"))).expect("insert");
        let id = boiler.id().expect("id").to_string();
        let (mut plan, mut state) = (Solution::default(), Solution::default());

        let imported = Importer::new(&engine)
            .import_element(ResourceKind::Asset, &id, &mut plan, &mut state)
            .await
            .expect("import");

        assert!(imported);
        assert_eq!(plan.imported_assets.len(), 1);
        assert_eq!(state.imported_assets[0].id.as_deref(), Some(id.as_str()));
        assert!(plan.assets.is_empty());
    }

    #[tokio::test]
    async fn test_import_is_idempotent() {
        let engine = InMemoryEngine::new();
        let boiler = engine.insert(Resource::Asset(Asset::new("Boiler"))).expect("insert");
        let id = boiler.id().expect("id").to_string();
        let (mut plan, mut state) = (Solution::default(), Solution::default());
        let importer = Importer::new(&engine);

        assert!(importer
            .import_element(ResourceKind::Asset, &id, &mut plan, &mut state)
            .await
            .expect("first"));
        assert!(!importer
            .import_element(ResourceKind::Asset, &id, &mut plan, &mut state)
            .await
            .expect("second"));
        assert_eq!(state.imported_assets.len(), 1);
    }

    #[tokio::test]
    async fn test_component_import_brings_routines() {
        let engine = InMemoryEngine::new();
        let component = engine.insert(Resource::Component(Component::new("legacy"))).expect("insert");
        let component_id = component.id().expect("id").to_string();
        let mut routine = RoutineObject::new("poll");
        routine.component = Some(component_id.clone());
        engine.insert(Resource::Routine(routine)).expect("insert");
        let (mut plan, mut state) = (Solution::default(), Solution::default());

        Importer::new(&engine)
            .import_element(ResourceKind::Component, &component_id, &mut plan, &mut state)
            .await
            .expect("import");

        assert_eq!(state.imported_components[0].routines.len(), 1);
        assert_eq!(state.imported_components[0].routines[0].name, "poll");
    }

    #[tokio::test]
    async fn test_routines_cannot_be_imported_alone() {
        let engine = InMemoryEngine::new();
        let (mut plan, mut state) = (Solution::default(), Solution::default());

        let err = Importer::new(&engine)
            .import_element(ResourceKind::Routine, "R1", &mut plan, &mut state)
            .await
            .unwrap_err();
        assert!(matches!(err, SolutionError::Reconcile(ReconcileError::UnsupportedKind { .. })));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let engine = InMemoryEngine::new();
        let (mut plan, mut state) = (Solution::default(), Solution::default());

        let err = Importer::new(&engine)
            .import_element(ResourceKind::Alert, "missing", &mut plan, &mut state)
            .await
            .unwrap_err();
        assert!(matches!(err, SolutionError::Remote(RemoteError::NotFound { .. })));
    }
}
