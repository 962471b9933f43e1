//! Deleting resources from the engine.

use tracing::info;

use crate::error::Result;
use crate::model::Resource;
use crate::remote::RemoteEngine;

use super::confirm::Confirmer;

/// Deletes resources one at a time, each gated by confirmation.
pub struct Destroyer<'a> {
    engine: &'a dyn RemoteEngine,
    confirmer: Confirmer<'a>,
}

impl<'a> Destroyer<'a> {
    /// Creates a destroyer.
    #[must_use]
    pub fn new(engine: &'a dyn RemoteEngine, confirmer: Confirmer<'a>) -> Self {
        Self { engine, confirmer }
    }

    /// Deletes one resource remotely.
    ///
    /// Returns true if it was deleted; the caller drops it from the state.
    /// A component's routines are deleted before the component itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects a delete.
    pub async fn destroy(&self, resource: &Resource) -> Result<bool> {
        let kind = resource.kind();
        let Some(id) = resource.id() else {
            self.confirmer
                .show(&format!("{kind} '{}' was never created; nothing to destroy", resource.name()));
            return Ok(false);
        };

        self.confirmer
            .show(&format!("{kind} '{}' ({id}) will be destroyed:\n{}", resource.name(), resource.render()));
        if !self.confirmer.confirm(&format!("Destroy {kind} '{}'?", resource.name()))? {
            return Ok(false);
        }

        if let Resource::Component(component) = resource {
            for routine in component.routines.iter().filter(|r| r.id.is_some()) {
                self.engine.delete(&Resource::Routine(routine.clone())).await?;
                info!("Destroyed routine '{}' of component '{}'", routine.name, component.name);
            }
        }

        self.engine.delete(resource).await?;
        info!("Destroyed {kind} '{}' ({id})", resource.name());
        Ok(true)
    }
}

impl std::fmt::Debug for Destroyer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Destroyer").field("confirmer", &self.confirmer).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Asset, Component, ResourceKind, RoutineObject};
    use crate::reconciler::confirm::scripted::ScriptedPrompter;
    use crate::reconciler::confirm::ConfirmPolicy;
    use crate::remote::{InMemoryEngine, MockRemoteEngine};
    use mockall::Sequence;

    #[tokio::test]
    async fn test_uncreated_resource_is_a_no_op() {
        let mut engine = MockRemoteEngine::new();
        engine.expect_delete().never();
        let prompter = ScriptedPrompter::default();
        let destroyer = Destroyer::new(&engine, Confirmer::new(ConfirmPolicy::AutoYes, &prompter));

        let destroyed = destroyer
            .destroy(&Resource::Asset(Asset::new("Tank1")))
            .await
            .expect("destroy");
        assert!(!destroyed);
        assert!(prompter.shown_text().contains("nothing to destroy"));
    }

    #[tokio::test]
    async fn test_declined_destroy_keeps_remote() {
        let engine = InMemoryEngine::new();
        let tank = engine.insert(Resource::Asset(Asset::new("Tank1"))).expect("insert");
        let prompter = ScriptedPrompter::answering(&[false]);
        let destroyer = Destroyer::new(&engine, Confirmer::new(ConfirmPolicy::AlwaysAsk, &prompter));

        assert!(!destroyer.destroy(&tank).await.expect("destroy"));
        assert_eq!(engine.count(ResourceKind::Asset).expect("count"), 1);
    }

    #[tokio::test]
    async fn test_routines_go_before_their_component() {
        let mut routine = RoutineObject::new("control");
        routine.id = Some(String::from("R1"));
        let component = Resource::Component(Component {
            id: Some(String::from("C1")),
            ..Component::new("pump").with_routine(routine)
        });

        let mut engine = MockRemoteEngine::new();
        let mut sequence = Sequence::new();
        engine
            .expect_delete()
            .withf(|r| r.kind() == ResourceKind::Routine)
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(()));
        engine
            .expect_delete()
            .withf(|r| r.kind() == ResourceKind::Component)
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(()));

        let prompter = ScriptedPrompter::default();
        let destroyer = Destroyer::new(&engine, Confirmer::new(ConfirmPolicy::AutoYes, &prompter));
        assert!(destroyer.destroy(&component).await.expect("destroy"));
    }
}
