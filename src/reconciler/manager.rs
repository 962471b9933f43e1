//! The plan, apply, destroy and import operations.
//!
//! Every remote mutation is followed by a full write of the state, so a run
//! that fails halfway leaves a state matching what the engine received.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::MissingRemotePolicy;
use crate::error::{ReconcileError, Result, SolutionError};
use crate::model::{Component, Resource, ResourceKind, Solution};
use crate::remote::RemoteEngine;
use crate::state::SolutionStore;

use super::apply::{ApplyAction, ApplyExecutor};
use super::checker::{Deletions, PendingDeletion, SolutionChecker};
use super::confirm::Confirmer;
use super::destroy::Destroyer;
use super::diff::DiffEngine;
use super::import::Importer;
use super::plan::{PlanExecutor, PlanReport};
use super::resolver::ReferenceResolver;

/// Order in which `destroy` walks the plan-owned lists.
const DESTROY_ORDER: [ResourceKind; 6] = [
    ResourceKind::Component,
    ResourceKind::Function,
    ResourceKind::Alert,
    ResourceKind::File,
    ResourceKind::Secret,
    ResourceKind::Asset,
];

/// Counts of what an apply or destroy did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    /// Resources created.
    pub created: usize,
    /// Resources pushed over their remote copy.
    pub updated: usize,
    /// Remote copies taken into the state.
    pub accepted: usize,
    /// Resources deleted.
    pub deleted: usize,
    /// Resources already in sync.
    pub unchanged: usize,
    /// Mutations the operator declined.
    pub skipped: usize,
}

impl ApplySummary {
    fn record(&mut self, action: ApplyAction) {
        match action {
            ApplyAction::Created => self.created += 1,
            ApplyAction::Updated => self.updated += 1,
            ApplyAction::Accepted => self.accepted += 1,
            ApplyAction::Unchanged => self.unchanged += 1,
            ApplyAction::Skipped => self.skipped += 1,
        }
    }
}

impl fmt::Display for ApplySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} accepted from remote, {} deleted, {} unchanged, {} skipped",
            self.created, self.updated, self.accepted, self.deleted, self.unchanged, self.skipped
        )
    }
}

/// Orchestrates the user-facing operations.
pub struct SolutionManager<'a> {
    engine: &'a dyn RemoteEngine,
    store: &'a dyn SolutionStore,
    confirmer: Confirmer<'a>,
    checker: SolutionChecker,
    missing_remote: MissingRemotePolicy,
    diff: DiffEngine,
}

impl<'a> SolutionManager<'a> {
    /// Creates a manager with default reconciliation rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the diff engine cannot be built.
    pub fn new(engine: &'a dyn RemoteEngine, store: &'a dyn SolutionStore, confirmer: Confirmer<'a>) -> Result<Self> {
        Ok(Self {
            engine,
            store,
            confirmer,
            checker: SolutionChecker::default(),
            missing_remote: MissingRemotePolicy::default(),
            diff: DiffEngine::new()?,
        })
    }

    /// Sets the duplicate-name threshold.
    #[must_use]
    pub fn with_duplicate_threshold(mut self, threshold: u32) -> Self {
        self.checker = SolutionChecker::new(threshold);
        self
    }

    /// Sets what happens when a tracked id is gone remotely.
    #[must_use]
    pub fn with_missing_remote(mut self, policy: MissingRemotePolicy) -> Self {
        self.missing_remote = policy;
        self
    }

    async fn persist(&self, state: &mut Solution) -> Result<()> {
        state.last_applied = Some(Utc::now());
        self.store.save(state).await
    }

    /// Reports what an apply would do. Nothing is mutated or persisted.
    ///
    /// # Errors
    ///
    /// Returns a merge, resolution or engine error.
    pub async fn plan(&self, plan: &Solution, state: &Solution) -> Result<PlanReport> {
        let outcome = self.checker.check(plan, state)?;
        let mut merged = outcome.state;
        ReferenceResolver::replace_references(&mut merged)?;

        PlanExecutor::new(self.engine, &self.diff)
            .plan_solution(plan, &merged, &outcome.deletions)
            .await
    }

    /// Converges the engine to the plan.
    ///
    /// Deletions run first, then creates and updates in type order, with
    /// each component followed by its routines and imported lists last.
    ///
    /// # Errors
    ///
    /// Returns the first merge, resolution, engine or store error. The state
    /// persisted up to that point remains valid.
    pub async fn apply(&self, plan: &Solution, state: &Solution) -> Result<(Solution, ApplySummary)> {
        let outcome = self.checker.check(plan, state)?;
        let mut summary = ApplySummary::default();

        let mut state = self
            .delete_pass(outcome.state, &outcome.deletions, &mut summary)
            .await?;

        ReferenceResolver::replace_references(&mut state)?;

        let executor = ApplyExecutor::new(self.engine, &self.diff, self.confirmer, self.missing_remote);

        for imported in [false, true] {
            for kind in ResourceKind::TOP_LEVEL {
                for index in 0..state.len_of(kind, imported) {
                    if kind == ResourceKind::Component {
                        self.apply_component(&executor, &mut state, index, imported, &mut summary)
                            .await?;
                        continue;
                    }

                    let Some(local) = state.resource_at(kind, index, imported) else {
                        continue;
                    };

                    let applied = executor.apply(&local, imported).await?;
                    summary.record(applied.action);
                    if applied.changed() {
                        state.replace_at(index, applied.resource, imported);
                        self.persist(&mut state).await?;
                    }
                }
            }
        }

        self.persist(&mut state).await?;
        info!("Apply complete: {summary}");
        Ok((state, summary))
    }

    async fn delete_pass(&self, state: Solution, deletions: &Deletions, summary: &mut ApplySummary) -> Result<Solution> {
        let pending = deletions.in_order();
        let destroyer = Destroyer::new(self.engine, self.confirmer);
        let mut kept = Vec::new();

        for (position, entry) in pending.iter().enumerate() {
            let resource = &entry.resource;
            if resource.id().is_none() {
                debug!("Dropping {} '{}', which was never created", resource.kind(), resource.name());
                continue;
            }

            if destroyer.destroy(resource).await? {
                summary.deleted += 1;
                let mut snapshot = restore(&state, kept.iter().chain(&pending[position + 1..]));
                self.persist(&mut snapshot).await?;
            } else {
                summary.skipped += 1;
                kept.push(entry.clone());
            }
        }

        Ok(restore(&state, kept.iter()))
    }

    async fn apply_component(
        &self,
        executor: &ApplyExecutor<'_>,
        state: &mut Solution,
        index: usize,
        imported: bool,
        summary: &mut ApplySummary,
    ) -> Result<()> {
        let Some(local) = state.components_mut(imported).get(index).cloned() else {
            return Ok(());
        };

        let stripped = Component {
            routines: Vec::new(),
            ..local.clone()
        };
        let applied = executor.apply(&Resource::Component(stripped), imported).await?;
        let action = applied.action;
        summary.record(action);

        if applied.changed()
            && let Resource::Component(mut saved) = applied.resource
        {
            saved.routines = local.routines.clone();
            if action == ApplyAction::Created {
                for routine in &mut saved.routines {
                    routine.id = None;
                    routine.component = None;
                }
            }
            state.components_mut(imported)[index] = saved;
            self.persist(state).await?;
        }

        let component = &state.components_mut(imported)[index];
        let name = component.name.clone();
        let routine_count = component.routines.len();

        let Some(component_id) = component.id.clone() else {
            if routine_count > 0 {
                warn!("Skipping {routine_count} routines of component '{name}', which was not created");
                summary.skipped += routine_count;
            }
            return Ok(());
        };

        for position in 0..routine_count {
            let mut routine = state.components_mut(imported)[index].routines[position].clone();
            routine.component = Some(component_id.clone());
            match ReferenceResolver::new(state).resolve_routine(&name, &mut routine) {
                Ok(()) => {}
                Err(SolutionError::Reconcile(ReconcileError::NotCreated { message })) => {
                    warn!("Skipping routine '{}' of component '{name}': {message}", routine.name);
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            }

            let applied = executor.apply(&Resource::Routine(routine), imported).await?;
            summary.record(applied.action);

            if applied.changed()
                && let Resource::Routine(saved) = applied.resource
            {
                state.components_mut(imported)[index].routines[position] = saved;
                self.persist(state).await?;
            }
        }

        Ok(())
    }

    /// Deletes every plan-owned resource, leaving imported ones alone.
    ///
    /// # Errors
    ///
    /// Returns the first engine or store error.
    pub async fn destroy(&self, state: Solution) -> Result<(Solution, ApplySummary)> {
        let destroyer = Destroyer::new(self.engine, self.confirmer);
        let mut summary = ApplySummary::default();
        let mut state = state;

        for kind in DESTROY_ORDER {
            for resource in state.resources(kind, false) {
                if destroyer.destroy(&resource).await? {
                    state.remove_named(kind, resource.name());
                    summary.deleted += 1;
                    self.persist(&mut state).await?;
                } else {
                    summary.skipped += 1;
                }
            }
        }

        info!("Destroy complete: {summary}");
        Ok((state, summary))
    }

    /// Imports one remote resource into plan and state, persisting the state.
    ///
    /// The caller persists the plan.
    ///
    /// # Errors
    ///
    /// Returns an import, engine or store error.
    pub async fn import(
        &self,
        kind: ResourceKind,
        remote_id: &str,
        plan: &mut Solution,
        state: &mut Solution,
    ) -> Result<bool> {
        let imported = Importer::new(self.engine)
            .import_element(kind, remote_id, plan, state)
            .await?;

        if imported {
            self.persist(state).await?;
        }
        Ok(imported)
    }
}

/// Puts not-yet-deleted entries back into a state at the positions they held.
fn restore<'r>(state: &Solution, entries: impl Iterator<Item = &'r PendingDeletion>) -> Solution {
    let mut entries: Vec<_> = entries.collect();
    entries.sort_by_key(|e| e.position);

    let mut restored = state.clone();
    let mut shifted: HashMap<(ResourceKind, Option<&str>), usize> = HashMap::new();

    for pending in entries {
        let offset = shifted
            .entry((pending.resource.kind(), pending.owner.as_deref()))
            .or_default();
        let at = pending.position + *offset;
        *offset += 1;

        match (&pending.owner, &pending.resource) {
            (Some(owner), Resource::Routine(routine)) => {
                if let Some(component) = restored.components.iter_mut().find(|c| &c.name == owner) {
                    let at = at.min(component.routines.len());
                    component.routines.insert(at, routine.clone());
                }
            }
            _ => {
                restored.insert_at(at, pending.resource.clone(), false);
            }
        }
    }

    restored
}

impl fmt::Debug for SolutionManager<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolutionManager")
            .field("store", &self.store.location())
            .field("confirmer", &self.confirmer)
            .field("checker", &self.checker)
            .field("missing_remote", &self.missing_remote)
            .finish_non_exhaustive()
    }
}
