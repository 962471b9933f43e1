//! Planning: what an apply would do, without doing it.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::{Resource, ResourceKind, Solution};
use crate::remote::RemoteEngine;

use super::checker::Deletions;
use super::diff::{DiffEngine, ResourceDiff};

/// The planned fate of one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum PlannedChange {
    /// Not created yet; will be created.
    Create,
    /// Tracked id no longer exists remotely; will be created again if applied.
    MissingRemotely,
    /// Local and remote copies agree.
    NoChange,
    /// The copies differ.
    Update(ResourceDiff),
    /// Dropped from the plan; will be deleted.
    Delete,
}

/// One line of a plan report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanEntry {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Resource name.
    pub name: String,
    /// Owning component, for routines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// Whether the resource is imported.
    pub imported: bool,
    /// What will happen.
    pub change: PlannedChange,
    /// Rendered body, for resources that will be created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// The result of planning a whole solution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanReport {
    /// Fingerprint of the plan document.
    pub fingerprint: String,
    /// Entries in apply order.
    pub entries: Vec<PlanEntry>,
}

impl PlanReport {
    fn count(&self, wanted: impl Fn(&PlannedChange) -> bool) -> usize {
        self.entries.iter().filter(|e| wanted(&e.change)).count()
    }

    /// Resources that will be created, including ones missing remotely.
    #[must_use]
    pub fn creates(&self) -> usize {
        self.count(|c| matches!(c, PlannedChange::Create | PlannedChange::MissingRemotely))
    }

    /// Resources whose copies differ.
    #[must_use]
    pub fn updates(&self) -> usize {
        self.count(|c| matches!(c, PlannedChange::Update(_)))
    }

    /// Resources that will be deleted.
    #[must_use]
    pub fn deletes(&self) -> usize {
        self.count(|c| matches!(c, PlannedChange::Delete))
    }

    /// Resources with nothing to do.
    #[must_use]
    pub fn unchanged(&self) -> usize {
        self.count(|c| matches!(c, PlannedChange::NoChange))
    }

    /// Whether applying would change anything.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.unchanged() < self.entries.len()
    }

    /// Finds the entry for a named resource.
    #[must_use]
    pub fn entry(&self, kind: ResourceKind, name: &str) -> Option<&PlanEntry> {
        self.entries.iter().find(|e| e.kind == kind && e.name == name)
    }
}

/// Computes planned changes against the engine.
pub struct PlanExecutor<'a> {
    engine: &'a dyn RemoteEngine,
    diff: &'a DiffEngine,
}

impl<'a> PlanExecutor<'a> {
    /// Creates a plan executor.
    #[must_use]
    pub fn new(engine: &'a dyn RemoteEngine, diff: &'a DiffEngine) -> Self {
        Self { engine, diff }
    }

    /// Plans one resource of the state.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be queried.
    pub async fn plan_elem_state(&self, resource: &Resource) -> Result<PlannedChange> {
        let kind = resource.kind();
        let Some(id) = resource.id() else {
            debug!("{kind} '{}' will be created", resource.name());
            return Ok(PlannedChange::Create);
        };

        let remote = self
            .engine
            .list_by_id(kind, id)
            .await?
            .into_iter()
            .find(|r| r.id() == Some(id));

        let Some(remote) = remote else {
            warn!("{kind} '{}' ({id}) was not found remotely", resource.name());
            return Ok(PlannedChange::MissingRemotely);
        };

        let diff = self.diff.diff(resource, &remote)?;
        if diff.is_empty() {
            Ok(PlannedChange::NoChange)
        } else {
            Ok(PlannedChange::Update(diff))
        }
    }

    async fn entry(&self, resource: &Resource, component: Option<&str>, imported: bool) -> Result<PlanEntry> {
        let change = self.plan_elem_state(resource).await?;
        let body = matches!(change, PlannedChange::Create | PlannedChange::MissingRemotely)
            .then(|| resource.render());

        Ok(PlanEntry {
            kind: resource.kind(),
            name: resource.name().to_string(),
            component: component.map(str::to_string),
            imported,
            change,
            body,
        })
    }

    /// Plans every resource of a resolved state plus pending deletions.
    ///
    /// Deletions of entries that were never created are left out, since
    /// apply only drops them from the state.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be queried.
    pub async fn plan_solution(&self, plan: &Solution, state: &Solution, deletions: &Deletions) -> Result<PlanReport> {
        let mut entries = Vec::new();

        for deletion in deletions.in_order() {
            let resource = deletion.resource;
            if resource.id().is_none() {
                debug!("{} '{}' was never created; nothing to delete", resource.kind(), resource.name());
                continue;
            }

            entries.push(PlanEntry {
                kind: resource.kind(),
                name: resource.name().to_string(),
                component: deletion.owner,
                imported: false,
                change: PlannedChange::Delete,
                body: None,
            });
        }

        for imported in [false, true] {
            for kind in ResourceKind::TOP_LEVEL {
                for resource in state.resources(kind, imported) {
                    entries.push(self.entry(&resource, None, imported).await?);

                    if let Resource::Component(component) = &resource {
                        for routine in &component.routines {
                            let routine = Resource::Routine(routine.clone());
                            entries.push(self.entry(&routine, Some(&component.name), imported).await?);
                        }
                    }
                }
            }
        }

        Ok(PlanReport {
            fingerprint: plan.fingerprint(),
            entries,
        })
    }
}

impl std::fmt::Debug for PlanExecutor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanExecutor").finish_non_exhaustive()
    }
}
