//! Reconciliation engine for solution documents.
//!
//! This module merges a plan into the last known state, resolves symbolic
//! references and converges the engine:
//! - Name-based merging and deletion detection
//! - Reference resolution for routine inputs and outputs
//! - Field-level diffing against remote copies
//! - Plan, apply, destroy and import, each gated by operator confirmation

mod apply;
mod checker;
mod confirm;
mod destroy;
mod diff;
mod import;
mod manager;
mod plan;
mod resolver;

pub use apply::{Applied, ApplyAction, ApplyExecutor};
pub use checker::{
    merge_by_name, CheckOutcome, Deletions, MergeRule, Mergeable, Merged, OwnedRoutine,
    PendingDeletion, Removed, SolutionChecker,
};
pub use confirm::{ConfirmPolicy, Confirmer, DiffResolution, Prompter};
pub use destroy::Destroyer;
pub use diff::{DiffEngine, FieldChange, ResourceDiff};
pub use import::Importer;
pub use manager::{ApplySummary, SolutionManager};
pub use plan::{PlanEntry, PlanExecutor, PlanReport, PlannedChange};
pub use resolver::ReferenceResolver;

#[cfg(test)]
pub use confirm::MockPrompter;
#[cfg(test)]
pub(crate) use confirm::scripted;
