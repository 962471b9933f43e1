//! Plan/state merging.
//!
//! Every list of the plan is merged into the matching list of the state by
//! name. Entries keep their state position, new entries land at their plan
//! position, and state entries the plan no longer mentions are handed back as
//! deletions together with the position they held.

use tracing::debug;

use crate::config::DEFAULT_DUPLICATE_THRESHOLD;
use crate::error::{ReconcileError, Result};
use crate::model::{
    Alert, Asset, Attribute, Component, File, Function, Resource, RoutineObject, Secret, Solution,
};

/// A routine together with the name of the component that owned it.
pub type OwnedRoutine = (String, Removed<RoutineObject>);

/// A state entry the plan no longer names.
#[derive(Debug, Clone, PartialEq)]
pub struct Removed<T> {
    /// Number of surviving entries that preceded it in its list.
    pub position: usize,
    /// The entry.
    pub entry: T,
}

/// How duplicates are judged while merging one list.
#[derive(Debug, Clone)]
pub struct MergeRule {
    /// Seen-count above which a name is rejected.
    pub threshold: u32,
    /// Enclosing resource, for nested lists.
    pub scope: Option<String>,
}

impl MergeRule {
    /// A rule for a top-level list.
    #[must_use]
    pub const fn top_level(threshold: u32) -> Self {
        Self { threshold, scope: None }
    }

    fn within(&self, scope: String) -> Self {
        Self {
            threshold: self.threshold,
            scope: Some(scope),
        }
    }

    const fn lenient() -> Self {
        Self::top_level(u32::MAX)
    }
}

/// Result of merging one list.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged<T> {
    /// The new state list.
    pub merged: Vec<T>,
    /// State entries the plan no longer names.
    pub removed: Vec<Removed<T>>,
    /// Routines dropped from components that are still present.
    pub orphaned: Vec<OwnedRoutine>,
}

/// An element that can be merged by name.
pub trait Mergeable: Clone {
    /// Kind label used in duplicate errors.
    const KIND: &'static str;

    /// Identity name.
    fn name(&self) -> &str;

    /// Drops nested lists so they can be rebuilt by merging.
    fn clear_nested(&mut self) {}

    /// Takes the plan's fields, keeping the id, and merges nested lists.
    ///
    /// # Errors
    ///
    /// Returns an error if a nested list holds duplicate names.
    fn absorb(&mut self, plan: &Self, rule: &MergeRule, orphaned: &mut Vec<OwnedRoutine>) -> Result<()>;
}

/// Merges a plan list into a state list by name.
///
/// Inputs are left untouched; the merged list and the removed entries are
/// returned as new collections.
///
/// # Errors
///
/// Returns [`ReconcileError::ElementAlreadyDefined`] when a name is seen more
/// often than `rule.threshold` allows.
pub fn merge_by_name<T: Mergeable>(plan: &[T], state: &[T], rule: &MergeRule) -> Result<Merged<T>> {
    let mut working: Vec<(T, u32)> = state.iter().cloned().map(|entry| (entry, 0)).collect();
    let mut orphaned = Vec::new();

    for (index, item) in plan.iter().enumerate() {
        match working.iter().position(|(entry, _)| entry.name() == item.name()) {
            Some(position) => {
                let (entry, seen) = &mut working[position];
                *seen += 1;
                if *seen > rule.threshold {
                    return Err(ReconcileError::already_defined(T::KIND, item.name(), rule.scope.as_deref()).into());
                }
                entry.absorb(item, rule, &mut orphaned)?;
            }
            None => {
                let mut fresh = item.clone();
                fresh.clear_nested();
                fresh.absorb(item, rule, &mut orphaned)?;

                let at = index.min(working.len());
                debug!("New {} '{}' at position {at}", T::KIND, item.name());
                working.insert(at, (fresh, 1));
            }
        }
    }

    let mut merged = Vec::with_capacity(working.len());
    let mut removed = Vec::new();
    for (entry, seen) in working {
        if seen > 0 {
            merged.push(entry);
        } else {
            removed.push(Removed {
                position: merged.len(),
                entry,
            });
        }
    }

    Ok(Merged {
        merged,
        removed,
        orphaned,
    })
}

/// Merges an imported plan list into state without duplicate or removal checks.
fn merge_imported<T: Mergeable>(plan: &[T], state: &[T]) -> Result<Vec<T>> {
    let mut working = state.to_vec();
    let mut ignored = Vec::new();
    let rule = MergeRule::lenient();

    for (index, item) in plan.iter().enumerate() {
        if let Some(entry) = working.iter_mut().find(|entry| entry.name() == item.name()) {
            entry.absorb(item, &rule, &mut ignored)?;
        } else {
            working.insert(index.min(working.len()), item.clone());
        }
    }

    Ok(working)
}

impl Mergeable for Asset {
    const KIND: &'static str = "asset";

    fn name(&self) -> &str {
        &self.name
    }

    fn clear_nested(&mut self) {
        self.attributes.clear();
    }

    fn absorb(&mut self, plan: &Self, rule: &MergeRule, orphaned: &mut Vec<OwnedRoutine>) -> Result<()> {
        let attributes = merge_by_name(
            &plan.attributes,
            &self.attributes,
            &rule.within(format!("asset '{}'", plan.name)),
        )?;
        orphaned.extend(attributes.orphaned);

        *self = Self {
            id: self.id.take(),
            attributes: attributes.merged,
            ..plan.clone()
        };
        Ok(())
    }
}

impl Mergeable for Attribute {
    const KIND: &'static str = "attribute";

    fn name(&self) -> &str {
        &self.name
    }

    fn absorb(&mut self, plan: &Self, _rule: &MergeRule, _orphaned: &mut Vec<OwnedRoutine>) -> Result<()> {
        *self = Self {
            id: self.id.take(),
            ..plan.clone()
        };
        Ok(())
    }
}

impl Mergeable for Component {
    const KIND: &'static str = "component";

    fn name(&self) -> &str {
        &self.name
    }

    fn clear_nested(&mut self) {
        self.routines.clear();
    }

    fn absorb(&mut self, plan: &Self, rule: &MergeRule, orphaned: &mut Vec<OwnedRoutine>) -> Result<()> {
        let routines = merge_by_name(
            &plan.routines,
            &self.routines,
            &rule.within(format!("component '{}'", plan.name)),
        )?;
        orphaned.extend(routines.removed.into_iter().map(|r| (plan.name.clone(), r)));

        // Engine-maintained deployment metadata survives a plan that omits it.
        let deployment = plan.deployment.clone().or_else(|| self.deployment.take());

        *self = Self {
            id: self.id.take(),
            deployment,
            routines: routines.merged,
            ..plan.clone()
        };
        Ok(())
    }
}

impl Mergeable for RoutineObject {
    const KIND: &'static str = "routine";

    fn name(&self) -> &str {
        &self.name
    }

    fn absorb(&mut self, plan: &Self, _rule: &MergeRule, _orphaned: &mut Vec<OwnedRoutine>) -> Result<()> {
        let component = plan.component.clone().or_else(|| self.component.take());
        *self = Self {
            id: self.id.take(),
            component,
            ..plan.clone()
        };
        Ok(())
    }
}

impl Mergeable for File {
    const KIND: &'static str = "file";

    fn name(&self) -> &str {
        &self.name
    }

    fn absorb(&mut self, plan: &Self, _rule: &MergeRule, _orphaned: &mut Vec<OwnedRoutine>) -> Result<()> {
        let url = plan.url.clone().or_else(|| self.url.take());
        *self = Self {
            id: self.id.take(),
            url,
            ..plan.clone()
        };
        Ok(())
    }
}

/// Implements [`Mergeable`] for kinds without nested lists or engine fields.
macro_rules! flat_mergeable {
    ($($ty:ty => $kind:literal),* $(,)?) => {
        $(
            impl Mergeable for $ty {
                const KIND: &'static str = $kind;

                fn name(&self) -> &str {
                    &self.name
                }

                fn absorb(&mut self, plan: &Self, _rule: &MergeRule, _orphaned: &mut Vec<OwnedRoutine>) -> Result<()> {
                    *self = Self {
                        id: self.id.take(),
                        ..plan.clone()
                    };
                    Ok(())
                }
            }
        )*
    };
}

flat_mergeable!(Secret => "secret", Function => "function", Alert => "alert");

/// One deletion, with where its entry sat in the state.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDeletion {
    /// Owning component name, for routines.
    pub owner: Option<String>,
    /// Number of surviving entries that preceded it in its list.
    pub position: usize,
    /// The resource to delete.
    pub resource: Resource,
}

/// Resources the plan no longer names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deletions {
    /// Removed assets.
    pub assets: Vec<Removed<Asset>>,
    /// Removed secrets.
    pub secrets: Vec<Removed<Secret>>,
    /// Removed files.
    pub files: Vec<Removed<File>>,
    /// Removed components.
    pub components: Vec<Removed<Component>>,
    /// Removed functions.
    pub functions: Vec<Removed<Function>>,
    /// Removed alerts.
    pub alerts: Vec<Removed<Alert>>,
    /// Routines removed from components that remain.
    pub routines: Vec<OwnedRoutine>,
}

impl Deletions {
    /// Whether nothing is to be deleted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of pending deletions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
            + self.secrets.len()
            + self.files.len()
            + self.components.len()
            + self.functions.len()
            + self.alerts.len()
            + self.routines.len()
    }

    /// All deletions in the order they must run: routines, components,
    /// functions, alerts, files, secrets, assets.
    ///
    /// Routines carry the name of their component.
    #[must_use]
    pub fn in_order(&self) -> Vec<PendingDeletion> {
        let routines = self.routines.iter().map(|(component, r)| PendingDeletion {
            owner: Some(component.clone()),
            position: r.position,
            resource: Resource::Routine(r.entry.clone()),
        });

        routines
            .chain(pending(&self.components, Resource::Component))
            .chain(pending(&self.functions, Resource::Function))
            .chain(pending(&self.alerts, Resource::Alert))
            .chain(pending(&self.files, Resource::File))
            .chain(pending(&self.secrets, Resource::Secret))
            .chain(pending(&self.assets, Resource::Asset))
            .collect()
    }
}

fn pending<T: Clone>(list: &[Removed<T>], wrap: fn(T) -> Resource) -> impl Iterator<Item = PendingDeletion> + '_ {
    list.iter().map(move |r| PendingDeletion {
        owner: None,
        position: r.position,
        resource: wrap(r.entry.clone()),
    })
}

/// Output of [`SolutionChecker::check`].
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    /// Resources to delete.
    pub deletions: Deletions,
    /// The plan, unchanged.
    pub plan: Solution,
    /// The merged state.
    pub state: Solution,
}

/// Merges plans into states.
#[derive(Debug, Clone, Copy)]
pub struct SolutionChecker {
    threshold: u32,
}

impl Default for SolutionChecker {
    fn default() -> Self {
        Self::new(DEFAULT_DUPLICATE_THRESHOLD)
    }
}

impl SolutionChecker {
    /// Creates a checker with a duplicate threshold.
    #[must_use]
    pub const fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    /// Merges `plan` into `state`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::ElementAlreadyDefined`] if the plan repeats a
    /// name, at any nesting level.
    pub fn check(&self, plan: &Solution, state: &Solution) -> Result<CheckOutcome> {
        let rule = MergeRule::top_level(self.threshold);

        let assets = merge_by_name(&plan.assets, &state.assets, &rule)?;
        let secrets = merge_by_name(&plan.secrets, &state.secrets, &rule)?;
        let files = merge_by_name(&plan.files, &state.files, &rule)?;
        let components = merge_by_name(&plan.components, &state.components, &rule)?;
        let functions = merge_by_name(&plan.functions, &state.functions, &rule)?;
        let alerts = merge_by_name(&plan.alerts, &state.alerts, &rule)?;

        let merged_state = Solution {
            assets: assets.merged,
            secrets: secrets.merged,
            files: files.merged,
            components: components.merged,
            functions: functions.merged,
            alerts: alerts.merged,
            imported_assets: merge_imported(&plan.imported_assets, &state.imported_assets)?,
            imported_secrets: merge_imported(&plan.imported_secrets, &state.imported_secrets)?,
            imported_files: merge_imported(&plan.imported_files, &state.imported_files)?,
            imported_components: merge_imported(&plan.imported_components, &state.imported_components)?,
            imported_functions: merge_imported(&plan.imported_functions, &state.imported_functions)?,
            imported_alerts: merge_imported(&plan.imported_alerts, &state.imported_alerts)?,
            last_applied: state.last_applied,
        };

        let deletions = Deletions {
            assets: assets.removed,
            secrets: secrets.removed,
            files: files.removed,
            components: components.removed,
            functions: functions.removed,
            alerts: alerts.removed,
            routines: components.orphaned,
        };

        debug!("Check complete: {} pending deletions", deletions.len());

        Ok(CheckOutcome {
            deletions,
            plan: plan.clone(),
            state: merged_state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SolutionError;

    fn names<T: Mergeable>(list: &[T]) -> Vec<&str> {
        list.iter().map(Mergeable::name).collect()
    }

    fn removed_names<T: Mergeable>(list: &[Removed<T>]) -> Vec<&str> {
        list.iter().map(|r| r.entry.name()).collect()
    }

    fn removed<T>(entry: T) -> Removed<T> {
        Removed { position: 0, entry }
    }

    fn assets(names: &[&str]) -> Vec<Asset> {
        names.iter().map(|n| Asset::new(n)).collect()
    }

    #[test]
    fn test_merge_preserves_state_order_and_inserts_at_plan_position() {
        let state = vec![Asset::new("A").with_id("1"), Asset::new("C").with_id("3")];
        let plan = assets(&["A", "B", "C", "D"]);

        let merged = merge_by_name(&plan, &state, &MergeRule::top_level(1)).expect("merge");

        assert_eq!(names(&merged.merged), ["A", "B", "C", "D"]);
        assert!(merged.removed.is_empty());
        assert_eq!(merged.merged[0].id.as_deref(), Some("1"));
        assert_eq!(merged.merged[2].id.as_deref(), Some("3"));
        assert!(merged.merged[1].id.is_none());
    }

    #[test]
    fn test_merge_moves_missing_names_to_removed() {
        let state = vec![Asset::new("A").with_id("1"), Asset::new("B").with_id("2")];
        let plan = assets(&["B"]);

        let merged = merge_by_name(&plan, &state, &MergeRule::top_level(1)).expect("merge");

        assert_eq!(names(&merged.merged), ["B"]);
        assert_eq!(removed_names(&merged.removed), ["A"]);
    }

    #[test]
    fn test_removed_entries_remember_their_position() {
        let state = vec![
            Asset::new("A").with_id("1"),
            Asset::new("B").with_id("2"),
            Asset::new("C").with_id("3"),
            Asset::new("D").with_id("4"),
        ];
        let plan = assets(&["B", "D"]);

        let merged = merge_by_name(&plan, &state, &MergeRule::top_level(1)).expect("merge");

        assert_eq!(names(&merged.merged), ["B", "D"]);
        let positions: Vec<_> = merged.removed.iter().map(|r| (r.entry.name.as_str(), r.position)).collect();
        assert_eq!(positions, [("A", 0), ("C", 1)]);
    }

    #[test]
    fn test_merge_leaves_inputs_untouched() {
        let state = vec![Asset::new("A").with_id("1")];
        let plan = assets(&["B"]);
        let before = state.clone();

        let _ = merge_by_name(&plan, &state, &MergeRule::top_level(1)).expect("merge");
        assert_eq!(state, before);
    }

    #[test]
    fn test_second_occurrence_is_rejected_by_default() {
        let err = merge_by_name(&assets(&["A", "A"]), &[], &MergeRule::top_level(1)).unwrap_err();
        assert!(matches!(
            err,
            SolutionError::Reconcile(ReconcileError::ElementAlreadyDefined { ref name, .. }) if name == "A"
        ));
    }

    #[test]
    fn test_legacy_threshold_admits_one_duplicate() {
        let merged = merge_by_name(&assets(&["A", "A"]), &[], &MergeRule::top_level(2)).expect("merge");
        assert_eq!(names(&merged.merged), ["A"]);

        assert!(merge_by_name(&assets(&["A", "A", "A"]), &[], &MergeRule::top_level(2)).is_err());
    }

    #[test]
    fn test_scalar_overwrite_keeps_ids_and_recurses() {
        let state = vec![Asset {
            description: Some(String::from("old")),
            ..Asset::new("Tank1")
                .with_id("A1")
                .with_attribute(Attribute::new("temperature", "number").with_id("T1"))
                .with_attribute(Attribute::new("pressure", "number").with_id("P1"))
        }];
        let plan = vec![Asset {
            description: Some(String::from("new")),
            ..Asset::new("Tank1")
                .with_attribute(Attribute::new("level", "number"))
                .with_attribute(Attribute::new("temperature", "integer"))
        }];

        let merged = merge_by_name(&plan, &state, &MergeRule::top_level(1)).expect("merge");
        let tank = &merged.merged[0];

        assert_eq!(tank.id.as_deref(), Some("A1"));
        assert_eq!(tank.description.as_deref(), Some("new"));
        assert_eq!(names(&tank.attributes), ["level", "temperature"]);
        assert_eq!(tank.attributes[1].id.as_deref(), Some("T1"));
        assert_eq!(tank.attributes[1].attribute_type, "integer");
    }

    #[test]
    fn test_nested_duplicates_name_their_scope() {
        let plan = vec![Asset::new("Tank1")
            .with_attribute(Attribute::new("temperature", "number"))
            .with_attribute(Attribute::new("temperature", "number"))];

        let err = merge_by_name(&plan, &[], &MergeRule::top_level(1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Reconciliation error: attribute 'temperature' is already defined in asset 'Tank1'"
        );
    }

    #[test]
    fn test_check_detects_deleted_asset() {
        let state = Solution {
            assets: vec![Asset::new("Tank1").with_id("A1")],
            ..Solution::default()
        };

        let outcome = SolutionChecker::default().check(&Solution::default(), &state).expect("check");

        assert_eq!(removed_names(&outcome.deletions.assets), ["Tank1"]);
        assert!(outcome.state.assets.is_empty());
    }

    #[test]
    fn test_check_reports_routines_dropped_from_live_component() {
        let mut routine = RoutineObject::new("control");
        routine.id = Some(String::from("R1"));
        let state = Solution {
            components: vec![Component {
                id: Some(String::from("C1")),
                ..Component::new("pump").with_routine(routine)
            }],
            ..Solution::default()
        };
        let plan = Solution {
            components: vec![Component::new("pump")],
            ..Solution::default()
        };

        let outcome = SolutionChecker::default().check(&plan, &state).expect("check");

        assert!(outcome.deletions.components.is_empty());
        assert_eq!(outcome.deletions.routines.len(), 1);
        assert_eq!(outcome.deletions.routines[0].0, "pump");
        assert!(outcome.state.components[0].routines.is_empty());
        assert_eq!(outcome.state.components[0].id.as_deref(), Some("C1"));
    }

    #[test]
    fn test_imported_lists_are_never_pruned() {
        let state = Solution {
            imported_assets: vec![Asset::new("Boiler").with_id("A2")],
            ..Solution::default()
        };

        let outcome = SolutionChecker::default().check(&Solution::default(), &state).expect("check");

        assert!(outcome.deletions.is_empty());
        assert_eq!(names(&outcome.state.imported_assets), ["Boiler"]);
    }

    #[test]
    fn test_engine_fields_survive_merge() {
        let mut routine = RoutineObject::new("control");
        routine.component = Some(String::from("C1"));
        let state = vec![Component {
            id: Some(String::from("C1")),
            deployment: Some(serde_json::json!({"replicas": 1})),
            ..Component::new("pump").with_routine(routine)
        }];
        let plan = vec![Component::new("pump").with_routine(RoutineObject::new("control"))];

        let merged = merge_by_name(&plan, &state, &MergeRule::top_level(1)).expect("merge");

        assert!(merged.merged[0].deployment.is_some());
        assert_eq!(merged.merged[0].routines[0].component.as_deref(), Some("C1"));
    }

    #[test]
    fn test_deletion_order() {
        let deletions = Deletions {
            assets: vec![removed(Asset::new("Tank1"))],
            components: vec![removed(Component::new("pump"))],
            routines: vec![(String::from("mixer"), removed(RoutineObject::new("stir")))],
            ..Deletions::default()
        };

        let kinds: Vec<_> = deletions.in_order().iter().map(|d| d.resource.kind().as_str()).collect();
        assert_eq!(kinds, ["routine", "component", "asset"]);
    }
}
