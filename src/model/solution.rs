//! The solution document shared by plans and states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use validator::Validate;

use super::kind::{Resource, ResourceKind};
use super::resources::{Alert, Asset, Component, File, Function, Secret};

/// A solution: six plan-owned resource lists plus their imported counterparts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct Solution {
    /// Assets.
    #[serde(default)]
    #[validate(nested)]
    pub assets: Vec<Asset>,
    /// Secrets.
    #[serde(default)]
    #[validate(nested)]
    pub secrets: Vec<Secret>,
    /// Files.
    #[serde(default)]
    #[validate(nested)]
    pub files: Vec<File>,
    /// Components.
    #[serde(default)]
    #[validate(nested)]
    pub components: Vec<Component>,
    /// Functions.
    #[serde(default)]
    #[validate(nested)]
    pub functions: Vec<Function>,
    /// Alerts.
    #[serde(default)]
    #[validate(nested)]
    pub alerts: Vec<Alert>,

    /// Imported assets.
    #[serde(default)]
    #[validate(nested)]
    pub imported_assets: Vec<Asset>,
    /// Imported secrets.
    #[serde(default)]
    #[validate(nested)]
    pub imported_secrets: Vec<Secret>,
    /// Imported files.
    #[serde(default)]
    #[validate(nested)]
    pub imported_files: Vec<File>,
    /// Imported components.
    #[serde(default)]
    #[validate(nested)]
    pub imported_components: Vec<Component>,
    /// Imported functions.
    #[serde(default)]
    #[validate(nested)]
    pub imported_functions: Vec<Function>,
    /// Imported alerts.
    #[serde(default)]
    #[validate(nested)]
    pub imported_alerts: Vec<Alert>,

    /// When the document was last persisted by an apply, destroy or import.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_applied: Option<DateTime<Utc>>,
}

/// The desired-state document authored by the operator.
pub type PlanSolution = Solution;

/// The last-known-applied document carrying remote ids.
pub type StateSolution = Solution;

impl Solution {
    /// Creates an empty solution.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resources of one kind, as tagged resources.
    #[must_use]
    pub fn resources(&self, kind: ResourceKind, imported: bool) -> Vec<Resource> {
        match (kind, imported) {
            (ResourceKind::Asset, false) => self.assets.iter().cloned().map(Resource::Asset).collect(),
            (ResourceKind::Asset, true) => self.imported_assets.iter().cloned().map(Resource::Asset).collect(),
            (ResourceKind::Secret, false) => self.secrets.iter().cloned().map(Resource::Secret).collect(),
            (ResourceKind::Secret, true) => self.imported_secrets.iter().cloned().map(Resource::Secret).collect(),
            (ResourceKind::File, false) => self.files.iter().cloned().map(Resource::File).collect(),
            (ResourceKind::File, true) => self.imported_files.iter().cloned().map(Resource::File).collect(),
            (ResourceKind::Component, false) => self.components.iter().cloned().map(Resource::Component).collect(),
            (ResourceKind::Component, true) => {
                self.imported_components.iter().cloned().map(Resource::Component).collect()
            }
            (ResourceKind::Function, false) => self.functions.iter().cloned().map(Resource::Function).collect(),
            (ResourceKind::Function, true) => {
                self.imported_functions.iter().cloned().map(Resource::Function).collect()
            }
            (ResourceKind::Alert, false) => self.alerts.iter().cloned().map(Resource::Alert).collect(),
            (ResourceKind::Alert, true) => self.imported_alerts.iter().cloned().map(Resource::Alert).collect(),
            (ResourceKind::Routine, false) => self
                .components
                .iter()
                .flat_map(|c| c.routines.iter().cloned().map(Resource::Routine))
                .collect(),
            (ResourceKind::Routine, true) => self
                .imported_components
                .iter()
                .flat_map(|c| c.routines.iter().cloned().map(Resource::Routine))
                .collect(),
        }
    }

    /// Number of entries in one top-level list.
    #[must_use]
    pub fn len_of(&self, kind: ResourceKind, imported: bool) -> usize {
        match (kind, imported) {
            (ResourceKind::Asset, false) => self.assets.len(),
            (ResourceKind::Asset, true) => self.imported_assets.len(),
            (ResourceKind::Secret, false) => self.secrets.len(),
            (ResourceKind::Secret, true) => self.imported_secrets.len(),
            (ResourceKind::File, false) => self.files.len(),
            (ResourceKind::File, true) => self.imported_files.len(),
            (ResourceKind::Component, false) => self.components.len(),
            (ResourceKind::Component, true) => self.imported_components.len(),
            (ResourceKind::Function, false) => self.functions.len(),
            (ResourceKind::Function, true) => self.imported_functions.len(),
            (ResourceKind::Alert, false) => self.alerts.len(),
            (ResourceKind::Alert, true) => self.imported_alerts.len(),
            (ResourceKind::Routine, _) => 0,
        }
    }

    /// The entry at `index` of a top-level list.
    #[must_use]
    pub fn resource_at(&self, kind: ResourceKind, index: usize, imported: bool) -> Option<Resource> {
        match (kind, imported) {
            (ResourceKind::Asset, false) => self.assets.get(index).cloned().map(Resource::Asset),
            (ResourceKind::Asset, true) => self.imported_assets.get(index).cloned().map(Resource::Asset),
            (ResourceKind::Secret, false) => self.secrets.get(index).cloned().map(Resource::Secret),
            (ResourceKind::Secret, true) => self.imported_secrets.get(index).cloned().map(Resource::Secret),
            (ResourceKind::File, false) => self.files.get(index).cloned().map(Resource::File),
            (ResourceKind::File, true) => self.imported_files.get(index).cloned().map(Resource::File),
            (ResourceKind::Component, false) => self.components.get(index).cloned().map(Resource::Component),
            (ResourceKind::Component, true) => {
                self.imported_components.get(index).cloned().map(Resource::Component)
            }
            (ResourceKind::Function, false) => self.functions.get(index).cloned().map(Resource::Function),
            (ResourceKind::Function, true) => {
                self.imported_functions.get(index).cloned().map(Resource::Function)
            }
            (ResourceKind::Alert, false) => self.alerts.get(index).cloned().map(Resource::Alert),
            (ResourceKind::Alert, true) => self.imported_alerts.get(index).cloned().map(Resource::Alert),
            (ResourceKind::Routine, _) => None,
        }
    }

    /// The plan-owned or imported component list.
    pub fn components_mut(&mut self, imported: bool) -> &mut Vec<Component> {
        if imported {
            &mut self.imported_components
        } else {
            &mut self.components
        }
    }

    /// Whether a resource with this id exists in the plan-owned or imported list of `kind`.
    #[must_use]
    pub fn contains_id(&self, kind: ResourceKind, id: &str) -> bool {
        [false, true]
            .into_iter()
            .flat_map(|imported| self.resources(kind, imported))
            .any(|r| r.id() == Some(id))
    }

    /// Replaces the entry at `index` of a list with `resource`.
    ///
    /// Returns false if the kind does not match the list or the index is out of range.
    pub fn replace_at(&mut self, index: usize, resource: Resource, imported: bool) -> bool {
        fn put<T>(list: &mut [T], index: usize, value: T) -> bool {
            list.get_mut(index).map(|slot| *slot = value).is_some()
        }

        match (resource, imported) {
            (Resource::Asset(r), false) => put(&mut self.assets, index, r),
            (Resource::Asset(r), true) => put(&mut self.imported_assets, index, r),
            (Resource::Secret(r), false) => put(&mut self.secrets, index, r),
            (Resource::Secret(r), true) => put(&mut self.imported_secrets, index, r),
            (Resource::File(r), false) => put(&mut self.files, index, r),
            (Resource::File(r), true) => put(&mut self.imported_files, index, r),
            (Resource::Component(r), false) => put(&mut self.components, index, r),
            (Resource::Component(r), true) => put(&mut self.imported_components, index, r),
            (Resource::Function(r), false) => put(&mut self.functions, index, r),
            (Resource::Function(r), true) => put(&mut self.imported_functions, index, r),
            (Resource::Alert(r), false) => put(&mut self.alerts, index, r),
            (Resource::Alert(r), true) => put(&mut self.imported_alerts, index, r),
            (Resource::Routine(_), _) => false,
        }
    }

    /// Inserts a resource into a list at `index`, clamped to the list length.
    ///
    /// Returns false for routines, which only live inside components.
    pub fn insert_at(&mut self, index: usize, resource: Resource, imported: bool) -> bool {
        fn put<T>(list: &mut Vec<T>, index: usize, value: T) {
            list.insert(index.min(list.len()), value);
        }

        match (resource, imported) {
            (Resource::Asset(r), false) => put(&mut self.assets, index, r),
            (Resource::Asset(r), true) => put(&mut self.imported_assets, index, r),
            (Resource::Secret(r), false) => put(&mut self.secrets, index, r),
            (Resource::Secret(r), true) => put(&mut self.imported_secrets, index, r),
            (Resource::File(r), false) => put(&mut self.files, index, r),
            (Resource::File(r), true) => put(&mut self.imported_files, index, r),
            (Resource::Component(r), false) => put(&mut self.components, index, r),
            (Resource::Component(r), true) => put(&mut self.imported_components, index, r),
            (Resource::Function(r), false) => put(&mut self.functions, index, r),
            (Resource::Function(r), true) => put(&mut self.imported_functions, index, r),
            (Resource::Alert(r), false) => put(&mut self.alerts, index, r),
            (Resource::Alert(r), true) => put(&mut self.imported_alerts, index, r),
            (Resource::Routine(_), _) => return false,
        }
        true
    }

    /// Appends a resource to a list.
    ///
    /// Returns false for routines, which only live inside components.
    pub fn push(&mut self, resource: Resource, imported: bool) -> bool {
        match (resource, imported) {
            (Resource::Asset(r), false) => self.assets.push(r),
            (Resource::Asset(r), true) => self.imported_assets.push(r),
            (Resource::Secret(r), false) => self.secrets.push(r),
            (Resource::Secret(r), true) => self.imported_secrets.push(r),
            (Resource::File(r), false) => self.files.push(r),
            (Resource::File(r), true) => self.imported_files.push(r),
            (Resource::Component(r), false) => self.components.push(r),
            (Resource::Component(r), true) => self.imported_components.push(r),
            (Resource::Function(r), false) => self.functions.push(r),
            (Resource::Function(r), true) => self.imported_functions.push(r),
            (Resource::Alert(r), false) => self.alerts.push(r),
            (Resource::Alert(r), true) => self.imported_alerts.push(r),
            (Resource::Routine(_), _) => return false,
        }
        true
    }

    /// Removes the first plan-owned resource of `kind` with this name.
    pub fn remove_named(&mut self, kind: ResourceKind, name: &str) -> bool {
        fn drop_named<T>(list: &mut Vec<T>, name: &str, get: impl Fn(&T) -> &str) -> bool {
            list.iter().position(|r| get(r) == name).map(|i| list.remove(i)).is_some()
        }

        match kind {
            ResourceKind::Asset => drop_named(&mut self.assets, name, |r| r.name.as_str()),
            ResourceKind::Secret => drop_named(&mut self.secrets, name, |r| r.name.as_str()),
            ResourceKind::File => drop_named(&mut self.files, name, |r| r.name.as_str()),
            ResourceKind::Component => drop_named(&mut self.components, name, |r| r.name.as_str()),
            ResourceKind::Function => drop_named(&mut self.functions, name, |r| r.name.as_str()),
            ResourceKind::Alert => drop_named(&mut self.alerts, name, |r| r.name.as_str()),
            ResourceKind::Routine => false,
        }
    }

    /// Total number of plan-owned and imported top-level resources.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        ResourceKind::TOP_LEVEL
            .iter()
            .map(|&kind| self.resources(kind, false).len() + self.resources(kind, true).len())
            .sum()
    }

    /// Computes a deterministic fingerprint of the document content.
    ///
    /// The `last_applied` timestamp is not part of the fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut body = self.clone();
        body.last_applied = None;

        let mut hasher = Sha256::new();
        match serde_json::to_vec(&body) {
            Ok(bytes) => hasher.update(&bytes),
            Err(_) => hasher.update(b""),
        }
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::resources::RoutineObject;

    fn sample() -> Solution {
        Solution {
            assets: vec![Asset::new("Tank1").with_id("A1")],
            imported_assets: vec![Asset::new("Boiler").with_id("A2")],
            components: vec![Component::new("pump").with_routine(RoutineObject::new("control"))],
            ..Solution::default()
        }
    }

    #[test]
    fn test_parse_document_with_imported_lists() {
        let yaml = r"
assets:
  - name: Tank1
    attributes:
      - name: temperature
        type: number
imported_components:
  - id: C9
    name: legacy
";
        let solution: Solution = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(solution.assets.len(), 1);
        assert_eq!(solution.assets[0].attributes[0].attribute_type, "number");
        assert_eq!(solution.imported_components[0].id.as_deref(), Some("C9"));
        assert!(solution.files.is_empty());
    }

    #[test]
    fn test_contains_id_searches_both_lists() {
        let solution = sample();
        assert!(solution.contains_id(ResourceKind::Asset, "A1"));
        assert!(solution.contains_id(ResourceKind::Asset, "A2"));
        assert!(!solution.contains_id(ResourceKind::Asset, "A3"));
    }

    #[test]
    fn test_routines_flatten_from_components() {
        let routines = sample().resources(ResourceKind::Routine, false);
        assert_eq!(routines.len(), 1);
        assert_eq!(routines[0].name(), "control");
    }

    #[test]
    fn test_fingerprint_ignores_timestamp() {
        let mut a = sample();
        let b = sample();
        a.last_applied = Some(Utc::now());
        assert_eq!(a.fingerprint(), b.fingerprint());

        a.assets.push(Asset::new("Tank2"));
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_replace_and_remove() {
        let mut solution = sample();
        assert!(solution.replace_at(0, Resource::Asset(Asset::new("Tank1").with_id("A9")), false));
        assert_eq!(solution.assets[0].id.as_deref(), Some("A9"));
        assert!(!solution.replace_at(5, Resource::Asset(Asset::new("x")), false));

        assert!(solution.remove_named(ResourceKind::Asset, "Tank1"));
        assert!(solution.assets.is_empty());
        assert_eq!(solution.imported_assets.len(), 1);
    }

    #[test]
    fn test_insert_at_clamps_to_list_end() {
        let mut solution = sample();
        assert!(solution.insert_at(0, Resource::Asset(Asset::new("Tank0")), false));
        assert!(solution.insert_at(9, Resource::Asset(Asset::new("Tank2")), false));

        let names: Vec<_> = solution.assets.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["Tank0", "Tank1", "Tank2"]);
        assert!(!solution.insert_at(0, Resource::Routine(RoutineObject::new("control")), false));
    }
}
