//! Structural diffing of local and remote resources.
//!
//! Both sides are serialized to JSON values and walked together. A missing
//! field and a `null` field are the same thing. Paths are rendered as
//! `attributes[0].name` and matched against the kind's volatile field
//! patterns, which are skipped.

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::error::{Result, SolutionError};
use crate::model::{Resource, ResourceKind};

/// One differing field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    /// Rendered field path.
    pub path: String,
    /// Local value, `None` if absent locally.
    pub local: Option<Value>,
    /// Remote value, `None` if absent remotely.
    pub remote: Option<Value>,
}

/// All differences between the local and remote copies of one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceDiff {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Resource name.
    pub name: String,
    /// Differing fields, in path order.
    pub changes: Vec<FieldChange>,
}

impl ResourceDiff {
    /// Whether the copies agree.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

fn render(value: Option<&Value>) -> String {
    value.map_or_else(|| String::from("<absent>"), Value::to_string)
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.local, &self.remote) {
            (Some(local), None) => write!(f, "+ {}: {local}", self.path),
            (None, Some(remote)) => write!(f, "- {}: {remote}", self.path),
            (local, remote) => write!(
                f,
                "~ {}: {} -> {}",
                self.path,
                render(remote.as_ref()),
                render(local.as_ref())
            ),
        }
    }
}

impl fmt::Display for ResourceDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} '{}' differs from the engine (remote -> local):", self.kind, self.name)?;
        for change in &self.changes {
            writeln!(f, "  {change}")?;
        }
        Ok(())
    }
}

/// Engine for computing resource diffs.
#[derive(Debug, Clone)]
pub struct DiffEngine {
    /// Compiled volatile field patterns per kind.
    volatile: HashMap<ResourceKind, Vec<Regex>>,
}

impl DiffEngine {
    /// Creates a diff engine with every kind's volatile patterns compiled.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern fails to compile.
    pub fn new() -> Result<Self> {
        let kinds = ResourceKind::TOP_LEVEL.into_iter().chain([ResourceKind::Routine]);
        let mut volatile = HashMap::new();

        for kind in kinds {
            let patterns = kind
                .volatile_fields()
                .iter()
                .map(|pattern| {
                    Regex::new(pattern).map_err(|e| {
                        SolutionError::internal(format!("Invalid volatile pattern {pattern}: {e}"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            volatile.insert(kind, patterns);
        }

        Ok(Self { volatile })
    }

    /// Diffs a local resource against its remote copy.
    ///
    /// # Errors
    ///
    /// Returns an error if either side cannot be serialized.
    pub fn diff(&self, local: &Resource, remote: &Resource) -> Result<ResourceDiff> {
        let kind = local.kind();
        let encode = |resource: &Resource| {
            resource
                .to_value()
                .map_err(|e| SolutionError::internal(format!("Failed to encode {kind}: {e}")))
        };

        let mut changes = Vec::new();
        self.walk(kind, "", &encode(local)?, &encode(remote)?, &mut changes);

        Ok(ResourceDiff {
            kind,
            name: local.name().to_string(),
            changes,
        })
    }

    fn is_volatile(&self, kind: ResourceKind, path: &str) -> bool {
        self.volatile
            .get(&kind)
            .is_some_and(|patterns| patterns.iter().any(|p| p.is_match(path)))
    }

    fn walk(&self, kind: ResourceKind, path: &str, local: &Value, remote: &Value, out: &mut Vec<FieldChange>) {
        if !path.is_empty() && self.is_volatile(kind, path) {
            return;
        }

        match (local, remote) {
            (Value::Object(l), Value::Object(r)) => {
                let keys: BTreeSet<&String> = l.keys().chain(r.keys()).collect();
                for key in keys {
                    let child = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{path}.{key}")
                    };
                    self.walk(
                        kind,
                        &child,
                        l.get(key).unwrap_or(&Value::Null),
                        r.get(key).unwrap_or(&Value::Null),
                        out,
                    );
                }
            }
            (Value::Array(l), Value::Array(r)) => {
                for index in 0..l.len().max(r.len()) {
                    self.walk(
                        kind,
                        &format!("{path}[{index}]"),
                        l.get(index).unwrap_or(&Value::Null),
                        r.get(index).unwrap_or(&Value::Null),
                        out,
                    );
                }
            }
            (l, r) if l == r => {}
            (l, r) => out.push(FieldChange {
                path: path.to_string(),
                local: Some(l.clone()).filter(|v| !v.is_null()),
                remote: Some(r.clone()).filter(|v| !v.is_null()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Asset, Attribute, Component, File, RoutineObject};

    fn engine() -> DiffEngine {
        DiffEngine::new().expect("patterns compile")
    }

    fn tank(description: Option<&str>) -> Asset {
        Asset {
            description: description.map(str::to_string),
            ..Asset::new("Tank1")
                .with_id("A1")
                .with_attribute(Attribute::new("temperature", "number").with_id("T1"))
        }
    }

    #[test]
    fn test_identical_resources_have_no_diff() {
        let resource = Resource::Asset(tank(None));
        assert!(engine().diff(&resource, &resource).expect("diff").is_empty());
    }

    #[test]
    fn test_nested_paths_are_rendered() {
        let local = tank(None);
        let mut remote = tank(None);
        remote.attributes[0].attribute_type = String::from("string");

        let diff = engine()
            .diff(&Resource::Asset(local), &Resource::Asset(remote))
            .expect("diff");

        assert_eq!(diff.changes.len(), 1);
        assert_eq!(diff.changes[0].path, "attributes[0].type");
        assert_eq!(diff.changes[0].to_string(), "~ attributes[0].type: \"string\" -> \"number\"");
    }

    #[test]
    fn test_volatile_fields_are_ignored() {
        let local = Resource::Asset(tank(None));
        let mut remote = tank(Some("auto-populated"));
        remote.attributes[0].description = Some(String::from("auto"));

        assert!(engine().diff(&local, &Resource::Asset(remote)).expect("diff").is_empty());

        let local = Resource::File(File {
            name: String::from("manual"),
            ..File::default()
        });
        let remote = Resource::File(File {
            name: String::from("manual"),
            url: Some(String::from("https://cdn.example.com/manual.pdf")),
            ..File::default()
        });
        assert!(engine().diff(&local, &remote).expect("diff").is_empty());
    }

    #[test]
    fn test_component_routines_and_deployment_are_volatile() {
        let local = Resource::Component(Component::new("pump").with_routine(RoutineObject::new("control")));
        let remote = Resource::Component(Component {
            deployment: Some(serde_json::json!({"status": "running"})),
            ..Component::new("pump")
        });

        assert!(engine().diff(&local, &remote).expect("diff").is_empty());
    }

    #[test]
    fn test_added_and_removed_entries() {
        let local = tank(None).with_attribute(Attribute::new("level", "number"));
        let diff = engine()
            .diff(&Resource::Asset(local), &Resource::Asset(tank(None)))
            .expect("diff");

        assert_eq!(diff.changes.len(), 1);
        assert_eq!(diff.changes[0].path, "attributes[1]");
        assert!(diff.changes[0].remote.is_none());
        assert!(diff.changes[0].to_string().starts_with("+ attributes[1]"));
    }
}
