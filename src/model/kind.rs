//! Resource kinds and the tagged resource union.
//!
//! Every kind the reconciler manages is a variant of [`ResourceKind`], so
//! dispatch over kinds is checked exhaustively at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, SolutionError};

use super::resources::{Alert, Asset, Component, File, Function, RoutineObject, Secret};

/// The kinds of resources held by a solution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// An asset with its attributes.
    Asset,
    /// A secret value.
    Secret,
    /// A stored file.
    File,
    /// A component owning routines.
    Component,
    /// A routine nested in a component.
    Routine,
    /// A function.
    Function,
    /// An alert.
    Alert,
}

/// Volatile field paths, matched against rendered diff paths.
const ASSET_VOLATILE: &[&str] = &[r"^description$", r"^attributes\[\d+\]\.description$"];
const FILE_VOLATILE: &[&str] = &[r"^url$", r"^size$"];
const COMPONENT_VOLATILE: &[&str] = &[r"^deployment(\..*)?$", r"^status$", r"^routines(\[.*)?$"];
const ROUTINE_VOLATILE: &[&str] = &[r"^component$"];

impl ResourceKind {
    /// Top-level kinds, in create/update order.
    pub const TOP_LEVEL: [Self; 6] = [
        Self::Asset,
        Self::Secret,
        Self::File,
        Self::Component,
        Self::Function,
        Self::Alert,
    ];

    /// Path segment of this kind in the engine API.
    #[must_use]
    pub const fn api_path(self) -> &'static str {
        match self {
            Self::Asset => "assets",
            Self::Secret => "secrets",
            Self::File => "files",
            Self::Component => "components",
            Self::Routine => "routines",
            Self::Function => "functions",
            Self::Alert => "alerts",
        }
    }

    /// Field path patterns that are ignored when diffing against the engine.
    #[must_use]
    pub const fn volatile_fields(self) -> &'static [&'static str] {
        match self {
            Self::Asset => ASSET_VOLATILE,
            Self::File => FILE_VOLATILE,
            Self::Component => COMPONENT_VOLATILE,
            Self::Routine => ROUTINE_VOLATILE,
            Self::Secret | Self::Function | Self::Alert => &[],
        }
    }

    /// Whether resources of this kind can be imported on their own.
    #[must_use]
    pub const fn is_importable(self) -> bool {
        !matches!(self, Self::Routine)
    }

    /// Lowercase singular name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Secret => "secret",
            Self::File => "file",
            Self::Component => "component",
            Self::Routine => "routine",
            Self::Function => "function",
            Self::Alert => "alert",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = SolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().trim_end_matches('s') {
            "asset" => Ok(Self::Asset),
            "secret" => Ok(Self::Secret),
            "file" => Ok(Self::File),
            "component" => Ok(Self::Component),
            "routine" => Ok(Self::Routine),
            "function" => Ok(Self::Function),
            "alert" => Ok(Self::Alert),
            _ => Err(SolutionError::Config(ConfigError::InvalidValue {
                name: String::from("resource kind"),
                value: s.to_string(),
            })),
        }
    }
}

/// One managed resource of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Resource {
    /// An asset.
    Asset(Asset),
    /// A secret.
    Secret(Secret),
    /// A file.
    File(File),
    /// A component.
    Component(Component),
    /// A routine.
    Routine(RoutineObject),
    /// A function.
    Function(Function),
    /// An alert.
    Alert(Alert),
}

/// Dispatches an expression over every variant of [`Resource`].
macro_rules! each_resource {
    ($value:expr, $inner:ident => $body:expr) => {
        match $value {
            Resource::Asset($inner) => $body,
            Resource::Secret($inner) => $body,
            Resource::File($inner) => $body,
            Resource::Component($inner) => $body,
            Resource::Routine($inner) => $body,
            Resource::Function($inner) => $body,
            Resource::Alert($inner) => $body,
        }
    };
}

impl Resource {
    /// Kind of this resource.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Asset(_) => ResourceKind::Asset,
            Self::Secret(_) => ResourceKind::Secret,
            Self::File(_) => ResourceKind::File,
            Self::Component(_) => ResourceKind::Component,
            Self::Routine(_) => ResourceKind::Routine,
            Self::Function(_) => ResourceKind::Function,
            Self::Alert(_) => ResourceKind::Alert,
        }
    }

    /// Remote id, if the resource has been created.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        each_resource!(self, r => r.id.as_deref())
    }

    /// Sets the remote id.
    pub fn set_id(&mut self, id: Option<String>) {
        each_resource!(self, r => r.id = id);
    }

    /// Identity name.
    #[must_use]
    pub fn name(&self) -> &str {
        each_resource!(self, r => r.name.as_str())
    }

    /// Strips the remote id and every nested id.
    pub fn clear_ids(&mut self) {
        match self {
            Self::Asset(asset) => {
                asset.id = None;
                for attribute in &mut asset.attributes {
                    attribute.id = None;
                }
            }
            Self::Component(component) => {
                component.id = None;
                for routine in &mut component.routines {
                    routine.id = None;
                    routine.component = None;
                }
            }
            other => other.set_id(None),
        }
    }

    /// Serializes the resource body (without the kind tag) for diffing.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource cannot be represented as JSON.
    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        each_resource!(self, r => serde_json::to_value(r))
    }

    /// Decodes a resource body of a known kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not match the kind's shape.
    pub fn from_value(kind: ResourceKind, value: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match kind {
            ResourceKind::Asset => Self::Asset(serde_json::from_value(value)?),
            ResourceKind::Secret => Self::Secret(serde_json::from_value(value)?),
            ResourceKind::File => Self::File(serde_json::from_value(value)?),
            ResourceKind::Component => Self::Component(serde_json::from_value(value)?),
            ResourceKind::Routine => Self::Routine(serde_json::from_value(value)?),
            ResourceKind::Function => Self::Function(serde_json::from_value(value)?),
            ResourceKind::Alert => Self::Alert(serde_json::from_value(value)?),
        })
    }

    /// Renders the resource body as YAML for operator review.
    #[must_use]
    pub fn render(&self) -> String {
        each_resource!(self, r => serde_yaml::to_string(r)).unwrap_or_else(|e| format!("<unrenderable: {e}>"))
    }
}
