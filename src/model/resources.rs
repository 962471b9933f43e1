//! Typed resource definitions.
//!
//! These structs map one-to-one to the entries of a solution document. The
//! `id` of every resource is absent until the engine has created it.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::address::DataAddressValue;

/// An asset and its ordered attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Asset {
    /// Remote identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Identity name.
    #[validate(length(min = 1, message = "asset name cannot be empty"))]
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Asset type, if the engine classifies assets.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
    /// Ordered attributes.
    #[serde(default)]
    #[validate(nested)]
    pub attributes: Vec<Attribute>,
}

/// One attribute of an asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Attribute {
    /// Remote identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Identity name within the asset.
    #[validate(length(min = 1, message = "attribute name cannot be empty"))]
    pub name: String,
    /// Value type.
    #[serde(rename = "type")]
    pub attribute_type: String,
    /// Measurement unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A secret value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Secret {
    /// Remote identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Identity name.
    #[validate(length(min = 1, message = "secret name cannot be empty"))]
    pub name: String,
    /// Secret value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// A stored file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct File {
    /// Remote identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Identity name.
    #[validate(length(min = 1, message = "file name cannot be empty"))]
    pub name: String,
    /// Local source path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// MIME type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Download URL computed by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A plain configuration parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Parameter {
    /// Parameter name.
    #[validate(length(min = 1, message = "parameter name cannot be empty"))]
    pub name: String,
    /// Parameter value.
    #[serde(default)]
    pub value: serde_json::Value,
}

/// A component owning an ordered list of routines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct Component {
    /// Remote identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Identity name.
    #[validate(length(min = 1, message = "component name cannot be empty"))]
    pub name: String,
    /// Component version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Deployment metadata maintained by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<serde_json::Value>,
    /// Ordered routines.
    #[serde(default)]
    #[validate(nested)]
    pub routines: Vec<RoutineObject>,
}

/// A routine nested in a component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct RoutineObject {
    /// Remote identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Identity name within the component.
    #[validate(length(min = 1, message = "routine name cannot be empty"))]
    pub name: String,
    /// Remote id of the owning component, set when applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Input data addresses.
    #[serde(default)]
    #[validate(nested)]
    pub input: Vec<InputDataAddress>,
    /// Output data addresses.
    #[serde(default)]
    #[validate(nested)]
    pub output: Vec<InputDataAddress>,
    /// Plain parameters.
    #[serde(default)]
    #[validate(nested)]
    pub config: Vec<Parameter>,
}

/// A named routine input or output bound to data addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct InputDataAddress {
    /// Element name.
    #[validate(length(min = 1, message = "input/output name cannot be empty"))]
    pub name: String,
    /// Whether a value must be bound.
    #[serde(default)]
    pub required: bool,
    /// Whether the value is a list of addresses.
    #[serde(default)]
    pub multiple: bool,
    /// Bound address or addresses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<DataAddressValue>,
}

/// A function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Function {
    /// Remote identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Identity name.
    #[validate(length(min = 1, message = "function name cannot be empty"))]
    pub name: String,
    /// Runtime identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    /// Source reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Plain parameters.
    #[serde(default)]
    #[validate(nested)]
    pub config: Vec<Parameter>,
}

/// An alert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Alert {
    /// Remote identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Identity name.
    #[validate(length(min = 1, message = "alert name cannot be empty"))]
    pub name: String,
    /// Severity level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    /// Triggering condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Notification recipients.
    #[serde(default)]
    pub recipients: Vec<String>,
}

impl Asset {
    /// Creates an asset with no attributes.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Sets the remote id.
    #[must_use]
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Finds an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

impl Attribute {
    /// Creates an attribute.
    #[must_use]
    pub fn new(name: &str, attribute_type: &str) -> Self {
        Self {
            name: name.to_string(),
            attribute_type: attribute_type.to_string(),
            ..Self::default()
        }
    }

    /// Sets the remote id.
    #[must_use]
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }
}

impl Component {
    /// Creates a component with no routines.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Adds a routine.
    #[must_use]
    pub fn with_routine(mut self, routine: RoutineObject) -> Self {
        self.routines.push(routine);
        self
    }
}

impl RoutineObject {
    /// Creates a routine with no inputs or outputs.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Adds an input element.
    #[must_use]
    pub fn with_input(mut self, input: InputDataAddress) -> Self {
        self.input.push(input);
        self
    }
}
