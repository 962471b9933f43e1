//! Error types for the solution reconciler.
//!
//! This module provides the error hierarchy for every stage of a run:
//! loading and validating documents, persisting state, talking to the remote
//! resource engine, and reconciling plan against state.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the solution reconciler.
#[derive(Debug, Error)]
pub enum SolutionError {
    /// Configuration and document loading errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// State persistence errors.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Remote engine errors.
    #[error("Remote engine error: {0}")]
    Remote(#[from] RemoteError),

    /// Reconciliation errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration and document loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A document or configuration file was not found.
    #[error("File not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// A document could not be parsed.
    #[error("Failed to parse document: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// A document failed schema validation.
    #[error("Validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// A setting has an unusable value.
    #[error("Invalid value for {name}: {value}")]
    InvalidValue {
        /// Name of the setting.
        name: String,
        /// The rejected value.
        value: String,
    },
}

/// State persistence errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// State document is unreadable.
    #[error("State is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// State document could not be written.
    #[error("Failed to write state: {message}")]
    WriteFailed {
        /// Description of the write failure.
        message: String,
    },

    /// S3 backend error.
    #[error("S3 state backend error: {message}")]
    S3Error {
        /// Description of the S3 error.
        message: String,
    },

    /// Serialization error.
    #[error("State serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },
}

/// Remote engine errors. None of these are retried.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Authentication failed.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request failed.
    #[error("API request failed: {status} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// The engine has no resource with this id.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Resource kind.
        kind: String,
        /// Requested id.
        id: String,
    },

    /// Network error.
    #[error("Network error communicating with the engine: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from the API.
    #[error("Invalid response from the engine: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A name repeats beyond the allowed count within one list.
    #[error("{kind} '{name}' is already defined{}", scope_suffix(.scope.as_deref()))]
    ElementAlreadyDefined {
        /// Kind of the duplicated element.
        kind: String,
        /// The duplicated name.
        name: String,
        /// Enclosing resource, for nested elements.
        scope: Option<String>,
    },

    /// A reference or id cannot be resolved.
    #[error("Undefined ID: {message}")]
    UndefinedId {
        /// What could not be resolved, with its location.
        message: String,
    },

    /// A reference names an asset attribute that has no remote id yet.
    #[error("Unresolved reference: {message}")]
    NotCreated {
        /// What is missing, with its location.
        message: String,
    },

    /// A routine input/output value has the wrong shape.
    #[error("Invalid value for '{element}' in routine '{routine}' of component '{component}': {reason}")]
    InvalidReferenceValue {
        /// Component owning the routine.
        component: String,
        /// Routine owning the element.
        routine: String,
        /// Input or output element name.
        element: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The operation does not apply to this resource kind.
    #[error("Operation not supported for {kind}")]
    UnsupportedKind {
        /// Resource kind.
        kind: String,
    },

    /// The run was aborted.
    #[error("Aborted: {reason}")]
    Aborted {
        /// Reason for abort.
        reason: String,
    },
}

/// Renders the " in <scope>" suffix of a duplicate element message.
fn scope_suffix(scope: Option<&str>) -> String {
    scope.map(|s| format!(" in {s}")).unwrap_or_default()
}

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, SolutionError>;

impl SolutionError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if the error stems from plan content rather than infrastructure.
    #[must_use]
    pub const fn is_plan_error(&self) -> bool {
        matches!(
            self,
            Self::Config(ConfigError::ValidationError { .. } | ConfigError::ParseError { .. })
                | Self::Reconcile(
                    ReconcileError::ElementAlreadyDefined { .. }
                        | ReconcileError::UndefinedId { .. }
                        | ReconcileError::InvalidReferenceValue { .. }
                )
        )
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl StateError {
    /// Creates an S3 error with the given message.
    #[must_use]
    pub fn s3(message: impl Into<String>) -> Self {
        Self::S3Error {
            message: message.into(),
        }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}

impl RemoteError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }
}

impl ReconcileError {
    /// Creates an undefined id error.
    #[must_use]
    pub fn undefined(message: impl Into<String>) -> Self {
        Self::UndefinedId {
            message: message.into(),
        }
    }

    /// Creates an error for a reference to a resource not created yet.
    #[must_use]
    pub fn not_created(message: impl Into<String>) -> Self {
        Self::NotCreated {
            message: message.into(),
        }
    }

    /// Creates a duplicate element error.
    #[must_use]
    pub fn already_defined(kind: &str, name: &str, scope: Option<&str>) -> Self {
        Self::ElementAlreadyDefined {
            kind: kind.to_string(),
            name: name.to_string(),
            scope: scope.map(str::to_string),
        }
    }
}
