//! Schema validation for solution documents.
//!
//! Structural rules (non-empty names) are declared on the model with the
//! `validator` derive; the rules here cover what a derive cannot express.

use tracing::debug;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::{ConfigError, Result, SolutionError};
use crate::model::{DataAddressValue, ResourceKind, RoutineObject, Solution};

/// Validator for plan and state documents.
#[derive(Debug, Default)]
pub struct SolutionValidator;

/// Validation result containing all findings.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl SolutionValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a plan document.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any rule fails.
    pub fn validate_plan(&self, plan: &Solution) -> Result<ValidationResult> {
        let mut result = self.collect(plan);

        for kind in ResourceKind::TOP_LEVEL {
            for resource in plan.resources(kind, false) {
                if resource.id().is_some() {
                    result.warnings.push(format!(
                        "{kind} '{}' carries an id in the plan; ids are tracked in the state",
                        resource.name()
                    ));
                }
            }
        }

        Self::finish(result)
    }

    /// Validates a state document.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any rule fails.
    pub fn validate_state(&self, state: &Solution) -> Result<ValidationResult> {
        Self::finish(self.collect(state))
    }

    /// Runs the rules shared by plans and states.
    fn collect(&self, solution: &Solution) -> ValidationResult {
        let mut result = ValidationResult::default();

        if let Err(errors) = solution.validate() {
            flatten_errors("", &errors, &mut result.errors);
        }

        for kind in ResourceKind::TOP_LEVEL {
            for (index, resource) in solution.resources(kind, true).iter().enumerate() {
                if resource.id().is_none() {
                    result.errors.push(ValidationError {
                        field: format!("imported_{}[{index}].id", kind.api_path()),
                        message: format!("imported {kind} '{}' has no id", resource.name()),
                    });
                }
            }
        }

        for (list, components) in [
            ("components", &solution.components),
            ("imported_components", &solution.imported_components),
        ] {
            for (ci, component) in components.iter().enumerate() {
                for (ri, routine) in component.routines.iter().enumerate() {
                    Self::validate_routine(
                        &format!("{list}[{ci}].routines[{ri}]"),
                        routine,
                        &mut result,
                    );
                }
            }
        }

        result
    }

    /// Checks that bound data addresses are complete.
    fn validate_routine(path: &str, routine: &RoutineObject, result: &mut ValidationResult) {
        for (section, elements) in [("input", &routine.input), ("output", &routine.output)] {
            for (index, element) in elements.iter().enumerate() {
                let addresses = match &element.value {
                    Some(DataAddressValue::Single(address)) => std::slice::from_ref(address),
                    Some(DataAddressValue::Many(addresses)) => addresses.as_slice(),
                    None => {
                        if element.required {
                            result.warnings.push(format!(
                                "{path}.{section}[{index}] '{}' is required but has no value",
                                element.name
                            ));
                        }
                        continue;
                    }
                };

                for address in addresses {
                    if address.asset.trim().is_empty() || address.attribute.trim().is_empty() {
                        result.errors.push(ValidationError {
                            field: format!("{path}.{section}[{index}].value"),
                            message: format!(
                                "data address of '{}' needs both an asset and an attribute",
                                element.name
                            ),
                        });
                    }
                }
            }
        }
    }

    fn finish(result: ValidationResult) -> Result<ValidationResult> {
        if let Some(first_error) = result.errors.first() {
            return Err(SolutionError::Config(ConfigError::validation(
                first_error.message.clone(),
                first_error.field.clone(),
            )));
        }

        debug!("Document validation passed with {} warnings", result.warnings.len());
        Ok(result)
    }
}

/// Flattens nested `validator` errors into dotted field paths.
fn flatten_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<ValidationError>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    out.push(ValidationError {
                        field: path.clone(),
                        message: error
                            .message
                            .as_ref()
                            .map_or_else(|| error.code.to_string(), ToString::to_string),
                    });
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten_errors(&format!("{path}[{index}]"), inner, out);
                }
            }
        }
    }
}

impl ValidationResult {
    /// Returns true if there are no errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
