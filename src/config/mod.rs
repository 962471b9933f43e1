//! Configuration module for the solution reconciler.
//!
//! This module handles:
//! - Runtime settings from `SOLUTION_*` environment variables and `.env`
//! - Validation of plan and state documents

mod settings;
mod validator;

pub use settings::{
    load_dotenv, MissingRemotePolicy, Settings, StateLocation, DEFAULT_DUPLICATE_THRESHOLD,
    DEFAULT_STATE_FILE, DEFAULT_TIMEOUT_SECS,
};
pub use validator::{SolutionValidator, ValidationError, ValidationResult};
