// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![warn(dead_code)]                   // Unused code is flagged
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![warn(unused_imports)]              // Unused imports are flagged
#![warn(unused_variables)]            // Unused variables are flagged
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Solution Reconciler
//!
//! A declarative plan/apply/destroy tool for resources managed by a remote
//! engine: assets, secrets, files, components with their routines, functions
//! and alerts.
//!
//! ## Overview
//!
//! A *solution* document lists resources by name. The reconciler keeps two
//! copies of it:
//!
//! - The **plan**, written by the operator, with symbolic references
//! - The **state**, written by the tool, carrying engine-assigned ids
//!
//! Each run merges the plan into the state by name, resolves routine
//! references such as `local.{{Tank1}}` to concrete ids, and
//! converges the engine one confirmed mutation at a time. The state is
//! persisted after every mutation.
//!
//! ## Modules
//!
//! - [`model`]: Resource types and solution documents
//! - [`config`]: Runtime settings and document validation
//! - [`state`]: Plan loading and state storage backends (local, S3)
//! - [`remote`]: Engine API client and in-memory engine
//! - [`reconciler`]: Merging, reference resolution, diffing and execution
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! assets:
//!   - name: Tank1
//!     attributes:
//!       - name: temperature
//!         type: number
//! components:
//!   - name: pump
//!     routines:
//!       - name: control
//!         input:
//!           - name: temperature
//!             value:
//!               asset: "local.{{Tank1}}"
//!               attribute: temperature
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod reconciler;
pub mod remote;
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{Settings, SolutionValidator};
pub use error::{Result, SolutionError};
pub use model::{Resource, ResourceKind, Solution};
pub use reconciler::{ApplySummary, PlanReport, SolutionManager};
pub use remote::{HttpEngineClient, InMemoryEngine, RemoteEngine};
pub use state::{LocalSolutionStore, S3SolutionStore, SolutionLoader, SolutionStore};
