//! State management module for the solution reconciler.
//!
//! This module persists solution documents between runs. The state is
//! rewritten in full after every successful mutation, so a failed run leaves
//! it matching whatever the engine actually received.

mod loader;
mod local;
mod s3;
mod store;

pub use loader::{open_store, SolutionLoader};
pub use local::LocalSolutionStore;
pub use s3::S3SolutionStore;
pub use store::{decode, encode, SolutionStore};
