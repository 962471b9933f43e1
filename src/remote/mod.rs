//! Remote resource engine module.
//!
//! This module provides the engine interface used by the reconciler and its
//! implementations:
//! - A REST client for the real engine
//! - An in-memory engine for dry runs and tests

mod engine;
mod http;
mod memory;

pub use engine::RemoteEngine;
pub use http::HttpEngineClient;
pub use memory::InMemoryEngine;

#[cfg(test)]
pub use engine::MockRemoteEngine;
