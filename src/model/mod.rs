//! Resource model for solution documents.
//!
//! This module defines every resource the reconciler manages:
//! - Typed resources (assets, secrets, files, components, routines, functions, alerts)
//! - Data addresses used by routine inputs and outputs
//! - The [`Solution`] document shared by plans and states

mod address;
mod kind;
mod resources;
mod solution;

pub use address::{
    is_identifier, parse_symbolic, DataAddress, DataAddressValue, ReferenceScope, SymbolicRef,
};
pub use kind::{Resource, ResourceKind};
pub use resources::{
    Alert, Asset, Attribute, Component, File, Function, InputDataAddress, Parameter,
    RoutineObject, Secret,
};
pub use solution::{PlanSolution, Solution, StateSolution};
