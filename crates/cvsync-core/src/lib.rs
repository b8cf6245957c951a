//! Core types for cvsync.
//!
//! This crate holds the pieces of the CVS integration that perform no I/O:
//! - Revision selectors (`Head`, `Tag`, `Branch`) and their resolved form
//! - Modules, repositories and exclusion filters
//! - Parameter and environment expansion for deferred selector names
//! - Per-module checkout outcomes and the `CVS_BRANCH` projection
//! - Error codes shared by every cvsync crate

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
mod location;
mod model;
mod outcome;
mod params;
mod projector;

pub use error::{Error, ErrorCode, Result};
pub use location::{LocationKind, ResolvedLocation, RevisionSelector};
pub use model::{
    ExcludedRegion, ExclusionSet, Module, ModuleKey, Repository, UNBOUNDED_POLLING_DEPTH,
};
pub use outcome::CheckoutOutcome;
pub use params::{ParameterContext, ParameterResolver};
pub use projector::{BuildEnvironmentDelta, CVS_BRANCH, EnvironmentProjector};
