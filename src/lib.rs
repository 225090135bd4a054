//! Trailer load planning.
//!
//! [`packer`] computes a load plan for a list of cargo units, [`validator`]
//! classifies any plan against loading rules. Both build on the shared
//! [`geometry`] predicates over the [`model`] types.

pub mod api;
pub mod config;
pub mod geometry;
pub mod hazard;
pub mod model;
pub mod packer;
pub mod types;
pub mod validator;
