//! linkcost Core - link-junction volume-delay functions
//!
//! This crate provides the pieces a traffic assignment host needs to price links:
//! - Static field tables for the baseline and extended (reliability) variants
//! - Preprocessing that fills defaults, validates bounds and derives the overflow guard
//! - Cost evaluation (segment BPR term, signalized junction delay, LOS reliability)
//! - Closed-form derivative and integral with respect to flow
//! - A host facade that speaks numeric status codes and sentinel floats

pub mod fields;
pub mod status;
pub mod table;
pub mod state;
pub mod preprocess;
pub mod cost;
pub mod calculus;
pub mod host;

pub use fields::*;
pub use status::*;
pub use table::*;
pub use state::*;
pub use preprocess::*;
pub use cost::*;
pub use calculus::*;
pub use host::*;

/// Largest single-precision float, the host's numeric ceiling
pub const MAX_FLOAT: f64 = f32::MAX as f64;

/// Host encoding of a missing value
pub const MISSING_SENTINEL: f64 = -MAX_FLOAT;

/// Cost reported for disabled links
pub const INFINITE_COST: f64 = MAX_FLOAT;

/// Fixed width of host parameter labels
pub const LABEL_SIZE: usize = 64;

/// Share of junction traffic assumed to be through movements (baseline variant)
pub const THROUGH_TRAFFIC_SHARE: f64 = 0.85;

/// v/c ratio above which reliability stops growing
pub const RELIABILITY_VC_CAP: f64 = 1.5;
