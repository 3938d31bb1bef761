//! # lib-types
//!
//! Core type definitions shared across the polylap workspace.
//!
//! This crate provides foundational types used by the transform core and the CLI:
//! - Physical units (sample interval, frequency)
//! - Signal representation for uniformly sampled real data
//! - Coefficient frames produced by lapped analysis
//! - Boundary policy and frame geometry

pub mod units;
pub mod signal;
pub mod coefficients;

pub use units::*;
pub use signal::*;
pub use coefficients::*;
