//! Library error types.
//!
//! Data-quality problems in the turnstile counters are never errors; rows
//! that fail validation are dropped by the reconciler. These types cover
//! mistakes in how a caller configures a stage.

use thiserror::Error;

/// Errors raised when an aggregation grouping is misconfigured.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GrainError {
    #[error("unrecognized grain: '{0}'")]
    Unrecognized(String),

    #[error("grouping must refine the timestamp or the turnstile (got neither)")]
    NoRefinement,

    #[error("conflicting grains: '{0}' and '{1}'")]
    Conflicting(String, String),
}
