//! Turnstile counter wrangling.
//!
//! Raw readings flow through the [`resolver`] (surrogate ids), are sorted per
//! turnstile, and then go through the [`reconcile`] stage (net counts,
//! anomaly filtering). The cleaned table feeds both [`aggregate`] and
//! [`metrics`]; [`pipeline`] drives the whole chain for a set of weeks.
//! [`complex`] optionally tags rows with their station complex.

pub mod aggregate;
pub mod complex;
pub mod metrics;
pub mod pipeline;
pub mod reconcile;
pub mod resolver;
pub mod types;
pub mod utility;
