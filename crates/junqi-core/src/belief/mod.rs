//! Probabilistic identity tracking for pieces the observer cannot see.
//!
//! This module is composed of:
//! - `distribution`: per-cell rows, the remaining-count budget and the IPF normalizer.
//! - `engine`: initialization from the zone prior and the move-driven update protocol.
//! - `sampler`: quota-respecting draws of complete hidden-state hypotheses.
//! - `telemetry` and `snapshot`: read-only views for metrics and debugging.

mod distribution;
mod engine;
mod sampler;
pub mod snapshot;
pub mod telemetry;

pub use distribution::{Budget, DEFAULT_IPF_ITERATIONS, Distribution, normalize_and_constrain};
pub use engine::{
    BeliefConfig, BeliefEngine, HqRevealTarget, UpdateBranch, requires_engineer, zone_allows,
};
pub use sampler::{BeliefSampler, SampledState, SamplingError};
