//! Shared test fixtures and utilities for Strider crates.
//!
//! Provides flat-ground stance sequences with analytic support regions and
//! deterministic RNG setup.

pub mod fixtures;
pub mod rng;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use fixtures::{
    COM_HEIGHT, DS_DURATION, FOOT_SHAPE, FRICTION, SS_DURATION, STEP_WIDTH, flat_foot, flat_walk,
};
pub use rng::deterministic_offsets;
