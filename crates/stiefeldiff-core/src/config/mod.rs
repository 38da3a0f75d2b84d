//! Configuration for the differentiators.

pub mod tolerances;

// Re-export key items
pub use tolerances::{DiffConfig, DiffConfigBuilder};
