//! Numerical utilities, structural helpers and derivative validation.

pub mod stability;
pub mod structure;
pub mod validation;

// Re-export numerical utilities
pub use stability::*;
pub use structure::*;
pub use validation::*;
