//! Core traits and types for differentiating dense matrix factorizations.
//!
//! This crate provides the foundation shared by the differentiators: the
//! scalar abstraction, the error taxonomy, numerical tolerances, structural
//! matrix helpers and the dense linear-algebra collaborator that supplies
//! the factorizations themselves.
//!
//! # Modules
//!
//! - [`compute`]: The [`FactorizationBackend`](compute::FactorizationBackend) seam and its nalgebra implementation
//! - [`config`]: Tolerances deciding singularity, degeneracy and metric branches
//! - [`error`]: Error types for factorization derivatives
//! - [`numerical`]: Skew parts, triangle masks, relative errors and finite-difference validation
//! - [`types`]: Scalar trait, type aliases and numerical constants

pub mod compute;
pub mod config;
pub mod error;
pub mod numerical;
pub mod types;
pub mod utils;

// Re-export commonly used items at the crate root
pub use error::{DiffError, Result};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use stiefeldiff_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::compute::{FactorizationBackend, NalgebraBackend, SvdFactors, ThinQr};
    pub use crate::config::{DiffConfig, DiffConfigBuilder};
    pub use crate::error::{DiffError, Result};
    pub use crate::numerical::{
        relative_error, skew, skew_defect, ConvergenceResult, NumericalValidationConfig,
        NumericalValidator,
    };
    pub use crate::types::{constants, DMatrix, DVector, Scalar};
}
