//! Stiefel manifold geometry for factorization derivatives.
//!
//! This crate provides the Stiefel manifold St(n,p) of matrices with
//! orthonormal columns, the one-parameter family of Riemannian metrics on it,
//! and the Riemannian exponential under those metrics.

pub mod metric;
pub mod stiefel;

// Re-export main types for convenience
pub use metric::{AlphaParameter, StiefelMetric};
pub use stiefel::{exponential_block, split_tangent, Stiefel, TangentSplit};
