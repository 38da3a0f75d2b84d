//! Directional derivatives of dense matrix factorizations.
//!
//! This crate differentiates three classical factorizations along a linear
//! curve of inputs and composes two of them into the derivative of the
//! Riemannian exponential on the Stiefel manifold.
//!
//! # Features
//!
//! - **Thin QR**: [`QrDifferentiator`] returns `dQ`, `dR` for `A0 + tV`
//! - **Matrix exponential**: [`ExpmDifferentiator`] via the block-triangular identity
//! - **Stiefel exponential**: [`StiefelExpDifferentiator`] under the alpha-metric family
//! - **SVD**: [`SvdDifferentiator`] for simple, nonzero singular values
//!
//! Every differentiator is a pure function of its inputs and may be shared
//! across threads. With the `parallel` feature (on by default) the Stiefel
//! differentiator evaluates batches of directions on the rayon pool.

pub mod expm;
pub mod qr;
pub mod stiefel_exp;
pub mod svd;

// Re-export key types
pub use expm::{diff_expm, ExpmDerivative, ExpmDifferentiator};
pub use qr::{diff_qr, QrDerivative, QrDifferentiator};
pub use stiefel_exp::{diff_stiefel_exp, StiefelExpDerivative, StiefelExpDifferentiator};
pub use svd::{diff_svd, DvCompleteness, SvdDerivative, SvdDifferentiator};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::expm::{diff_expm, ExpmDerivative, ExpmDifferentiator};
    pub use crate::qr::{diff_qr, QrDerivative, QrDifferentiator};
    pub use crate::stiefel_exp::{diff_stiefel_exp, StiefelExpDerivative, StiefelExpDifferentiator};
    pub use crate::svd::{diff_svd, DvCompleteness, SvdDerivative, SvdDifferentiator};
}
