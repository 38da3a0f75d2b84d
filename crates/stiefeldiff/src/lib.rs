//! StiefelDiff: directional derivatives of dense matrix factorizations.
//!
//! This umbrella crate re-exports the workspace:
//!
//! - [`stiefeldiff_core`]: scalar trait, errors, tolerances, numerical helpers and the
//!   dense linear-algebra backend
//! - [`stiefeldiff_manifolds`]: the Stiefel manifold, its alpha-metric family and the
//!   Riemannian exponential
//! - [`stiefeldiff_autodiff`]: derivatives of thin QR, the matrix exponential, the SVD and
//!   the Stiefel exponential
//!
//! # Example
//!
//! ```
//! use stiefeldiff::prelude::*;
//!
//! let a0 = DMatrix::<f64>::from_row_slice(3, 2, &[1.0, 0.5, 0.0, 2.0, 1.0, 1.0]);
//! let v = DMatrix::<f64>::from_element(3, 2, 0.1);
//!
//! let d = diff_qr(&a0, &v)?;
//! assert!((d.product_derivative() - &v).norm() < 1e-12);
//! # Ok::<(), DiffError>(())
//! ```

pub use nalgebra;
pub use stiefeldiff_autodiff;
pub use stiefeldiff_core;
pub use stiefeldiff_manifolds;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use stiefeldiff_autodiff::prelude::*;
    pub use stiefeldiff_core::prelude::*;
    pub use stiefeldiff_manifolds::{Stiefel, StiefelMetric};
}
