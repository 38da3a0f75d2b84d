//! Directional derivative of the thin QR factorization.
//!
//! For `A(t) = A0 + t V` with `A(t) = Q(t) R(t)`, `Q^T Q = I` and `R` upper
//! triangular, the derivative at `t = 0` is
//! ```text
//! Rinv = R^{-1}                      (upper triangular)
//! W    = Q^T V
//! L    = strict_lower(W Rinv),  D = L - L^T
//! dR   = upper(W - D R)
//! dQ   = (V - Q W) Rinv + Q D
//! ```
//! `D = Q^T dQ` is skew-symmetric, which keeps `Q(t)` orthonormal to first order.

use log::debug;
use num_traits::Float;
use stiefeldiff_core::{
    compute::{FactorizationBackend, NalgebraBackend, ThinQr},
    config::DiffConfig,
    error::{DiffError, Result},
    numerical::structure::{strict_lower, upper_triangle},
    types::{shape_string, DMatrix, Scalar},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// QR factors at `A0` together with their derivatives along `V`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QrDerivative<T: Scalar> {
    /// `n x p` orthonormal factor
    pub q: DMatrix<T>,
    /// `n x p` derivative of `Q`
    pub dq: DMatrix<T>,
    /// `p x p` upper-triangular factor
    pub r: DMatrix<T>,
    /// `p x p` upper-triangular derivative of `R`
    pub dr: DMatrix<T>,
}

impl<T: Scalar> QrDerivative<T> {
    /// First-order change of the product, `dQ R + Q dR`.
    ///
    /// Equals the direction `V` up to rounding.
    pub fn product_derivative(&self) -> DMatrix<T> {
        &self.dq * &self.r + &self.q * &self.dr
    }

    /// The skew-symmetric matrix `Q^T dQ`.
    pub fn frame_rotation(&self) -> DMatrix<T> {
        self.q.transpose() * &self.dq
    }
}

/// Differentiates the thin QR factorization of a tall matrix.
#[derive(Debug, Clone)]
pub struct QrDifferentiator<T: Scalar, B = NalgebraBackend> {
    backend: B,
    config: DiffConfig<T>,
}

impl<T: Scalar> QrDifferentiator<T, NalgebraBackend> {
    /// Differentiator on the nalgebra backend with default tolerances.
    pub fn new() -> Self {
        Self::with_backend(NalgebraBackend)
    }
}

impl<T: Scalar> Default for QrDifferentiator<T, NalgebraBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar, B: FactorizationBackend<T>> QrDifferentiator<T, B> {
    /// Differentiator on a custom backend with default tolerances.
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            config: DiffConfig::default(),
        }
    }

    /// Replace the tolerance configuration.
    pub fn with_config(mut self, config: DiffConfig<T>) -> Self {
        self.config = config;
        self
    }

    /// The tolerance configuration.
    pub fn config(&self) -> &DiffConfig<T> {
        &self.config
    }

    /// The dense linear-algebra backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Derivative of `A -> (Q, R)` at `a0` in direction `v`.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` if `a0` and `v` differ in shape or `a0` is wider than tall
    /// - `SingularFactor` if a diagonal entry of `R` is negligible
    pub fn differentiate(&self, a0: &DMatrix<T>, v: &DMatrix<T>) -> Result<QrDerivative<T>> {
        self.differentiate_with_reference(a0, v, T::zero())
    }

    /// Like [`differentiate`](Self::differentiate), but `|R_ii|` is also measured
    /// against `reference`.
    ///
    /// Callers that build `a0` from a larger quantity pass that quantity's
    /// norm, so that an `a0` made only of rounding noise is rejected instead
    /// of being inverted.
    ///
    /// # Errors
    ///
    /// As [`differentiate`](Self::differentiate).
    pub fn differentiate_with_reference(
        &self,
        a0: &DMatrix<T>,
        v: &DMatrix<T>,
        reference: T,
    ) -> Result<QrDerivative<T>> {
        let (n, p) = a0.shape();
        if n < p || p == 0 {
            return Err(DiffError::dimension_mismatch(
                "n x p matrix with n >= p >= 1",
                shape_string((n, p)),
            ));
        }
        if v.shape() != (n, p) {
            return Err(DiffError::dimension_mismatch(
                format!("direction of shape {}", shape_string((n, p))),
                shape_string(v.shape()),
            ));
        }
        debug!("differentiating thin QR of a {}x{} matrix", n, p);

        let ThinQr { q, r } = self.backend.thin_qr(a0)?;
        self.check_invertible(&r, reference)?;

        let rinv = upper_triangle(
            &self
                .backend
                .solve_upper_triangular(&r, &DMatrix::identity(p, p))?,
        );

        let w = q.transpose() * v;
        let l = strict_lower(&(&w * &rinv));
        let d = &l - l.transpose();

        let dr = upper_triangle(&(&w - &d * &r));
        let dq = (v - &q * &w) * &rinv + &q * &d;

        Ok(QrDerivative { q, dq, r, dr })
    }

    /// Reject `R` when some `|R_ii|` is negligible against the largest one
    /// or against `reference`.
    fn check_invertible(&self, r: &DMatrix<T>, reference: T) -> Result<()> {
        let diagonal = r.diagonal();
        let scale = diagonal
            .iter()
            .fold(Float::abs(reference), |acc, x| Float::max(acc, Float::abs(*x)));
        if !(scale > T::zero()) {
            return Err(DiffError::singular_factor("R vanishes, the input has rank 0"));
        }

        let threshold = self.config.singular_tolerance * scale;
        for (i, value) in diagonal.iter().enumerate() {
            if Float::abs(*value) <= threshold {
                return Err(DiffError::singular_factor(format!(
                    "|R[{i},{i}]| = {:e} is below {:e}, the input columns are linearly dependent or negligible",
                    Scalar::to_f64(Float::abs(*value)),
                    Scalar::to_f64(threshold),
                )));
            }
        }
        Ok(())
    }
}

/// Derivative of the thin QR factorization of `a0` along `v` with default settings.
pub fn diff_qr<T: Scalar>(a0: &DMatrix<T>, v: &DMatrix<T>) -> Result<QrDerivative<T>> {
    QrDifferentiator::new().differentiate(a0, v)
}
