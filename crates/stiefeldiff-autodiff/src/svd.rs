//! Directional derivative of the singular value decomposition.
//!
//! For `Y = U diag(S) V^T` with `p` simple positive singular values and a
//! perturbation direction `dY`, the first-order changes are
//! ```text
//! dS_k  = u_k^T dY v_k
//! C     = U^T dY V_p
//! Alpha[j,k] = (S_j C[j,k] + S_k C[k,j]) / ((S_k + S_j)(S_k - S_j)),  j < k
//! dV    = V_p Alpha + V_c Alpha_c,   Alpha_c[j,k] = (U^T dY V_c)[k,j] / S_k
//! X     = (diag(S) Alpha - diag(dS)) diag(S)^{-1}
//! dU    = dY V_p diag(S)^{-1} + U X
//! ```
//! `V_c` spans the orthogonal complement of `V_p` and is only available when
//! the caller supplies the full `m x m` orthogonal `V`. Without it the
//! complement term of `dV` is omitted and the result is flagged as partial.

use log::{debug, warn};
use num_traits::Float;
use stiefeldiff_core::{
    compute::{FactorizationBackend, NalgebraBackend, SvdFactors},
    config::DiffConfig,
    error::{DiffError, Result},
    numerical::{min_spectral_gap, structure::skew},
    types::{shape_string, DMatrix, DVector, Scalar},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Whether `dV` includes the orthogonal-complement contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DvCompleteness {
    /// `dV` is exact: `V` was square, or the full orthogonal `V` was supplied.
    Complete,
    /// Only `V_p Alpha` was computed; `V` was thin with `m > p`.
    InBlockOnly,
}

/// First-order changes of the singular triplets along `dY`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SvdDerivative<T: Scalar> {
    /// `n x p` part of `dU` orthogonal to `U`
    pub du_bot: DMatrix<T>,
    /// `p x p` skew-symmetric `U^T dU`
    pub a: DMatrix<T>,
    /// `n x p` derivative of `U`
    pub du: DMatrix<T>,
    /// `p x p` skew-symmetric in-block coefficient `V_p^T dV`
    pub alpha: DMatrix<T>,
    /// Derivatives of the singular values
    pub ds: DVector<T>,
    /// `m x p` derivative of the leading right singular vectors
    pub dv: DMatrix<T>,
    /// Whether `dv` carries the complement part
    pub dv_completeness: DvCompleteness,
}

impl<T: Scalar> SvdDerivative<T> {
    /// `true` when `dv` lacks the orthogonal-complement contribution.
    pub fn is_partial(&self) -> bool {
        self.dv_completeness == DvCompleteness::InBlockOnly
    }

    /// First-order change of the product,
    /// `dU diag(S) V_p^T + U diag(dS) V_p^T + U diag(S) dV^T`.
    ///
    /// Only the first `p` columns of `v` are used.
    pub fn reconstruct(&self, u: &DMatrix<T>, s: &DVector<T>, v: &DMatrix<T>) -> DMatrix<T> {
        let p = s.len();
        let v_p = v.columns(0, p);
        let s_diag = DMatrix::from_diagonal(s);
        &self.du * &s_diag * v_p.transpose()
            + u * DMatrix::from_diagonal(&self.ds) * v_p.transpose()
            + u * &s_diag * self.dv.transpose()
    }
}

/// Differentiates the SVD along a direction.
#[derive(Debug, Clone)]
pub struct SvdDifferentiator<T: Scalar, B = NalgebraBackend> {
    backend: B,
    config: DiffConfig<T>,
}

impl<T: Scalar> SvdDifferentiator<T, NalgebraBackend> {
    /// Differentiator on the nalgebra backend with default tolerances.
    pub fn new() -> Self {
        Self::with_backend(NalgebraBackend)
    }
}

impl<T: Scalar> Default for SvdDifferentiator<T, NalgebraBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar, B: FactorizationBackend<T>> SvdDifferentiator<T, B> {
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

    /// Derivative of the SVD `(u, s, v)` along `dy`.
    ///
    /// `v` is either the thin `m x p` factor or the full `m x m` orthogonal
    /// matrix whose first `p` columns are the right singular vectors.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` on inconsistent shapes
    /// - `RankDeficient` if some `s_k <= rank_tolerance`
    /// - `NearDegenerateSpectrum` if two singular values are closer than
    ///   `spectral_gap_tolerance`
    pub fn differentiate(
        &self,
        dy: &DMatrix<T>,
        u: &DMatrix<T>,
        s: &DVector<T>,
        v: &DMatrix<T>,
    ) -> Result<SvdDerivative<T>> {
        let (n, m) = dy.shape();
        let p = s.len();
        self.check_shapes((n, m), u, p, v)?;
        self.check_spectrum(s)?;

        let full = v.ncols() == m && m > p;
        debug!(
            "differentiating SVD of a {}x{} matrix with {} singular triplets ({} V)",
            n,
            m,
            p,
            if full || m == p { "complete" } else { "thin" }
        );

        let v_p = v.columns(0, p).into_owned();
        let s_inv = s.map(|x| T::one() / x);
        let ut = u.transpose();

        let dyv = dy * &v_p;
        let c = &ut * &dyv;
        let ds = c.diagonal();

        let dyv_sinv = &dyv * DMatrix::from_diagonal(&s_inv);
        let ut_dyv_sinv = &ut * &dyv_sinv;
        let du_bot = &dyv_sinv - u * &ut_dyv_sinv;

        let mut alpha = DMatrix::zeros(p, p);
        for k in 0..p {
            for j in 0..k {
                let value =
                    (s[j] * c[(j, k)] + s[k] * c[(k, j)]) / ((s[k] + s[j]) * (s[k] - s[j]));
                alpha[(j, k)] = value;
                alpha[(k, j)] = -value;
            }
        }

        let mut dv = &v_p * &alpha;
        let dv_completeness = if full {
            let v_c = v.columns(p, m - p);
            let c_comp = (&ut * dy) * v_c;
            let alpha_c = DMatrix::from_fn(m - p, p, |j, k| c_comp[(k, j)] * s_inv[k]);
            dv += v_c * alpha_c;
            DvCompleteness::Complete
        } else if m > p {
            warn!(
                "thin V with m = {} > p = {}: dV omits the orthogonal-complement contribution",
                m, p
            );
            DvCompleteness::InBlockOnly
        } else {
            DvCompleteness::Complete
        };

        let x = DMatrix::from_fn(p, p, |i, j| {
            let shift = if i == j { ds[i] } else { T::zero() };
            (s[i] * alpha[(i, j)] - shift) * s_inv[j]
        });
        let a = skew(&(ut_dyv_sinv + &x));
        let du = dyv_sinv + u * &x;

        Ok(SvdDerivative {
            du_bot,
            a,
            du,
            alpha,
            ds,
            dv,
            dv_completeness,
        })
    }

    /// Factor `y`, drop singular values `<= tolerance` and differentiate along `dy`.
    ///
    /// The factorization is computed with the full orthogonal `V`, so `dV` is
    /// always complete.
    pub fn differentiate_truncated(
        &self,
        y: &DMatrix<T>,
        dy: &DMatrix<T>,
        tolerance: T,
    ) -> Result<(SvdFactors<T>, SvdDerivative<T>)> {
        if dy.shape() != y.shape() {
            return Err(DiffError::dimension_mismatch(
                format!("direction of shape {}", shape_string(y.shape())),
                shape_string(dy.shape()),
            ));
        }

        let factors = self.backend.svd(y, true)?;
        let truncated = factors.truncated(tolerance);
        if truncated.singular_values.is_empty() {
            return Err(DiffError::rank_deficient(
                0,
                Scalar::to_f64(factors.singular_values[0]),
            ));
        }
        debug!(
            "truncated SVD keeps {} of {} singular values",
            truncated.singular_values.len(),
            factors.singular_values.len()
        );

        let derivative =
            self.differentiate(dy, &truncated.u, &truncated.singular_values, &truncated.v)?;
        Ok((truncated, derivative))
    }

    fn check_shapes(
        &self,
        dy_shape: (usize, usize),
        u: &DMatrix<T>,
        p: usize,
        v: &DMatrix<T>,
    ) -> Result<()> {
        let (n, m) = dy_shape;
        if p == 0 || p > n.min(m) {
            return Err(DiffError::dimension_mismatch(
                format!("between 1 and {} singular values", n.min(m)),
                p.to_string(),
            ));
        }
        if u.shape() != (n, p) {
            return Err(DiffError::dimension_mismatch(
                format!("U of shape {}", shape_string((n, p))),
                shape_string(u.shape()),
            ));
        }
        if v.nrows() != m || (v.ncols() != p && v.ncols() != m) {
            return Err(DiffError::dimension_mismatch(
                format!(
                    "V of shape {} or {}",
                    shape_string((m, p)),
                    shape_string((m, m))
                ),
                shape_string(v.shape()),
            ));
        }
        Ok(())
    }

    fn check_spectrum(&self, s: &DVector<T>) -> Result<()> {
        for (k, value) in s.iter().enumerate() {
            if !Float::is_finite(*value) {
                return Err(DiffError::numerical_error(format!(
                    "singular value {} is not finite",
                    k
                )));
            }
            if !(*value > self.config.rank_tolerance) {
                return Err(DiffError::rank_deficient(k, Scalar::to_f64(*value)));
            }
        }

        if let Some((first, second, gap)) = min_spectral_gap(s) {
            if gap < self.config.spectral_gap_tolerance {
                return Err(DiffError::near_degenerate_spectrum(
                    first,
                    second,
                    Scalar::to_f64(gap),
                    Scalar::to_f64(self.config.spectral_gap_tolerance),
                ));
            }
        }
        Ok(())
    }
}

/// Derivative of the SVD `(u, s, v)` along `dy` with default tolerances.
pub fn diff_svd<T: Scalar>(
    dy: &DMatrix<T>,
    u: &DMatrix<T>,
    s: &DVector<T>,
    v: &DMatrix<T>,
) -> Result<SvdDerivative<T>> {
    SvdDifferentiator::new().differentiate(dy, u, s, v)
}
