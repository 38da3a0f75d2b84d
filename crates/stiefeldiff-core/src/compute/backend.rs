//! Dense linear-algebra collaborator.
//!
//! The differentiators never factor matrices themselves. They consume the
//! four primitives of [`FactorizationBackend`]: thin QR, upper-triangular
//! solve, matrix exponential and SVD. [`NalgebraBackend`] provides them with
//! nalgebra's Householder QR, Padé exponential and bidiagonal SVD.

use crate::{
    error::{DiffError, Result},
    numerical::stability::{ensure_finite, is_finite_matrix, is_finite_vector},
    types::{shape_string, DMatrix, DVector, Scalar},
};
use std::cmp::Ordering;
use std::fmt::Debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Thin QR factors of an `n x p` matrix with `n >= p`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThinQr<T: Scalar> {
    /// `n x p` factor with orthonormal columns
    pub q: DMatrix<T>,
    /// `p x p` upper-triangular factor
    pub r: DMatrix<T>,
}

/// Singular value decomposition `A = U diag(S) V^T`.
///
/// Singular values are sorted in descending order. `v` holds either the thin
/// `m x k` factor or, when requested, the full `m x m` orthogonal matrix whose
/// first `k` columns are the right singular vectors.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SvdFactors<T: Scalar> {
    /// Left singular vectors (`n x k`)
    pub u: DMatrix<T>,
    /// Singular values in descending order (length `k`)
    pub singular_values: DVector<T>,
    /// Right singular vectors (`m x k`, or `m x m` when completed)
    pub v: DMatrix<T>,
}

impl<T: Scalar> SvdFactors<T> {
    /// Number of singular values strictly above `tolerance`.
    pub fn rank_above(&self, tolerance: T) -> usize {
        self.singular_values
            .iter()
            .take_while(|s| **s > tolerance)
            .count()
    }

    /// Keep only the singular triplets with values above `tolerance`.
    ///
    /// `u` and the singular values are cut to the retained rank. A square
    /// `v` is kept whole so that the full orthogonal `V` stays available for
    /// the complement part of `dV`; a thin `v` is cut like `u`.
    pub fn truncated(&self, tolerance: T) -> Self {
        let p = self.rank_above(tolerance);
        let v = if self.v.is_square() {
            self.v.clone()
        } else {
            self.v.columns(0, p).into_owned()
        };
        Self {
            u: self.u.columns(0, p).into_owned(),
            singular_values: self.singular_values.rows(0, p).into_owned(),
            v,
        }
    }
}

/// Trait for dense linear-algebra backends.
///
/// Every call is a pure function of its inputs; backends hold no mutable
/// state and may be shared across threads.
pub trait FactorizationBackend<T: Scalar>: Debug + Send + Sync {
    /// Backend name for identification.
    fn name(&self) -> &str;

    /// Thin QR factorization `A = QR` with `Q^T Q = I_p`.
    fn thin_qr(&self, a: &DMatrix<T>) -> Result<ThinQr<T>>;

    /// Solve `R X = rhs` for upper-triangular `R`.
    fn solve_upper_triangular(&self, r: &DMatrix<T>, rhs: &DMatrix<T>) -> Result<DMatrix<T>>;

    /// Dense matrix exponential of a square matrix.
    fn expm(&self, m: &DMatrix<T>) -> Result<DMatrix<T>>;

    /// Singular value decomposition, optionally with the full orthogonal `V`.
    fn svd(&self, a: &DMatrix<T>, full_v: bool) -> Result<SvdFactors<T>>;
}

/// Backend built on nalgebra's dense decompositions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NalgebraBackend;

impl NalgebraBackend {
    /// Create the nalgebra backend.
    pub fn new() -> Self {
        Self
    }
}

impl<T: Scalar> FactorizationBackend<T> for NalgebraBackend {
    fn name(&self) -> &str {
        "nalgebra"
    }

    fn thin_qr(&self, a: &DMatrix<T>) -> Result<ThinQr<T>> {
        let (n, p) = a.shape();
        if n < p || p == 0 {
            return Err(DiffError::dimension_mismatch(
                "n x p matrix with n >= p >= 1",
                shape_string((n, p)),
            ));
        }
        if !is_finite_matrix(a) {
            return Err(DiffError::numerical_error("QR input has non-finite entries"));
        }

        let qr = a.clone().qr();
        Ok(ThinQr {
            q: qr.q(),
            r: qr.r(),
        })
    }

    fn solve_upper_triangular(&self, r: &DMatrix<T>, rhs: &DMatrix<T>) -> Result<DMatrix<T>> {
        if !r.is_square() || r.nrows() != rhs.nrows() {
            return Err(DiffError::dimension_mismatch(
                format!("square {}-row triangular factor", rhs.nrows()),
                shape_string(r.shape()),
            ));
        }

        let solution = r.solve_upper_triangular(rhs).ok_or_else(|| {
            DiffError::singular_factor("upper-triangular factor has a zero diagonal entry")
        })?;
        ensure_finite(solution, "triangular solve")
    }

    fn expm(&self, m: &DMatrix<T>) -> Result<DMatrix<T>> {
        if !m.is_square() {
            return Err(DiffError::dimension_mismatch(
                "square matrix",
                shape_string(m.shape()),
            ));
        }
        if !is_finite_matrix(m) {
            return Err(DiffError::numerical_error(
                "matrix exponential input has non-finite entries",
            ));
        }
        ensure_finite(m.exp(), "matrix exponential")
    }

    fn svd(&self, a: &DMatrix<T>, full_v: bool) -> Result<SvdFactors<T>> {
        let (n, m) = a.shape();
        if n == 0 || m == 0 {
            return Err(DiffError::dimension_mismatch(
                "non-empty matrix",
                shape_string((n, m)),
            ));
        }
        if !is_finite_matrix(a) {
            return Err(DiffError::numerical_error("SVD input has non-finite entries"));
        }

        let svd = a.clone().svd(true, true);
        let u = svd
            .u
            .ok_or_else(|| DiffError::numerical_error("SVD failed to compute U"))?;
        let v_t = svd
            .v_t
            .ok_or_else(|| DiffError::numerical_error("SVD failed to compute V^T"))?;
        let s = svd.singular_values;
        let k = s.len();

        // descending order
        let mut order: Vec<usize> = (0..k).collect();
        order.sort_by(|&i, &j| s[j].partial_cmp(&s[i]).unwrap_or(Ordering::Equal));

        let singular_values = DVector::from_fn(k, |i, _| s[order[i]]);
        if !is_finite_vector(&singular_values) {
            return Err(DiffError::numerical_error(
                "SVD produced non-finite singular values",
            ));
        }
        let u = DMatrix::from_fn(n, k, |r, c| u[(r, order[c])]);
        let v = DMatrix::from_fn(m, k, |r, c| v_t[(order[c], r)]);

        let v = if full_v && k < m {
            log::debug!("completing right singular basis from {}x{} to {}x{}", m, k, m, m);
            complete_orthonormal_basis(&v)
        } else {
            v
        };

        Ok(SvdFactors {
            u,
            singular_values,
            v,
        })
    }
}

/// Extend the orthonormal columns of `v` (`m x k`) to an `m x m` orthogonal matrix.
///
/// The first `k` columns are `v` itself; the remaining ones come from a QR
/// factorization of `[v | I_m]`, whose leading `k` Householder vectors span
/// the range of `v`.
pub fn complete_orthonormal_basis<T: Scalar>(v: &DMatrix<T>) -> DMatrix<T> {
    let (m, k) = v.shape();
    if k >= m {
        return v.clone();
    }

    let mut augmented = DMatrix::zeros(m, k + m);
    augmented.columns_mut(0, k).copy_from(v);
    augmented
        .columns_mut(k, m)
        .copy_from(&DMatrix::identity(m, m));
    let q = augmented.qr().q();

    let mut full = DMatrix::zeros(m, m);
    full.columns_mut(0, k).copy_from(v);
    full.columns_mut(k, m - k).copy_from(&q.columns(k, m - k));
    full
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            4,
            3,
            &[
                2.0, -1.0, 0.5, //
                0.3, 1.7, -0.2, //
                -0.8, 0.4, 1.1, //
                1.2, 0.9, 0.6,
            ],
        )
    }

    #[test]
    fn test_thin_qr_shapes_and_reconstruction() {
        let backend = NalgebraBackend::new();
        let a = sample();
        let qr = FactorizationBackend::<f64>::thin_qr(&backend, &a).unwrap();

        assert_eq!(qr.q.shape(), (4, 3));
        assert_eq!(qr.r.shape(), (3, 3));
        assert_relative_eq!((&qr.q * &qr.r - &a).norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(
            (qr.q.transpose() * &qr.q - DMatrix::identity(3, 3)).norm(),
            0.0,
            epsilon = 1e-12
        );
        assert_eq!(qr.r[(2, 0)], 0.0);
    }

    #[test]
    fn test_thin_qr_rejects_wide_input() {
        let backend = NalgebraBackend::new();
        let wide = DMatrix::<f64>::zeros(2, 3);
        assert!(matches!(
            backend.thin_qr(&wide),
            Err(DiffError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_triangular_solve() {
        let backend = NalgebraBackend::new();
        let r = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 0.0, 4.0]);
        let x = backend
            .solve_upper_triangular(&r, &DMatrix::identity(2, 2))
            .unwrap();
        assert_relative_eq!((&r * &x - DMatrix::identity(2, 2)).norm(), 0.0, epsilon = 1e-15);

        let singular = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 0.0, 0.0]);
        assert!(matches!(
            backend.solve_upper_triangular(&singular, &DMatrix::identity(2, 2)),
            Err(DiffError::SingularFactor { .. })
        ));
    }

    #[test]
    fn test_expm_of_rotation_generator() {
        let backend = NalgebraBackend::new();
        let theta = 0.7_f64;
        let m = DMatrix::from_row_slice(2, 2, &[0.0, -theta, theta, 0.0]);
        let e = backend.expm(&m).unwrap();

        assert_relative_eq!(e[(0, 0)], theta.cos(), epsilon = 1e-14);
        assert_relative_eq!(e[(1, 0)], theta.sin(), epsilon = 1e-14);
        assert!(backend.expm(&DMatrix::<f64>::zeros(2, 3)).is_err());
    }

    #[test]
    fn test_svd_sorted_and_reconstructs() {
        let backend = NalgebraBackend::new();
        let a = sample();
        let svd = backend.svd(&a, false).unwrap();

        for i in 1..svd.singular_values.len() {
            assert!(svd.singular_values[i - 1] >= svd.singular_values[i]);
        }
        let rebuilt = &svd.u * DMatrix::from_diagonal(&svd.singular_values) * svd.v.transpose();
        assert_relative_eq!((rebuilt - &a).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_svd_full_v_for_wide_matrix() {
        let backend = NalgebraBackend::new();
        let a = sample().transpose();
        let svd = backend.svd(&a, true).unwrap();

        assert_eq!(svd.u.shape(), (3, 3));
        assert_eq!(svd.v.shape(), (4, 4));
        assert_relative_eq!(
            (svd.v.transpose() * &svd.v - DMatrix::identity(4, 4)).norm(),
            0.0,
            epsilon = 1e-12
        );
        let v_thin = svd.v.columns(0, 3).into_owned();
        let rebuilt = &svd.u * DMatrix::from_diagonal(&svd.singular_values) * v_thin.transpose();
        assert_relative_eq!((rebuilt - &a).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_truncation_keeps_full_v() {
        let backend = NalgebraBackend::new();
        let y1 = DMatrix::from_row_slice(4, 1, &[1.0, 2.0, 3.0, 4.0]);
        let y2 = DMatrix::from_row_slice(1, 3, &[1.0, -1.0, 0.5]);
        let svd = backend.svd(&(&y1 * &y2), true).unwrap();

        assert_eq!(svd.rank_above(1e-10), 1);
        let t = svd.truncated(1e-10);
        assert_eq!(t.u.shape(), (4, 1));
        assert_eq!(t.singular_values.len(), 1);
        assert_eq!(t.v.shape(), (3, 3));
    }

    #[test]
    fn test_truncation_cuts_thin_v() {
        let backend = NalgebraBackend::new();
        let y1 = DMatrix::from_row_slice(
            6,
            2,
            &[1.0, 0.0, 2.0, 1.0, 0.0, 3.0, 1.0, 1.0, -1.0, 2.0, 0.5, 0.0],
        );
        let y2 = DMatrix::from_row_slice(
            2,
            9,
            &[
                1.0, -1.0, 0.5, 2.0, 0.0, 1.0, -0.5, 3.0, 1.0, //
                0.0, 2.0, 1.0, -1.0, 1.5, 0.5, 1.0, 0.0, -2.0,
            ],
        );
        let svd = backend.svd(&(&y1 * &y2), false).unwrap();
        assert_eq!(svd.v.shape(), (9, 6));

        let t = svd.truncated(1e-8);
        assert_eq!(t.u.shape(), (6, 2));
        assert_eq!(t.singular_values.len(), 2);
        assert_eq!(t.v.shape(), (9, 2));
    }
}
