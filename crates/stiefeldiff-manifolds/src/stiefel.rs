//! Stiefel manifold St(n,p) = {X in R^{n x p} : X^T X = I_p}
//!
//! Besides membership checks and tangent projection, this module provides the
//! Riemannian exponential under the alpha-metric family. The exponential is
//! assembled from a thin QR factorization of the normal part of the tangent
//! vector and one (canonical metric) or two (alpha-metrics) dense matrix
//! exponentials:
//! ```text
//! A = skew(U^T D),  X = D - U A = Q R
//! M = [[A / (alpha + 1), -R^T], [R, 0]]
//! Exp_U(D) = (U E11 + Q E21) exp(alpha / (alpha + 1) A),   E = exp(M)
//! ```

use crate::metric::StiefelMetric;
use log::debug;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use stiefeldiff_core::{
    compute::{FactorizationBackend, NalgebraBackend},
    error::{DiffError, Result},
    numerical::structure::{block, block_2x2, skew, skew_defect, sym},
    types::{shape_string, DMatrix, Scalar},
};
use num_traits::Float;

/// Split of an ambient `n x p` matrix `D` at `U` into `U A + X`.
///
/// `A = skew(U^T D)` is the in-frame part; `X = D - U A` is orthogonal to
/// `U` whenever `D` is tangent. A non-skew `U^T D` is silently symmetrized
/// away from `A` instead of being rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct TangentSplit<T: Scalar> {
    /// Skew-symmetric `p x p` in-frame coefficient
    pub a: DMatrix<T>,
    /// `n x p` normal component
    pub x: DMatrix<T>,
}

/// Compute `A = skew(U^T D)` and `X = D - U A`.
pub fn split_tangent<T: Scalar>(u: &DMatrix<T>, d: &DMatrix<T>) -> TangentSplit<T> {
    let a = skew(&(u.transpose() * d));
    let x = d - u * &a;
    TangentSplit { a, x }
}

/// The `2p x 2p` skew block `[[v A, -R^T], [R, 0]]` of the Stiefel exponential.
///
/// The same layout with `(dA, dR)` in place of `(A, R)` gives its directional
/// derivative.
pub fn exponential_block<T: Scalar>(a: &DMatrix<T>, r: &DMatrix<T>, v_factor: T) -> DMatrix<T> {
    let p = a.nrows();
    block_2x2(
        &(a * v_factor),
        &(-r.transpose()),
        r,
        &DMatrix::zeros(p, p),
    )
}

/// The Stiefel manifold St(n,p) of n x p orthonormal matrices.
///
/// The tangent space at X consists of all n x p matrices V such that
/// X^T V + V^T X = 0.
///
/// # Mathematical Properties
///
/// - **Dimension**: np - p(p+1)/2
/// - **Tangent space**: T_X St(n,p) = {V in R^{n x p} : X^T V + V^T X = 0}
/// - **Riemannian metrics**: the alpha-family, see [`StiefelMetric`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stiefel {
    /// Number of rows (n)
    n: usize,
    /// Number of columns (p)
    p: usize,
}

impl Stiefel {
    /// Creates a new Stiefel manifold St(n,p).
    ///
    /// # Errors
    /// Returns an error if p > n or either dimension is 0
    pub fn new(n: usize, p: usize) -> Result<Self> {
        if n == 0 || p == 0 {
            return Err(DiffError::invalid_point(
                "Stiefel manifold requires n > 0 and p > 0",
            ));
        }
        if p > n {
            return Err(DiffError::invalid_point(
                "Stiefel manifold requires p <= n",
            ));
        }
        Ok(Self { n, p })
    }

    /// Returns the number of rows (n)
    pub fn n(&self) -> usize {
        self.n
    }

    /// Returns the number of columns (p)
    pub fn p(&self) -> usize {
        self.p
    }

    /// Intrinsic dimension np - p(p+1)/2
    pub fn dimension(&self) -> usize {
        self.n * self.p - self.p * (self.p + 1) / 2
    }

    fn check_shape<T: Scalar>(&self, matrix: &DMatrix<T>, what: &str) -> Result<()> {
        if matrix.shape() != (self.n, self.p) {
            return Err(DiffError::dimension_mismatch(
                format!("{} of shape {}", what, shape_string((self.n, self.p))),
                shape_string(matrix.shape()),
            ));
        }
        Ok(())
    }

    /// Checks the orthonormality constraint X^T X = I within `tolerance`.
    pub fn is_point_on_manifold<T: Scalar>(&self, point: &DMatrix<T>, tolerance: T) -> bool {
        if point.shape() != (self.n, self.p) {
            return false;
        }
        let gram = point.transpose() * point;
        abs_max(&(gram - DMatrix::<T>::identity(self.p, self.p))) <= tolerance
    }

    /// Checks X^T V + V^T X = 0 within `tolerance`.
    pub fn is_vector_in_tangent_space<T: Scalar>(
        &self,
        point: &DMatrix<T>,
        vector: &DMatrix<T>,
        tolerance: T,
    ) -> bool {
        if point.shape() != (self.n, self.p) || vector.shape() != (self.n, self.p) {
            return false;
        }
        let xtv = point.transpose() * vector;
        abs_max(&(&xtv + xtv.transpose())) <= tolerance
    }

    /// Error-returning variant of [`is_point_on_manifold`](Self::is_point_on_manifold).
    pub fn check_point<T: Scalar>(&self, point: &DMatrix<T>, tolerance: T) -> Result<()> {
        self.check_shape(point, "point")?;
        if !self.is_point_on_manifold(point, tolerance) {
            let defect = (point.transpose() * point - DMatrix::<T>::identity(self.p, self.p)).norm();
            return Err(DiffError::invalid_point(format!(
                "||X^T X - I|| = {:e} exceeds tolerance",
                Scalar::to_f64(defect)
            )));
        }
        Ok(())
    }

    /// Error-returning variant of [`is_vector_in_tangent_space`](Self::is_vector_in_tangent_space).
    pub fn check_tangent<T: Scalar>(
        &self,
        point: &DMatrix<T>,
        vector: &DMatrix<T>,
        tolerance: T,
    ) -> Result<()> {
        self.check_shape(point, "point")?;
        self.check_shape(vector, "tangent")?;
        if !self.is_vector_in_tangent_space(point, vector, tolerance) {
            let defect = skew_defect(&(point.transpose() * vector));
            return Err(DiffError::invalid_tangent(format!(
                "||X^T V + V^T X|| = {:e} exceeds tolerance",
                Scalar::to_f64(defect)
            )));
        }
        Ok(())
    }

    /// Project to tangent space: V - X sym(X^T V)
    pub fn project_tangent<T: Scalar>(
        &self,
        point: &DMatrix<T>,
        vector: &DMatrix<T>,
    ) -> Result<DMatrix<T>> {
        self.check_shape(point, "point")?;
        self.check_shape(vector, "vector")?;
        let xtv = point.transpose() * vector;
        Ok(vector - point * sym(&xtv))
    }

    /// Random point: the Q factor of a Gaussian matrix.
    pub fn random_point<T: Scalar, R: Rng>(&self, rng: &mut R) -> DMatrix<T> {
        let matrix = Self::gaussian::<T, R>(rng, self.n, self.p);
        let q = matrix.qr().q();
        q.columns(0, self.p).into_owned()
    }

    /// Random tangent vector at `point`.
    pub fn random_tangent<T: Scalar, R: Rng>(
        &self,
        point: &DMatrix<T>,
        rng: &mut R,
    ) -> Result<DMatrix<T>> {
        let random_matrix = Self::gaussian::<T, R>(rng, self.n, self.p);
        self.project_tangent(point, &random_matrix)
    }

    fn gaussian<T: Scalar, R: Rng>(rng: &mut R, nrows: usize, ncols: usize) -> DMatrix<T> {
        DMatrix::from_fn(nrows, ncols, |_, _| {
            let val: f64 = StandardNormal.sample(&mut *rng);
            <T as Scalar>::from_f64(val)
        })
    }

    /// Riemannian exponential `Exp_U(delta)` under `metric`.
    pub fn exp<T: Scalar>(
        &self,
        u: &DMatrix<T>,
        delta: &DMatrix<T>,
        metric: &StiefelMetric<T>,
    ) -> Result<DMatrix<T>> {
        self.exp_with_backend(&NalgebraBackend, u, delta, metric)
    }

    /// Riemannian exponential using the given dense linear-algebra backend.
    pub fn exp_with_backend<T, B>(
        &self,
        backend: &B,
        u: &DMatrix<T>,
        delta: &DMatrix<T>,
        metric: &StiefelMetric<T>,
    ) -> Result<DMatrix<T>>
    where
        T: Scalar,
        B: FactorizationBackend<T> + ?Sized,
    {
        self.check_shape(u, "base point")?;
        self.check_shape(delta, "tangent")?;
        let p = self.p;
        debug!("Stiefel exponential on St({}, {}), alpha = {:?}", self.n, p, metric.alpha());

        let split = split_tangent(u, delta);
        let qr = backend.thin_qr(&split.x)?;
        let m = exponential_block(&split.a, &qr.r, metric.v_factor());
        let exp_m = backend.expm(&m)?;

        let frame = u * block(&exp_m, (0, 0), (p, p)) + &qr.q * block(&exp_m, (p, 0), (p, p));
        match metric.mu_factor() {
            None => Ok(frame),
            Some(mu) => {
                let exp_a = backend.expm(&(&split.a * mu))?;
                Ok(frame * exp_a)
            }
        }
    }

    /// Frobenius distance of `X^T X` from the identity.
    pub fn orthonormality_defect<T: Scalar>(&self, point: &DMatrix<T>) -> T {
        let gram = point.transpose() * point;
        (gram - DMatrix::<T>::identity(point.ncols(), point.ncols())).norm()
    }
}

fn abs_max<T: Scalar>(m: &DMatrix<T>) -> T {
    m.iter().fold(T::zero(), |acc, x| Float::max(acc, Float::abs(*x)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use stiefeldiff_core::utils::test_helpers::seeded_rng;

    #[test]
    fn test_stiefel_creation() {
        let stiefel = Stiefel::new(5, 3).unwrap();
        assert_eq!(stiefel.dimension(), 15 - 6);
        assert_eq!(stiefel.n(), 5);
        assert_eq!(stiefel.p(), 3);

        assert!(Stiefel::new(3, 5).is_err());
        assert!(Stiefel::new(0, 3).is_err());
        assert!(Stiefel::new(3, 0).is_err());
    }

    #[test]
    fn test_orthonormality_check() {
        let stiefel = Stiefel::new(4, 2).unwrap();

        let mut matrix = DMatrix::zeros(4, 2);
        matrix[(0, 0)] = 1.0;
        matrix[(1, 1)] = 1.0;
        assert!(stiefel.is_point_on_manifold(&matrix, 1e-10));
        assert!(stiefel.check_point(&matrix, 1e-10).is_ok());

        matrix[(0, 1)] = 1.0;
        assert!(!stiefel.is_point_on_manifold(&matrix, 1e-10));
        assert!(matches!(
            stiefel.check_point(&matrix, 1e-10),
            Err(DiffError::InvalidPoint { .. })
        ));
    }

    #[test]
    fn test_tangent_space() {
        let stiefel = Stiefel::new(3, 2).unwrap();
        let x = DMatrix::from_vec(3, 2, vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let v = DMatrix::from_vec(3, 2, vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        assert!(stiefel.is_vector_in_tangent_space(&x, &v, 1e-10));

        let bad = DMatrix::from_vec(3, 2, vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(matches!(
            stiefel.check_tangent(&x, &bad, 1e-10),
            Err(DiffError::InvalidTangent { .. })
        ));
        assert!(matches!(
            stiefel.check_tangent(&x, &DMatrix::zeros(2, 2), 1e-10),
            Err(DiffError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_random_generation() {
        let stiefel = Stiefel::new(6, 2).unwrap();
        let mut rng = seeded_rng(1);
        let x: DMatrix<f64> = stiefel.random_point(&mut rng);
        assert!(stiefel.is_point_on_manifold(&x, 1e-10));

        let v = stiefel.random_tangent(&x, &mut rng).unwrap();
        assert!(stiefel.is_vector_in_tangent_space(&x, &v, 1e-10));
    }

    #[test]
    fn test_split_tangent() {
        let stiefel = Stiefel::new(7, 3).unwrap();
        let mut rng = seeded_rng(2);
        let u: DMatrix<f64> = stiefel.random_point(&mut rng);
        let delta = stiefel.random_tangent(&u, &mut rng).unwrap();

        let split = split_tangent(&u, &delta);
        assert!(skew_defect(&split.a) < 1e-14);
        assert_relative_eq!((u.transpose() * &split.x).norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!((&u * &split.a + &split.x - &delta).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_exp_at_zero_is_identity_map() {
        let stiefel = Stiefel::new(6, 2).unwrap();
        let mut rng = seeded_rng(3);
        let u: DMatrix<f64> = stiefel.random_point(&mut rng);
        let zero = DMatrix::zeros(6, 2);

        for metric in [
            StiefelMetric::canonical(),
            StiefelMetric::euclidean(),
            StiefelMetric::from_alpha(1.0).unwrap(),
        ] {
            let y = stiefel.exp(&u, &zero, &metric).unwrap();
            assert_relative_eq!((y - &u).norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_exp_on_sphere_matches_great_circle() {
        // St(n, 1) is the unit sphere, where every metric in the family
        // reduces to the round one.
        let stiefel = Stiefel::new(4, 1).unwrap();
        let u = DMatrix::from_vec(4, 1, vec![1.0, 0.0, 0.0, 0.0]);
        let delta = DMatrix::from_vec(4, 1, vec![0.0, 0.6, -0.8, 0.0]);
        let expected = &u * 1.0_f64.cos() + &delta * 1.0_f64.sin();

        for alpha in [0.0, 1.0, -0.5] {
            let metric = StiefelMetric::from_alpha(alpha).unwrap();
            let y = stiefel.exp(&u, &delta, &metric).unwrap();
            assert_relative_eq!((y - &expected).norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_exp_stays_on_manifold() {
        let stiefel = Stiefel::new(10, 3).unwrap();
        let mut rng = seeded_rng(4);
        let u: DMatrix<f64> = stiefel.random_point(&mut rng);
        let delta = stiefel.random_tangent(&u, &mut rng).unwrap();

        for alpha in [0.0, 1.0, -0.5, 3.0] {
            let metric = StiefelMetric::from_alpha(alpha).unwrap();
            let y = stiefel.exp(&u, &delta, &metric).unwrap();
            assert!(stiefel.orthonormality_defect(&y) < 1e-10);
        }
    }

    #[test]
    fn test_exp_metrics_differ_for_p_above_one() {
        let stiefel = Stiefel::new(8, 3).unwrap();
        let mut rng = seeded_rng(5);
        let u: DMatrix<f64> = stiefel.random_point(&mut rng);
        let delta = stiefel.random_tangent(&u, &mut rng).unwrap();

        let canonical = stiefel.exp(&u, &delta, &StiefelMetric::canonical()).unwrap();
        let euclidean = stiefel.exp(&u, &delta, &StiefelMetric::euclidean()).unwrap();
        assert!((canonical - euclidean).norm() > 1e-6);
    }

    #[test]
    fn test_exp_rejects_wrong_shapes() {
        let stiefel = Stiefel::new(5, 2).unwrap();
        let u = DMatrix::<f64>::zeros(5, 3);
        let delta = DMatrix::<f64>::zeros(5, 3);
        assert!(matches!(
            stiefel.exp(&u, &delta, &StiefelMetric::canonical()),
            Err(DiffError::DimensionMismatch { .. })
        ));
    }
}
