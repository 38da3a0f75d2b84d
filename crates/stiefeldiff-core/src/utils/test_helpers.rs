//! Shared test utilities for tests and benchmarks.
//!
//! Deterministic random matrices, orthonormal frames and tangent vectors.

#![cfg(any(test, feature = "test-utils"))]

use crate::{
    numerical::structure::sym,
    types::{DMatrix, DVector, Scalar},
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

/// Seeded generator so that failures reproduce.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Matrix with independent standard normal entries.
pub fn random_matrix<T: Scalar, R: Rng>(rng: &mut R, nrows: usize, ncols: usize) -> DMatrix<T> {
    DMatrix::from_fn(nrows, ncols, |_, _| {
        let val: f64 = StandardNormal.sample(&mut *rng);
        <T as Scalar>::from_f64(val)
    })
}

/// Random point on St(n, p): the Q factor of a Gaussian matrix.
pub fn random_orthonormal<T: Scalar, R: Rng>(rng: &mut R, n: usize, p: usize) -> DMatrix<T> {
    let a = random_matrix::<T, R>(rng, n, p);
    a.qr().q()
}

/// Random tangent vector at `u`: `Z - U sym(U^T Z)` for Gaussian `Z`.
pub fn random_tangent<T: Scalar, R: Rng>(rng: &mut R, u: &DMatrix<T>) -> DMatrix<T> {
    let z = random_matrix::<T, R>(rng, u.nrows(), u.ncols());
    let utz = u.transpose() * &z;
    &z - u * sym(&utz)
}

/// Vector of `len` well separated, strictly decreasing positive values.
pub fn separated_spectrum<T: Scalar>(len: usize) -> DVector<T> {
    DVector::from_fn(len, |i, _| <T as Scalar>::from_usize(len - i) + <T as Scalar>::from_f64(0.5))
}
