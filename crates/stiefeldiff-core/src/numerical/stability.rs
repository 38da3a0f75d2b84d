//! Numerical stability utilities
//!
//! Finite-ness checks on collaborator output and the relative-error measure
//! used to compare derivatives.

use crate::{
    error::{DiffError, Result},
    types::{DMatrix, DVector, Scalar},
};
use num_traits::Float;

/// Check if a matrix is finite (no NaN or Inf values)
pub fn is_finite_matrix<T: Scalar>(matrix: &DMatrix<T>) -> bool {
    matrix.iter().all(|x| Float::is_finite(*x))
}

/// Check if a vector is finite (no NaN or Inf values)
pub fn is_finite_vector<T: Scalar>(vector: &DVector<T>) -> bool {
    vector.iter().all(|x| Float::is_finite(*x))
}

/// Reject a matrix holding NaN or Inf, naming the producing operation.
pub fn ensure_finite<T: Scalar>(matrix: DMatrix<T>, operation: &str) -> Result<DMatrix<T>> {
    if is_finite_matrix(&matrix) {
        Ok(matrix)
    } else {
        Err(DiffError::numerical_error(format!(
            "{} produced non-finite entries",
            operation
        )))
    }
}

/// Relative Frobenius-norm error `||actual - expected|| / ||expected||`.
///
/// Falls back to the absolute error when `expected` vanishes.
pub fn relative_error<T: Scalar>(actual: &DMatrix<T>, expected: &DMatrix<T>) -> T {
    let diff = (actual - expected).norm();
    let scale = expected.norm();
    if scale > T::zero() {
        diff / scale
    } else {
        diff
    }
}

/// Smallest pairwise gap `|s_k - s_j|` together with the indices achieving it.
///
/// Returns `None` for fewer than two values.
pub fn min_spectral_gap<T: Scalar>(values: &DVector<T>) -> Option<(usize, usize, T)> {
    let mut best: Option<(usize, usize, T)> = None;
    for j in 0..values.len() {
        for k in (j + 1)..values.len() {
            let gap = Float::abs(values[k] - values[j]);
            match best {
                Some((_, _, g)) if g <= gap => {}
                _ => best = Some((j, k, gap)),
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_finite_checks() {
        let good = DMatrix::from_element(2, 2, 1.0);
        let mut bad = good.clone();
        bad[(1, 0)] = f64::NAN;

        assert!(is_finite_matrix(&good));
        assert!(!is_finite_matrix(&bad));
        assert!(ensure_finite(good, "expm").is_ok());
        assert!(matches!(
            ensure_finite(bad, "expm"),
            Err(DiffError::NumericalError { .. })
        ));
        assert!(!is_finite_vector(&DVector::from_vec(vec![1.0, f64::INFINITY])));
    }

    #[test]
    fn test_relative_error() {
        let expected = DMatrix::from_row_slice(2, 2, &[3.0, 0.0, 0.0, 4.0]);
        let actual = DMatrix::from_row_slice(2, 2, &[3.0, 0.0, 0.0, 4.5]);
        assert_relative_eq!(relative_error(&actual, &expected), 0.1, epsilon = 1e-15);

        let zero = DMatrix::<f64>::zeros(2, 2);
        assert_relative_eq!(relative_error(&expected, &zero), 5.0, epsilon = 1e-15);
    }

    #[test]
    fn test_min_spectral_gap() {
        let s = DVector::from_vec(vec![5.0, 3.0, 2.9, 1.0]);
        let (j, k, gap) = min_spectral_gap(&s).unwrap();
        assert_eq!((j, k), (1, 2));
        assert_relative_eq!(gap, 0.1, epsilon = 1e-12);
        assert!(min_spectral_gap(&DVector::from_vec(vec![1.0])).is_none());
    }
}
