//! Structural matrix helpers.
//!
//! Skew parts, triangle masks and block assembly. Every helper returns a new
//! matrix; caller storage is never modified.

use crate::types::{DMatrix, Scalar};

/// Skew-symmetric part `(M - M^T) / 2` of a square matrix.
pub fn skew<T: Scalar>(m: &DMatrix<T>) -> DMatrix<T> {
    debug_assert_eq!(m.nrows(), m.ncols(), "skew part needs a square matrix");
    (m - m.transpose()) * <T as Scalar>::from_f64(0.5)
}

/// Symmetric part `(M + M^T) / 2` of a square matrix.
pub fn sym<T: Scalar>(m: &DMatrix<T>) -> DMatrix<T> {
    debug_assert_eq!(m.nrows(), m.ncols(), "symmetric part needs a square matrix");
    (m + m.transpose()) * <T as Scalar>::from_f64(0.5)
}

/// Strictly lower-triangular part of `m` (diagonal and above set to zero).
pub fn strict_lower<T: Scalar>(m: &DMatrix<T>) -> DMatrix<T> {
    DMatrix::from_fn(m.nrows(), m.ncols(), |i, j| {
        if i > j {
            m[(i, j)]
        } else {
            T::zero()
        }
    })
}

/// Copy of `m` with its strict lower triangle cleared.
///
/// Removes rounding leakage below the diagonal of a triangular factor.
pub fn upper_triangle<T: Scalar>(m: &DMatrix<T>) -> DMatrix<T> {
    let mut out = m.clone();
    out.fill_lower_triangle(T::zero(), 1);
    out
}

/// Maximum absolute entry of the strict lower triangle.
pub fn strict_lower_max<T: Scalar>(m: &DMatrix<T>) -> T {
    let mut max = T::zero();
    for j in 0..m.ncols() {
        for i in (j + 1)..m.nrows() {
            max = num_traits::Float::max(max, num_traits::Float::abs(m[(i, j)]));
        }
    }
    max
}

/// Frobenius norm of `M + M^T`, zero exactly when `M` is skew-symmetric.
pub fn skew_defect<T: Scalar>(m: &DMatrix<T>) -> T {
    (m + m.transpose()).norm()
}

/// Assemble the 2x2 block matrix `[[a, b], [c, d]]`.
///
/// Blocks must tile: `a`/`b` and `c`/`d` share row counts, `a`/`c` and `b`/`d`
/// share column counts.
pub fn block_2x2<T: Scalar>(
    a: &DMatrix<T>,
    b: &DMatrix<T>,
    c: &DMatrix<T>,
    d: &DMatrix<T>,
) -> DMatrix<T> {
    debug_assert_eq!(a.nrows(), b.nrows());
    debug_assert_eq!(c.nrows(), d.nrows());
    debug_assert_eq!(a.ncols(), c.ncols());
    debug_assert_eq!(b.ncols(), d.ncols());

    let (top, left) = (a.nrows(), a.ncols());
    let mut out = DMatrix::zeros(top + c.nrows(), left + b.ncols());
    out.view_mut((0, 0), a.shape()).copy_from(a);
    out.view_mut((0, left), b.shape()).copy_from(b);
    out.view_mut((top, 0), c.shape()).copy_from(c);
    out.view_mut((top, left), d.shape()).copy_from(d);
    out
}

/// Owned copy of the `(rows, cols)` block starting at `start`.
pub fn block<T: Scalar>(
    m: &DMatrix<T>,
    start: (usize, usize),
    shape: (usize, usize),
) -> DMatrix<T> {
    m.view(start, shape).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_skew_and_sym_split() {
        let m = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        let s = skew(&m);
        let h = sym(&m);

        assert_relative_eq!(skew_defect(&s), 0.0, epsilon = 1e-15);
        assert_relative_eq!((&s + &h - &m).norm(), 0.0, epsilon = 1e-15);
        assert_eq!(s[(0, 1)], -1.0);
    }

    #[test]
    fn test_triangle_masks_do_not_touch_input() {
        let m = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        let lower = strict_lower(&m);
        let upper = upper_triangle(&m);

        assert_eq!(lower[(2, 0)], 7.0);
        assert_eq!(lower[(1, 1)], 0.0);
        assert_eq!(lower[(0, 2)], 0.0);
        assert_eq!(upper[(2, 0)], 0.0);
        assert_eq!(upper[(1, 1)], 5.0);
        assert_eq!(upper[(0, 2)], 3.0);
        assert_eq!(m[(2, 0)], 7.0);
        assert_eq!(strict_lower_max(&upper), 0.0);
        assert_eq!(strict_lower_max(&m), 8.0);
    }

    #[test]
    fn test_block_assembly() {
        let a = DMatrix::from_element(2, 2, 1.0);
        let b = DMatrix::from_element(2, 1, 2.0);
        let c = DMatrix::from_element(1, 2, 3.0);
        let d = DMatrix::from_element(1, 1, 4.0);

        let m = block_2x2(&a, &b, &c, &d);
        assert_eq!(m.shape(), (3, 3));
        assert_eq!(m[(1, 1)], 1.0);
        assert_eq!(m[(0, 2)], 2.0);
        assert_eq!(m[(2, 0)], 3.0);
        assert_eq!(m[(2, 2)], 4.0);
        assert_eq!(block(&m, (0, 2), (2, 1)), b);
    }

    proptest! {
        #[test]
        fn prop_skew_sym_decomposition(entries in prop::collection::vec(-10.0f64..10.0, 16)) {
            let m = DMatrix::from_vec(4, 4, entries);
            let s = skew(&m);
            prop_assert!(skew_defect(&s) < 1e-12);
            prop_assert!((&s + sym(&m) - &m).norm() < 1e-12);
            prop_assert!((strict_lower(&m) + upper_triangle(&m) - &m).norm() == 0.0);
        }
    }
}
