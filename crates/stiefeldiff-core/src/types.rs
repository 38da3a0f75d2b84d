//! Type definitions and aliases.
//!
//! This module provides the scalar trait shared by every differentiator,
//! dense matrix aliases and numerical constants.

use nalgebra::{OMatrix, OVector, Dyn, RealField, Scalar as NalgebraScalar};
use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display};

/// Trait for scalar types used by the differentiators (f32 or f64).
///
/// This trait combines all the numeric traits required by the dense
/// factorizations and their derivatives.
pub trait Scalar:
    NalgebraScalar
    + RealField
    + Float
    + FromPrimitive
    + Display
    + Debug
    + Default
    + Copy
    + Send
    + Sync
    + 'static
{
    /// Machine epsilon for this scalar type.
    const EPSILON: Self;

    /// Relative threshold below which a triangular diagonal entry is singular.
    const SINGULAR_TOLERANCE: Self;

    /// Absolute gap below which two singular values are treated as equal.
    const SPECTRAL_GAP_TOLERANCE: Self;

    /// Threshold separating the canonical metric from the alpha-metrics.
    const METRIC_TOLERANCE: Self;

    /// Tolerance for checking orthonormality and skew-symmetry.
    const ORTHOGONALITY_TOLERANCE: Self;

    /// Convert from f64 (for constants).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails. Use `try_from_f64` for a non-panicking version.
    fn from_f64(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).expect("Failed to convert from f64")
    }

    /// Try to convert from f64.
    ///
    /// Returns None if the conversion fails.
    fn try_from_f64(v: f64) -> Option<Self> {
        <Self as FromPrimitive>::from_f64(v)
    }

    /// Convert to f64 (for logging and error payloads).
    ///
    /// Non-representable values map to NaN.
    fn to_f64(self) -> f64 {
        num_traits::cast(self).unwrap_or(f64::NAN)
    }

    /// Convert from usize (for dimension-scaled tolerances).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn from_usize(v: usize) -> Self {
        <Self as FromPrimitive>::from_usize(v).expect("Failed to convert from usize")
    }
}

impl Scalar for f32 {
    const EPSILON: Self = f32::EPSILON;
    const SINGULAR_TOLERANCE: Self = 1e-6;
    const SPECTRAL_GAP_TOLERANCE: Self = 1e-6;
    const METRIC_TOLERANCE: Self = 1e-6;
    const ORTHOGONALITY_TOLERANCE: Self = 1e-5;
}

impl Scalar for f64 {
    const EPSILON: Self = f64::EPSILON;
    const SINGULAR_TOLERANCE: Self = 1e-12;
    const SPECTRAL_GAP_TOLERANCE: Self = 1e-12;
    const METRIC_TOLERANCE: Self = 1e-10;
    const ORTHOGONALITY_TOLERANCE: Self = 1e-10;
}

/// Type alias for a dynamically-sized matrix.
pub type DMatrix<T> = OMatrix<T, Dyn, Dyn>;

/// Type alias for a dynamically-sized vector.
pub type DVector<T> = OVector<T, Dyn>;

/// Shape of a dense matrix as `(rows, columns)`.
pub type Shape = (usize, usize);

/// Formats a shape the way error messages print it.
pub fn shape_string(shape: Shape) -> String {
    format!("{}x{}", shape.0, shape.1)
}

/// Numerical constants for different precision levels.
pub mod constants {
    use super::Scalar;

    /// Get machine epsilon for the given scalar type.
    pub fn epsilon<T: Scalar>() -> T {
        T::EPSILON
    }

    /// Get the default relative singularity threshold.
    pub fn singular_tolerance<T: Scalar>() -> T {
        T::SINGULAR_TOLERANCE
    }

    /// Get the default spectral gap threshold.
    pub fn spectral_gap_tolerance<T: Scalar>() -> T {
        T::SPECTRAL_GAP_TOLERANCE
    }

    /// Get the default canonical-metric threshold.
    pub fn metric_tolerance<T: Scalar>() -> T {
        T::METRIC_TOLERANCE
    }
}
