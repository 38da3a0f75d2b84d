//! Error types for factorization derivatives.
//!
//! Every failure is deterministic and detected synchronously: a failing call
//! returns exactly one of these variants and never a partially filled result.

use thiserror::Error;

/// Errors that can occur while differentiating a factorization.
#[derive(Debug, Clone, Error)]
pub enum DiffError {
    /// Dimension mismatch between inputs.
    ///
    /// This error occurs when the matrices handed to a differentiator have
    /// inconsistent shapes.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// The triangular QR factor is not invertible.
    ///
    /// Raised when the base point of a QR curve is rank deficient (a zero
    /// column or two columns pointing in the same direction).
    #[error("Singular triangular factor: {reason}")]
    SingularFactor {
        /// Description of the offending diagonal entry
        reason: String,
    },

    /// The metric parameter leaves the admissible range `alpha > -1`.
    #[error("Invalid metric parameter alpha = {alpha}: {reason}")]
    InvalidMetricParameter {
        /// Rejected parameter value
        alpha: f64,
        /// Why the value was rejected
        reason: String,
    },

    /// Two singular values are (nearly) equal.
    ///
    /// The in-block coefficient of `dV` divides by `S_k - S_j`, so a small gap
    /// would silently amplify rounding error.
    #[error(
        "Near-degenerate spectrum: singular values {first} and {second} differ by {gap:e} (tolerance {tolerance:e})"
    )]
    NearDegenerateSpectrum {
        /// Index of the first singular value
        first: usize,
        /// Index of the second singular value
        second: usize,
        /// Absolute gap between the two values
        gap: f64,
        /// Gap tolerance that was violated
        tolerance: f64,
    },

    /// A singular value is zero (or below the rank tolerance).
    #[error("Rank deficient factorization: singular value {index} is {value:e}")]
    RankDeficient {
        /// Index of the vanishing singular value
        index: usize,
        /// Offending value
        value: f64,
    },

    /// Point is not on the Stiefel manifold.
    #[error("Point is not on the manifold: {reason}")]
    InvalidPoint {
        /// Description of why the point is invalid
        reason: String,
    },

    /// Vector is not in the tangent space.
    #[error("Vector is not in the tangent space: {reason}")]
    InvalidTangent {
        /// Description of why the tangent vector is invalid
        reason: String,
    },

    /// The dense linear-algebra collaborator produced an unusable result.
    ///
    /// This error occurs when a factorization or exponential returns
    /// non-finite entries.
    #[error("Numerical instability detected: {reason}")]
    NumericalError {
        /// Description of the numerical issue
        reason: String,
    },
}

impl DiffError {
    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a SingularFactor error with a custom reason.
    pub fn singular_factor<S: Into<String>>(reason: S) -> Self {
        Self::SingularFactor {
            reason: reason.into(),
        }
    }

    /// Create an InvalidMetricParameter error.
    pub fn invalid_metric_parameter<S: Into<String>>(alpha: f64, reason: S) -> Self {
        Self::InvalidMetricParameter {
            alpha,
            reason: reason.into(),
        }
    }

    /// Create a NearDegenerateSpectrum error for the pair `(first, second)`.
    pub fn near_degenerate_spectrum(first: usize, second: usize, gap: f64, tolerance: f64) -> Self {
        Self::NearDegenerateSpectrum {
            first,
            second,
            gap,
            tolerance,
        }
    }

    /// Create a RankDeficient error.
    pub fn rank_deficient(index: usize, value: f64) -> Self {
        Self::RankDeficient { index, value }
    }

    /// Create an InvalidPoint error with a custom reason.
    pub fn invalid_point<S: Into<String>>(reason: S) -> Self {
        Self::InvalidPoint {
            reason: reason.into(),
        }
    }

    /// Create an InvalidTangent error with a custom reason.
    pub fn invalid_tangent<S: Into<String>>(reason: S) -> Self {
        Self::InvalidTangent {
            reason: reason.into(),
        }
    }

    /// Create a NumericalError with a custom reason.
    pub fn numerical_error<S: Into<String>>(reason: S) -> Self {
        Self::NumericalError {
            reason: reason.into(),
        }
    }
}

/// Result type alias for operations that can produce DiffError.
pub type Result<T> = std::result::Result<T, DiffError>;
