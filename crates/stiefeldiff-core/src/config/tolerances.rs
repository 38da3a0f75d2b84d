//! Numerical tolerances shared by all differentiators.
//!
//! The thresholds decide when an input is rejected (singular QR factor,
//! coincident or vanishing singular values) and where the canonical metric
//! ends and the alpha-metrics begin.

use crate::types::Scalar;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tolerances used by the factorization differentiators.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiffConfig<T> {
    /// Relative threshold: `|R_ii| <= singular_tolerance * max_j |R_jj|` is singular.
    pub singular_tolerance: T,
    /// Absolute threshold on `|S_k - S_j|` below which the spectrum is degenerate.
    pub spectral_gap_tolerance: T,
    /// Singular values `<= rank_tolerance` make the factorization rank deficient.
    pub rank_tolerance: T,
    /// `|alpha| <= metric_tolerance` selects the canonical metric.
    pub metric_tolerance: T,
}

impl<T: Scalar> Default for DiffConfig<T> {
    fn default() -> Self {
        Self {
            singular_tolerance: T::SINGULAR_TOLERANCE,
            spectral_gap_tolerance: T::SPECTRAL_GAP_TOLERANCE,
            rank_tolerance: T::zero(),
            metric_tolerance: T::METRIC_TOLERANCE,
        }
    }
}

impl<T: Scalar> DiffConfig<T> {
    /// Create a configuration with the default tolerances.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the relative singularity threshold for triangular factors.
    pub fn with_singular_tolerance(mut self, tolerance: T) -> Self {
        self.singular_tolerance = tolerance;
        self
    }

    /// Set the absolute spectral gap threshold.
    pub fn with_spectral_gap_tolerance(mut self, tolerance: T) -> Self {
        self.spectral_gap_tolerance = tolerance;
        self
    }

    /// Set the rank threshold for singular values.
    pub fn with_rank_tolerance(mut self, tolerance: T) -> Self {
        self.rank_tolerance = tolerance;
        self
    }

    /// Set the canonical-metric threshold.
    pub fn with_metric_tolerance(mut self, tolerance: T) -> Self {
        self.metric_tolerance = tolerance;
        self
    }
}

/// Builder for creating a custom tolerance configuration.
pub struct DiffConfigBuilder<T> {
    config: DiffConfig<T>,
}

impl<T: Scalar> DiffConfigBuilder<T> {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: DiffConfig::default(),
        }
    }

    /// Relative singularity threshold for `R`.
    pub fn singular_tolerance(mut self, tolerance: T) -> Self {
        self.config.singular_tolerance = tolerance;
        self
    }

    /// Absolute singular value gap threshold.
    pub fn spectral_gap_tolerance(mut self, tolerance: T) -> Self {
        self.config.spectral_gap_tolerance = tolerance;
        self
    }

    /// Rank threshold for singular values.
    pub fn rank_tolerance(mut self, tolerance: T) -> Self {
        self.config.rank_tolerance = tolerance;
        self
    }

    /// Canonical-metric threshold.
    pub fn metric_tolerance(mut self, tolerance: T) -> Self {
        self.config.metric_tolerance = tolerance;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> DiffConfig<T> {
        self.config
    }
}

impl<T: Scalar> Default for DiffConfigBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
