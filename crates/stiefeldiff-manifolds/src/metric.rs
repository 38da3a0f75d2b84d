//! The alpha-family of Riemannian metrics on the Stiefel manifold.
//!
//! For tangent vectors `D1, D2` at `U` the metrics read
//! ```text
//! g_alpha(D1, D2) = tr(D1^T D2) - (2 alpha + 1) / (2 (alpha + 1)) tr(D1^T U U^T D2)
//! ```
//! with `alpha > -1`. `alpha = 0` is the canonical metric and
//! `alpha = -1/2` the Euclidean one.
//!
//! The canonical/non-canonical decision is taken once, when a
//! [`StiefelMetric`] is built from a raw `alpha`; downstream code matches on
//! the variant instead of re-testing the parameter.

use stiefeldiff_core::{
    error::{DiffError, Result},
    types::Scalar,
};
use num_traits::Float;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A validated metric parameter `alpha` with `alpha > -1` and `|alpha|` above
/// the canonical threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlphaParameter<T> {
    alpha: T,
}

impl<T: Scalar> AlphaParameter<T> {
    /// The raw parameter value.
    pub fn value(&self) -> T {
        self.alpha
    }
}

/// Member of the alpha-metric family used by the Stiefel exponential.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StiefelMetric<T> {
    /// `alpha = 0`
    Canonical,
    /// Any admissible `alpha != 0`
    Alpha(AlphaParameter<T>),
}

impl<T> Default for StiefelMetric<T> {
    fn default() -> Self {
        StiefelMetric::Canonical
    }
}

impl<T: Scalar> StiefelMetric<T> {
    /// The canonical metric.
    pub fn canonical() -> Self {
        StiefelMetric::Canonical
    }

    /// The Euclidean metric (`alpha = -1/2`).
    pub fn euclidean() -> Self {
        StiefelMetric::Alpha(AlphaParameter {
            alpha: <T as Scalar>::from_f64(-0.5),
        })
    }

    /// Build a metric from `alpha` with the default canonical threshold.
    ///
    /// # Errors
    ///
    /// `InvalidMetricParameter` when `alpha` is not finite or
    /// `alpha <= -1 + T::METRIC_TOLERANCE`.
    pub fn from_alpha(alpha: T) -> Result<Self> {
        Self::from_alpha_with_tolerance(alpha, T::METRIC_TOLERANCE)
    }

    /// Build a metric from `alpha`, treating `|alpha| <= tolerance` as canonical.
    pub fn from_alpha_with_tolerance(alpha: T, tolerance: T) -> Result<Self> {
        if !Float::is_finite(alpha) {
            return Err(DiffError::invalid_metric_parameter(
                Scalar::to_f64(alpha),
                "alpha must be finite",
            ));
        }
        if alpha + T::one() <= tolerance {
            return Err(DiffError::invalid_metric_parameter(
                Scalar::to_f64(alpha),
                "alpha must exceed -1, the metric degenerates otherwise",
            ));
        }

        if Float::abs(alpha) <= tolerance {
            Ok(StiefelMetric::Canonical)
        } else {
            Ok(StiefelMetric::Alpha(AlphaParameter { alpha }))
        }
    }

    /// The metric parameter (zero for the canonical metric).
    pub fn alpha(&self) -> T {
        match self {
            StiefelMetric::Canonical => T::zero(),
            StiefelMetric::Alpha(p) => p.alpha,
        }
    }

    /// Whether this is the canonical metric.
    pub fn is_canonical(&self) -> bool {
        matches!(self, StiefelMetric::Canonical)
    }

    /// Scaling `1 / (alpha + 1)` of the skew block in the large exponential.
    pub fn v_factor(&self) -> T {
        T::one() / (self.alpha() + T::one())
    }

    /// Scaling `alpha / (alpha + 1)` of the secondary exponential.
    ///
    /// `None` for the canonical metric, where the secondary factor is the identity.
    pub fn mu_factor(&self) -> Option<T> {
        match self {
            StiefelMetric::Canonical => None,
            StiefelMetric::Alpha(p) => Some(p.alpha / (p.alpha + T::one())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_canonical_threshold() {
        let m = StiefelMetric::<f64>::from_alpha(0.0).unwrap();
        assert!(m.is_canonical());
        let m = StiefelMetric::<f64>::from_alpha(5e-11).unwrap();
        assert!(m.is_canonical());
        assert_eq!(m.alpha(), 0.0);

        let m = StiefelMetric::<f64>::from_alpha(1.0).unwrap();
        assert!(!m.is_canonical());
        assert_eq!(m.alpha(), 1.0);
    }

    #[test]
    fn test_rejects_degenerate_alpha() {
        for alpha in [-1.0, -1.0 + 1e-11, -2.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                StiefelMetric::<f64>::from_alpha(alpha),
                Err(DiffError::InvalidMetricParameter { .. })
            ));
        }
        assert!(StiefelMetric::<f64>::from_alpha(-0.99).is_ok());
    }

    #[test]
    fn test_factors() {
        let canonical = StiefelMetric::<f64>::canonical();
        assert_eq!(canonical.v_factor(), 1.0);
        assert!(canonical.mu_factor().is_none());

        let m = StiefelMetric::<f64>::from_alpha(1.0).unwrap();
        assert_relative_eq!(m.v_factor(), 0.5);
        assert_relative_eq!(m.mu_factor().unwrap(), 0.5);

        let e = StiefelMetric::<f64>::euclidean();
        assert_relative_eq!(e.v_factor(), 2.0);
        assert_relative_eq!(e.mu_factor().unwrap(), -1.0);
        assert_eq!(StiefelMetric::<f64>::default(), StiefelMetric::Canonical);
    }

    #[test]
    fn test_custom_tolerance() {
        let m = StiefelMetric::<f64>::from_alpha_with_tolerance(1e-3, 1e-2).unwrap();
        assert!(m.is_canonical());
    }
}
