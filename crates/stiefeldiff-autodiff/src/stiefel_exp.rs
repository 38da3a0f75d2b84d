//! Directional derivative of the Riemannian exponential on St(n,p).
//!
//! For a base point `U`, a tangent `Delta` and a direction `V`, computes
//! `d/dt|_{t=0} Exp_U(Delta + t V)` under the alpha-metric family by chaining
//! the QR and matrix-exponential derivatives through the closed form
//! ```text
//! Exp_U(D) = (U E11 + Q E21) exp(mu A),   E = exp([[v A, -R^T], [R, 0]])
//! ```
//! with `A = skew(U^T D)`, `QR = D - U A`, `v = 1/(alpha+1)` and
//! `mu = alpha/(alpha+1)`. The canonical metric has `mu = 0` and skips the
//! secondary exponential.

use crate::{
    expm::{ExpmDerivative, ExpmDifferentiator},
    qr::{QrDerivative, QrDifferentiator},
};
use log::debug;
use stiefeldiff_core::{
    compute::{FactorizationBackend, NalgebraBackend},
    config::DiffConfig,
    error::{DiffError, Result},
    numerical::structure::block,
    types::{shape_string, DMatrix, Scalar},
};
use stiefeldiff_manifolds::{exponential_block, split_tangent, StiefelMetric};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// `Exp_U(Delta)` together with its derivative along a direction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StiefelExpDerivative<T: Scalar> {
    /// The point `Exp_U(Delta)`
    pub point: DMatrix<T>,
    /// `d/dt|_{t=0} Exp_U(Delta + t V)`
    pub derivative: DMatrix<T>,
}

/// Differentiates the Stiefel exponential under a fixed metric.
#[derive(Debug, Clone)]
pub struct StiefelExpDifferentiator<T: Scalar, B = NalgebraBackend> {
    qr: QrDifferentiator<T, B>,
    expm: ExpmDifferentiator<B>,
    metric: StiefelMetric<T>,
}

impl<T: Scalar> StiefelExpDifferentiator<T, NalgebraBackend> {
    /// Canonical-metric differentiator on the nalgebra backend.
    pub fn new() -> Self {
        Self::with_backend(NalgebraBackend)
    }
}

impl<T: Scalar> Default for StiefelExpDifferentiator<T, NalgebraBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, B> StiefelExpDifferentiator<T, B>
where
    T: Scalar,
    B: FactorizationBackend<T> + Clone,
{
    /// Canonical-metric differentiator on a custom backend.
    pub fn with_backend(backend: B) -> Self {
        Self {
            qr: QrDifferentiator::with_backend(backend.clone()),
            expm: ExpmDifferentiator::with_backend(backend),
            metric: StiefelMetric::Canonical,
        }
    }

    /// Use `metric` for subsequent evaluations.
    pub fn with_metric(mut self, metric: StiefelMetric<T>) -> Self {
        self.metric = metric;
        self
    }

    /// Use the metric with parameter `alpha`.
    ///
    /// `|alpha|` up to the configured `metric_tolerance` selects the canonical
    /// metric. The tolerance is read once, here: call
    /// [`with_config`](Self::with_config) first when it should apply.
    ///
    /// # Errors
    ///
    /// `InvalidMetricParameter` when `alpha` is not finite or within the
    /// tolerance of `-1` or below.
    pub fn with_alpha(self, alpha: T) -> Result<Self> {
        let tolerance = self.qr.config().metric_tolerance;
        let metric = StiefelMetric::from_alpha_with_tolerance(alpha, tolerance)?;
        Ok(self.with_metric(metric))
    }

    /// Replace the tolerance configuration.
    ///
    /// The metric already chosen is kept as is; `metric_tolerance` only
    /// affects later calls to [`with_alpha`](Self::with_alpha).
    pub fn with_config(mut self, config: DiffConfig<T>) -> Self {
        self.qr = self.qr.with_config(config);
        self
    }

    /// The metric in use.
    pub fn metric(&self) -> &StiefelMetric<T> {
        &self.metric
    }

    /// The tolerance configuration.
    pub fn config(&self) -> &DiffConfig<T> {
        self.qr.config()
    }

    fn check_shapes(&self, u: &DMatrix<T>, delta: &DMatrix<T>, v: &DMatrix<T>) -> Result<()> {
        let (n, p) = u.shape();
        if n < p || p == 0 {
            return Err(DiffError::dimension_mismatch(
                "base point of shape n x p with n >= p >= 1",
                shape_string((n, p)),
            ));
        }
        for (what, m) in [("tangent", delta), ("direction", v)] {
            if m.shape() != (n, p) {
                return Err(DiffError::dimension_mismatch(
                    format!("{} of shape {}", what, shape_string((n, p))),
                    shape_string(m.shape()),
                ));
            }
        }
        Ok(())
    }

    /// `d/dt|_{t=0} Exp_U(delta + t v)`.
    ///
    /// The in-frame parts `U^T delta` and `U^T v` are replaced by their skew
    /// parts; a non-tangent `delta` is corrected, not rejected.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` on inconsistent shapes
    /// - `SingularFactor` when the normal part of `delta` is rank deficient
    ///   (in particular `delta` inside the span of `U`, including zero)
    pub fn differentiate(
        &self,
        u: &DMatrix<T>,
        delta: &DMatrix<T>,
        v: &DMatrix<T>,
    ) -> Result<DMatrix<T>> {
        Ok(self.evaluate(u, delta, v)?.derivative)
    }

    /// `Exp_U(delta)` and `d/dt|_{t=0} Exp_U(delta + t v)` from one pass.
    pub fn evaluate(
        &self,
        u: &DMatrix<T>,
        delta: &DMatrix<T>,
        v: &DMatrix<T>,
    ) -> Result<StiefelExpDerivative<T>> {
        self.check_shapes(u, delta, v)?;
        let (n, p) = u.shape();
        debug!(
            "differentiating Stiefel exponential on St({}, {}) with alpha = {}",
            n,
            p,
            self.metric.alpha()
        );

        let base = split_tangent(u, delta);
        let direction = split_tangent(u, v);

        let QrDerivative { q, dq, r, dr } =
            self.qr
                .differentiate_with_reference(&base.x, &direction.x, delta.norm())?;

        let v_factor = self.metric.v_factor();
        let m = exponential_block(&base.a, &r, v_factor);
        let dm = exponential_block(&direction.a, &dr, v_factor);
        let ExpmDerivative { exp_m, dexp_m } = self.expm.differentiate(&m, &dm)?;

        let e11 = block(&exp_m, (0, 0), (p, p));
        let e21 = block(&exp_m, (p, 0), (p, p));
        let de11 = block(&dexp_m, (0, 0), (p, p));
        let de21 = block(&dexp_m, (p, 0), (p, p));

        let frame = u * &e11 + &q * &e21;
        let dframe = &dq * &e21 + u * &de11 + &q * &de21;

        match self.metric.mu_factor() {
            None => Ok(StiefelExpDerivative {
                point: frame,
                derivative: dframe,
            }),
            Some(mu) => {
                let ExpmDerivative {
                    exp_m: exp_a,
                    dexp_m: dexp_a,
                } = self
                    .expm
                    .differentiate(&(&base.a * mu), &(&direction.a * mu))?;
                Ok(StiefelExpDerivative {
                    point: &frame * &exp_a,
                    derivative: dframe * &exp_a + frame * dexp_a,
                })
            }
        }
    }

    /// Derivatives along several directions at the same `(u, delta)`.
    ///
    /// Directions are independent and run on the rayon pool when the
    /// `parallel` feature is enabled. Fails if any direction fails.
    pub fn differentiate_many(
        &self,
        u: &DMatrix<T>,
        delta: &DMatrix<T>,
        directions: &[DMatrix<T>],
    ) -> Result<Vec<DMatrix<T>>> {
        #[cfg(feature = "parallel")]
        {
            directions
                .par_iter()
                .map(|v| self.differentiate(u, delta, v))
                .collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            directions
                .iter()
                .map(|v| self.differentiate(u, delta, v))
                .collect()
        }
    }
}

/// Derivative of `Exp_U(delta + t v)` at `t = 0` under `metric`.
pub fn diff_stiefel_exp<T: Scalar>(
    u: &DMatrix<T>,
    delta: &DMatrix<T>,
    v: &DMatrix<T>,
    metric: &StiefelMetric<T>,
) -> Result<DMatrix<T>> {
    StiefelExpDifferentiator::new()
        .with_metric(*metric)
        .differentiate(u, delta, v)
}
