//! Numerical validation utilities for directional derivatives.
//!
//! This module provides finite-difference tools that check an analytical
//! derivative `d/dt|_{t=0} f(t)` against central differences and estimate the
//! order of convergence as the step size shrinks. They are invoked explicitly
//! from tests and never run on a production path.

use crate::{
    error::{DiffError, Result},
    numerical::stability::relative_error,
    types::{DMatrix, Scalar},
};
use num_traits::Float;

/// Configuration for numerical validation tests.
#[derive(Debug, Clone)]
pub struct NumericalValidationConfig<T> {
    /// Step size for single-shot derivative checks
    pub base_step_size: T,
    /// Minimum step size to test
    pub min_step_size: T,
    /// Maximum step size to test
    pub max_step_size: T,
    /// Number of step sizes to test
    pub num_steps: usize,
    /// Relative tolerance for single-shot derivative checks
    pub derivative_tolerance: T,
}

impl<T: Scalar> Default for NumericalValidationConfig<T> {
    fn default() -> Self {
        Self {
            base_step_size: <T as Scalar>::from_f64(1e-5),
            min_step_size: <T as Scalar>::from_f64(1e-4),
            max_step_size: <T as Scalar>::from_f64(1e-1),
            num_steps: 4,
            derivative_tolerance: <T as Scalar>::from_f64(1e-6),
        }
    }
}

/// Results from a single finite-difference comparison.
#[derive(Debug)]
pub struct DerivativeCheckResult<T> {
    /// Relative Frobenius error between analytical and numerical derivative
    pub relative_error: T,
    /// Step size used
    pub step_size: T,
    /// Whether the check passed
    pub passed: bool,
}

/// Results from convergence analysis.
#[derive(Debug)]
pub struct ConvergenceResult<T> {
    /// Estimated order of convergence (slope of log error over log step)
    pub order: T,
    /// R-squared value for linear fit
    pub r_squared: T,
    /// Step sizes used
    pub step_sizes: Vec<T>,
    /// Errors at each step size
    pub errors: Vec<T>,
}

/// Central difference `(f(h) - f(-h)) / (2h)` of a matrix-valued curve.
pub fn central_difference<T, F>(f: F, h: T) -> Result<DMatrix<T>>
where
    T: Scalar,
    F: Fn(T) -> Result<DMatrix<T>>,
{
    if !(h > T::zero()) {
        return Err(DiffError::numerical_error(
            "finite-difference step size must be positive",
        ));
    }
    let forward = f(h)?;
    let backward = f(-h)?;
    if forward.shape() != backward.shape() {
        return Err(DiffError::dimension_mismatch(
            format!("{:?}", forward.shape()),
            format!("{:?}", backward.shape()),
        ));
    }
    Ok((forward - backward) * (T::one() / (h + h)))
}

/// Numerical validation tools for matrix derivatives.
pub struct NumericalValidator;

impl NumericalValidator {
    /// Compare an analytical derivative with one central difference.
    pub fn check_derivative<T, F>(
        f: F,
        analytical: &DMatrix<T>,
        config: &NumericalValidationConfig<T>,
    ) -> Result<DerivativeCheckResult<T>>
    where
        T: Scalar,
        F: Fn(T) -> Result<DMatrix<T>>,
    {
        let h = config.base_step_size;
        let numerical = central_difference(&f, h)?;
        if numerical.shape() != analytical.shape() {
            return Err(DiffError::dimension_mismatch(
                format!("{:?}", analytical.shape()),
                format!("{:?}", numerical.shape()),
            ));
        }
        let error = relative_error(&numerical, analytical);

        Ok(DerivativeCheckResult {
            relative_error: error,
            step_size: h,
            passed: error < config.derivative_tolerance,
        })
    }

    /// Measure how the central-difference error decays with the step size.
    ///
    /// Step sizes are logarithmically spaced between `min_step_size` and
    /// `max_step_size`; the order is the least-squares slope of
    /// `ln(error)` against `ln(h)`. A second-order accurate pair of
    /// derivative and finite difference yields an order close to 2.
    pub fn convergence_study<T, F>(
        f: F,
        analytical: &DMatrix<T>,
        config: &NumericalValidationConfig<T>,
    ) -> Result<ConvergenceResult<T>>
    where
        T: Scalar,
        F: Fn(T) -> Result<DMatrix<T>>,
    {
        if config.num_steps < 2 {
            return Err(DiffError::numerical_error(
                "convergence study needs at least two step sizes",
            ));
        }

        let log_min = Float::ln(config.min_step_size);
        let log_max = Float::ln(config.max_step_size);
        let mut step_sizes = Vec::with_capacity(config.num_steps);
        let mut errors = Vec::with_capacity(config.num_steps);

        for i in 0..config.num_steps {
            let alpha =
                <T as Scalar>::from_usize(i) / <T as Scalar>::from_usize(config.num_steps - 1);
            let h = Float::exp(log_min * (T::one() - alpha) + log_max * alpha);
            let numerical = central_difference(&f, h)?;
            step_sizes.push(h);
            errors.push((numerical - analytical).norm());
        }

        let (order, r_squared) = Self::log_log_fit(&step_sizes, &errors)?;

        Ok(ConvergenceResult {
            order,
            r_squared,
            step_sizes,
            errors,
        })
    }

    /// Least-squares line through `(ln h, ln e)`; returns slope and R².
    fn log_log_fit<T: Scalar>(step_sizes: &[T], errors: &[T]) -> Result<(T, T)> {
        let points: Vec<(T, T)> = step_sizes
            .iter()
            .zip(errors.iter())
            .filter(|(_, e)| **e > T::zero())
            .map(|(h, e)| (Float::ln(*h), Float::ln(*e)))
            .collect();

        if points.len() < 2 {
            return Err(DiffError::numerical_error(
                "finite-difference errors vanished, no order can be fitted",
            ));
        }

        let n = <T as Scalar>::from_usize(points.len());
        let mean_x = points.iter().fold(T::zero(), |acc, (x, _)| acc + *x) / n;
        let mean_y = points.iter().fold(T::zero(), |acc, (_, y)| acc + *y) / n;

        let mut sxx = T::zero();
        let mut sxy = T::zero();
        let mut syy = T::zero();
        for (x, y) in &points {
            let dx = *x - mean_x;
            let dy = *y - mean_y;
            sxx += dx * dx;
            sxy += dx * dy;
            syy += dy * dy;
        }

        let slope = sxy / sxx;
        let r_squared = if syy > T::zero() {
            (sxy * sxy) / (sxx * syy)
        } else {
            T::one()
        };
        Ok((slope, r_squared))
    }
}
