//! Directional derivative of the matrix exponential.
//!
//! Uses the block identity
//! ```text
//! exp([[M, dM], [0, M]]) = [[exp(M), D exp(M)[dM]], [0, exp(M)]]
//! ```
//! so a single `2p x 2p` exponential yields both `exp(M)` and its
//! Fréchet derivative along `dM`.

use log::debug;
use stiefeldiff_core::{
    compute::{FactorizationBackend, NalgebraBackend},
    error::{DiffError, Result},
    numerical::structure::{block, block_2x2},
    types::{shape_string, DMatrix, Scalar},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// `exp(M)` and its directional derivative.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExpmDerivative<T: Scalar> {
    /// `exp(M)`
    pub exp_m: DMatrix<T>,
    /// `D exp(M)[dM]`
    pub dexp_m: DMatrix<T>,
}

/// Differentiates the dense matrix exponential.
#[derive(Debug, Clone, Default)]
pub struct ExpmDifferentiator<B = NalgebraBackend> {
    backend: B,
}

impl ExpmDifferentiator<NalgebraBackend> {
    /// Differentiator on the nalgebra backend.
    pub fn new() -> Self {
        Self {
            backend: NalgebraBackend,
        }
    }
}

impl<B> ExpmDifferentiator<B> {
    /// Differentiator on a custom backend.
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    /// The dense linear-algebra backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Exponential of the augmented block matrix `[[M, dM], [0, M]]`.
    pub fn augmented_exponential<T>(&self, m: &DMatrix<T>, dm: &DMatrix<T>) -> Result<DMatrix<T>>
    where
        T: Scalar,
        B: FactorizationBackend<T>,
    {
        if !m.is_square() {
            return Err(DiffError::dimension_mismatch(
                "square matrix",
                shape_string(m.shape()),
            ));
        }
        if dm.shape() != m.shape() {
            return Err(DiffError::dimension_mismatch(
                format!("direction of shape {}", shape_string(m.shape())),
                shape_string(dm.shape()),
            ));
        }

        let p = m.nrows();
        debug!("differentiating matrix exponential of size {}", p);
        let aux = block_2x2(m, dm, &DMatrix::zeros(p, p), m);
        self.backend.expm(&aux)
    }

    /// `exp(M)` and `D exp(M)[dM]`.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if `m` is not square or `dm` differs in shape.
    pub fn differentiate<T>(&self, m: &DMatrix<T>, dm: &DMatrix<T>) -> Result<ExpmDerivative<T>>
    where
        T: Scalar,
        B: FactorizationBackend<T>,
    {
        let p = m.nrows();
        let aux = self.augmented_exponential(m, dm)?;
        Ok(ExpmDerivative {
            exp_m: block(&aux, (0, 0), (p, p)),
            dexp_m: block(&aux, (0, p), (p, p)),
        })
    }
}

/// `exp(m)` and its derivative along `dm` with the nalgebra backend.
pub fn diff_expm<T: Scalar>(m: &DMatrix<T>, dm: &DMatrix<T>) -> Result<ExpmDerivative<T>> {
    ExpmDifferentiator::new().differentiate(m, dm)
}
