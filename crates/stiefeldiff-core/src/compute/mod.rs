//! Computation backends.

pub mod backend;

pub use backend::{
    complete_orthonormal_basis, FactorizationBackend, NalgebraBackend, SvdFactors, ThinQr,
};
