// src/linalg_backends.rs

use ndarray::Array2;

use crate::error::Result;
use crate::jacobi::{EigenDecomposition, JacobiConfig, JacobiEigensolver};

/// Symmetric eigendecomposition with eigenpairs sorted by eigenvalue, largest first.
///
/// Implementers may assume `matrix` is symmetric.
pub trait SymmetricEigenBackend {
    fn eigh_sorted(&self, matrix: &Array2<f64>) -> Result<EigenDecomposition>;
}

/// Backend running the cyclic Jacobi solver.
#[derive(Debug, Default, Copy, Clone)]
pub struct JacobiBackend {
    pub config: JacobiConfig,
}

impl JacobiBackend {
    pub fn new(config: JacobiConfig) -> Self {
        Self { config }
    }
}

impl SymmetricEigenBackend for JacobiBackend {
    fn eigh_sorted(&self, matrix: &Array2<f64>) -> Result<EigenDecomposition> {
        let solver = JacobiEigensolver::with_config(matrix.clone(), &self.config)?;
        Ok(solver.eig_sort())
    }
}
