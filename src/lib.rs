// Principal component analysis (PCA) on a cyclic Jacobi eigensolver

#![doc = include_str!("../README.md")]

pub mod diagnostics;
pub mod error;
pub mod jacobi;
pub mod linalg_backends;
pub mod matrix;
pub mod pca;

pub use error::{PcaError, Result};
pub use jacobi::{EigenDecomposition, JacobiConfig, JacobiEigensolver};
pub use linalg_backends::{JacobiBackend, SymmetricEigenBackend};
pub use pca::{PcaConfig, PcaEngine, PcaSummary};
