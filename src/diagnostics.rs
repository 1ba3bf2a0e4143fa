// src/diagnostics.rs

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::jacobi::EigenDecomposition;

/// Accuracy metrics for one eigen-decomposition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecompositionReport {
    pub dimension: usize,
    pub rotations: usize,
    pub frobenius_norm: f64,            // ||S||_F of the input
    pub off_diagonal_norm: f64,         // off-diagonal part of ||S||_F
    pub orthogonality_error: f64,       // ||I - V V^T||_F
    pub reconstruction_error_rel: f64,  // ||S - V^T diag(e) V||_F / ||S||_F
    pub trace_gap: f64,                 // |tr(S) - sum(e)|
}

impl DecompositionReport {
    pub fn new(original: &Array2<f64>, decomposition: &EigenDecomposition, rotations: usize) -> Self {
        let view = original.view();
        let vectors = decomposition.eigenvectors.view();
        DecompositionReport {
            dimension: decomposition.len(),
            rotations,
            frobenius_norm: frobenius_norm(&view),
            off_diagonal_norm: off_diagonal_norm(&view),
            orthogonality_error: orthogonality_error(&vectors),
            reconstruction_error_rel: reconstruction_error(&view, decomposition),
            trace_gap: (original.diag().sum() - decomposition.eigenvalues.sum()).abs(),
        }
    }
}

pub fn frobenius_norm(matrix: &ArrayView2<f64>) -> f64 {
    matrix.iter().map(|&x| x * x).sum::<f64>().sqrt()
}

/// Frobenius norm of the entries off the main diagonal.
pub fn off_diagonal_norm(matrix: &ArrayView2<f64>) -> f64 {
    matrix
        .indexed_iter()
        .filter(|((i, j), _)| i != j)
        .map(|(_, &x)| x * x)
        .sum::<f64>()
        .sqrt()
}

/// Computes orthogonality error ||I - V V^T||_F for a matrix holding one vector per row.
pub fn orthogonality_error(vectors: &ArrayView2<f64>) -> f64 {
    let vvt = vectors.dot(&vectors.t());
    let diff = Array2::<f64>::eye(vvt.nrows()) - vvt;
    frobenius_norm(&diff.view())
}

/// Rebuilds `V^T diag(e) V` from a decomposition.
pub fn reconstruct(decomposition: &EigenDecomposition) -> Array2<f64> {
    let v = &decomposition.eigenvectors;
    let scaled = v.t().to_owned() * &decomposition.eigenvalues;
    scaled.dot(v)
}

/// Relative reconstruction error ||S - V^T diag(e) V||_F / ||S||_F.
///
/// Only an exactly zero `S` is special: reconstructed as exactly zero it
/// yields 0, anything else yields infinity. Mismatched dimensions also
/// yield infinity.
pub fn reconstruction_error(original: &ArrayView2<f64>, decomposition: &EigenDecomposition) -> f64 {
    if original.nrows() != decomposition.len() || original.ncols() != decomposition.len() {
        return f64::INFINITY;
    }
    if original.is_empty() {
        return 0.0;
    }

    let diff = original - &reconstruct(decomposition);
    let norm_diff = frobenius_norm(&diff.view());
    let norm_original = frobenius_norm(original);

    if norm_original > 0.0 {
        norm_diff / norm_original
    } else if norm_diff == 0.0 {
        0.0
    } else {
        f64::INFINITY
    }
}
