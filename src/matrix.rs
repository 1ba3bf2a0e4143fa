//! Conversions and shape checks for the dense matrices used across the crate.

use ndarray::Array2;

use crate::error::{PcaError, Result};

/// Builds a fixed-shape matrix from row-major nested vectors.
///
/// When `expected` is `Some((rows, cols))` the data must have exactly that shape;
/// otherwise the shape is inferred from the number of rows and the length of the
/// first row. Ragged rows are rejected.
pub fn matrix_from_rows(rows: &[Vec<f64>], expected: Option<(usize, usize)>) -> Result<Array2<f64>> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, |r| r.len());

    if let Some((exp_rows, exp_cols)) = expected {
        if exp_rows != n_rows {
            return Err(PcaError::shape(
                "row count",
                format!("{} rows", exp_rows),
                format!("{} rows", n_rows),
            ));
        }
        if n_rows > 0 && exp_cols != n_cols {
            return Err(PcaError::shape(
                "row 0",
                format!("{} columns", exp_cols),
                format!("{} columns", n_cols),
            ));
        }
    }

    for (i, row) in rows.iter().enumerate() {
        if row.len() != n_cols {
            return Err(PcaError::ShapeMismatch {
                what: "ragged row",
                expected: format!("{} columns", n_cols),
                actual: format!("{} columns in row {}", row.len(), i),
            });
        }
    }

    let flat: Vec<f64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
    Array2::from_shape_vec((n_rows, n_cols), flat)
        .map_err(|e| PcaError::shape("row-major buffer", format!("{}x{}", n_rows, n_cols), e))
}

/// Fails unless the matrix is square.
pub fn ensure_square(matrix: &Array2<f64>, what: &'static str) -> Result<usize> {
    let (r, c) = matrix.dim();
    if r != c {
        return Err(PcaError::shape(what, format!("{}x{} (square)", r, r), format!("{}x{}", r, c)));
    }
    Ok(r)
}

/// Fails on the first NaN or infinite entry, reporting its position.
pub fn ensure_finite(matrix: &Array2<f64>, what: &'static str) -> Result<()> {
    match matrix.indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some(((row, col), _)) => Err(PcaError::NonFinite { what, row, col }),
        None => Ok(()),
    }
}
