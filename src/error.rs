//! Error type shared by the eigensolver and the PCA engine.

use thiserror::Error;

/// Everything that can go wrong while decomposing a matrix or running PCA.
///
/// Every variant is a precondition violation detected at the boundary of the
/// failing operation. None of them are retried internally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PcaError {
    /// A matrix (or one of its rows) does not have the dimensions the operation needs.
    #[error("{what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: String,
        actual: String,
    },

    /// The input has no variables or no samples.
    #[error("{what} is empty")]
    EmptyInput { what: &'static str },

    /// NaN or infinity in the input.
    #[error("{what} contains a non-finite value at ({row}, {col})")]
    NonFinite {
        what: &'static str,
        row: usize,
        col: usize,
    },

    /// The rotation for pivot (k, l) has a zero or non-finite denominator.
    #[error("degenerate Jacobi pivot at ({k}, {l}): pivot={pivot}, half gap={half_gap}")]
    DegeneratePivot {
        k: usize,
        l: usize,
        pivot: f64,
        half_gap: f64,
    },

    /// The covariance divisor n - 1 would be zero.
    #[error("covariance needs at least 2 samples, got {samples}")]
    InsufficientSamples { samples: usize },

    /// A reduced-space operation was called before `change_dimension`.
    #[error("`{operation}` requires `change_dimension` to be called first")]
    DimensionNotSet { operation: &'static str },

    /// The target dimension must be at least 1.
    #[error("target dimension must be at least 1, got {requested}")]
    InvalidDimension { requested: usize },

    /// The caller-configured rotation cap was hit before convergence.
    #[error("Jacobi solver hit the rotation limit ({limit}) with {remaining} eigenvalue estimates still moving")]
    RotationLimitExceeded { limit: usize, remaining: usize },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PcaError>;

impl PcaError {
    pub(crate) fn shape(what: &'static str, expected: impl ToString, actual: impl ToString) -> Self {
        PcaError::ShapeMismatch {
            what,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
