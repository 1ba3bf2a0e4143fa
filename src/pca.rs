// Principal component analysis (PCA) on top of the Jacobi eigensolver

use log::{debug, info, warn};
use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use once_cell::unsync::OnceCell;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PcaError, Result};
use crate::jacobi::JacobiConfig;
use crate::linalg_backends::{JacobiBackend, SymmetricEigenBackend};
use crate::matrix::{ensure_finite, matrix_from_rows};

/// Settings for building a [`PcaEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcaConfig {
    /// Configuration handed to the Jacobi solver.
    pub solver: JacobiConfig,
    /// Covariance rows are computed on the rayon pool once the number of
    /// variables reaches this value. Every entry is the same sequential sum on
    /// either path, so the result does not depend on it.
    pub parallel_covariance_threshold: usize,
}

impl Default for PcaConfig {
    fn default() -> Self {
        PcaConfig {
            solver: JacobiConfig::default(),
            parallel_covariance_threshold: 64,
        }
    }
}

/// Serializable snapshot of a fitted engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcaSummary {
    pub n_variables: usize,
    pub n_samples: usize,
    /// Retained dimension, if `change_dimension` has been called.
    pub dimension: Option<usize>,
    /// All eigenvalues of the covariance matrix, largest first.
    pub eigenvalues: Array1<f64>,
    /// Explained-variance ratio for the retained dimension.
    pub similarity: Option<f64>,
}

/// Principal component analysis of a data matrix laid out as
/// m variables (rows) × n samples (columns).
///
/// Construction computes the mean of every variable, the centered data, the
/// Bessel-corrected covariance matrix and its eigenpairs (sorted by eigenvalue,
/// largest first). Choosing a target dimension with
/// [`change_dimension`](Self::change_dimension) projects the centered data onto
/// the leading principal axes; [`apply_pca`](Self::apply_pca) maps the projection
/// back to the original space and [`similarity`](Self::similarity) reports the
/// fraction of variance retained.
///
/// # Call order
///
/// `change_dimension` must be called before `apply_pca`, `similarity` and
/// `transform`; those return [`PcaError::DimensionNotSet`] otherwise.
///
/// # Examples
///
/// ```
/// use ndarray::array;
/// use jacobi_pca::PcaEngine;
///
/// // 2 variables, 4 samples
/// let data = array![[1.0, 2.0, 3.0, 4.0], [2.0, 4.1, 5.9, 8.0]];
/// let mut pca = PcaEngine::new(data.clone()).unwrap();
/// pca.change_dimension(2).unwrap();
/// let restored = pca.apply_pca().unwrap();
/// assert!((restored - &data).iter().all(|d| d.abs() < 1e-9));
/// assert!((pca.similarity().unwrap() - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct PcaEngine {
    /// Original data. Shape: (m, n)
    data: Array2<f64>,
    /// Per-variable mean. Shape: (m)
    mean: Array1<f64>,
    /// Data with the variable means subtracted. Shape: (m, n)
    centered: Array2<f64>,
    /// Sample covariance. Shape: (m, m)
    covariance: Array2<f64>,
    /// Eigenvectors of the covariance, one per row, sorted. Shape: (m, m)
    eigenvectors: Array2<f64>,
    /// Eigenvalues of the covariance, largest first. Shape: (m)
    eigenvalues: Array1<f64>,
    /// Retained dimension p.
    dimension: Option<usize>,
    /// Centered data in the reduced space. Shape: (p, n)
    projected: Option<Array2<f64>>,
    /// Reconstruction in the original space. Shape: (m, n)
    reconstructed: Option<Array2<f64>>,
    similarity: OnceCell<f64>,
}

impl PcaEngine {
    /// Builds the engine with the default configuration.
    ///
    /// * `data` - m variables (rows) × n samples (columns).
    ///
    /// # Errors
    /// Returns an error if the matrix has no variables or no samples, contains a
    /// non-finite value, has fewer than 2 samples, or if the eigen-decomposition
    /// of the covariance matrix fails.
    pub fn new(data: Array2<f64>) -> Result<Self> {
        Self::with_config(data, &PcaConfig::default())
    }

    /// Builds the engine with an explicit configuration.
    pub fn with_config(data: Array2<f64>, config: &PcaConfig) -> Result<Self> {
        Self::with_backend(
            data,
            &JacobiBackend::new(config.solver),
            config.parallel_covariance_threshold,
        )
    }

    /// Builds the engine with any symmetric eigensolver backend.
    pub fn with_backend<B: SymmetricEigenBackend>(
        data: Array2<f64>,
        backend: &B,
        parallel_covariance_threshold: usize,
    ) -> Result<Self> {
        let (m, n) = data.dim();
        if m == 0 {
            return Err(PcaError::EmptyInput { what: "data matrix (no variables)" });
        }
        if n == 0 {
            return Err(PcaError::EmptyInput { what: "data matrix (no samples)" });
        }
        ensure_finite(&data, "data matrix")?;

        let mean = data
            .mean_axis(Axis(1))
            .ok_or(PcaError::EmptyInput { what: "data matrix (no samples)" })?;
        let centered = &data - &mean.view().insert_axis(Axis(1));
        let covariance = covariance_matrix(&centered, parallel_covariance_threshold)?;
        debug!("Covariance trace: {:e}", covariance.diag().sum());

        let decomposition = backend.eigh_sorted(&covariance)?;
        if decomposition.len() != m {
            return Err(PcaError::shape(
                "eigen-decomposition",
                format!("{} eigenpairs", m),
                format!("{} eigenpairs", decomposition.len()),
            ));
        }
        info!("PCA engine ready: {} variables x {} samples", m, n);

        Ok(Self {
            data,
            mean,
            centered,
            covariance,
            eigenvectors: decomposition.eigenvectors,
            eigenvalues: decomposition.eigenvalues,
            dimension: None,
            projected: None,
            reconstructed: None,
            similarity: OnceCell::new(),
        })
    }

    /// Builds the engine from row-major nested vectors (one row per variable).
    ///
    /// `n_variables` and `n_samples` are inferred when `None`; when given they
    /// must match the data.
    pub fn from_rows(
        rows: &[Vec<f64>],
        n_variables: Option<usize>,
        n_samples: Option<usize>,
    ) -> Result<Self> {
        let data = matrix_from_rows(rows, None)?;
        if let Some(m) = n_variables {
            if m != data.nrows() {
                return Err(PcaError::shape(
                    "data matrix variables",
                    format!("{} rows", m),
                    format!("{} rows", data.nrows()),
                ));
            }
        }
        if let Some(n) = n_samples {
            if n != data.ncols() {
                return Err(PcaError::shape(
                    "data matrix samples",
                    format!("{} columns", n),
                    format!("{} columns", data.ncols()),
                ));
            }
        }
        Self::new(data)
    }

    /// Chooses how many principal components to keep and projects the centered
    /// data onto them.
    ///
    /// `p` is clamped to the number of variables; the effective dimension is
    /// returned. All eigenvectors are kept, so the dimension can be raised again
    /// later. Any earlier reconstruction and similarity value is discarded.
    ///
    /// # Errors
    /// [`PcaError::InvalidDimension`] if `p` is 0.
    pub fn change_dimension(&mut self, p: usize) -> Result<usize> {
        if p == 0 {
            return Err(PcaError::InvalidDimension { requested: p });
        }
        let p = p.min(self.n_variables());

        // X_[i][j] = sum_k Z_[i][k] * A_[k][j]
        let projected = self.eigenvectors.slice(s![..p, ..]).dot(&self.centered);

        self.dimension = Some(p);
        self.projected = Some(projected);
        self.reconstructed = None;
        self.similarity = OnceCell::new();
        debug!("PCA dimension set to {} of {}", p, self.n_variables());
        Ok(p)
    }

    /// Maps the projected data back to the original space and adds the mean.
    ///
    /// Exact (to rounding) when every component is kept, a low-rank
    /// approximation otherwise. The result is also available from
    /// [`new_data`](Self::new_data).
    ///
    /// # Errors
    /// [`PcaError::DimensionNotSet`] before `change_dimension`.
    pub fn apply_pca(&mut self) -> Result<&Array2<f64>> {
        let (p, projected) = match (self.dimension, self.projected.as_ref()) {
            (Some(p), Some(projected)) => (p, projected),
            _ => return Err(PcaError::DimensionNotSet { operation: "apply_pca" }),
        };

        // newA[i][j] = sum_k X_[k][j] * Z_[k][i] + M[i]
        let mut reconstructed = self.eigenvectors.slice(s![..p, ..]).t().dot(projected);
        reconstructed += &self.mean.view().insert_axis(Axis(1));

        Ok(&*self.reconstructed.insert(reconstructed))
    }

    /// Explained-variance ratio of the retained components:
    /// sum of the first p eigenvalues over the sum of all eigenvalues.
    ///
    /// Computed on first use and cached until the dimension changes. Data with
    /// zero total variance loses nothing under any projection and reports 1.0.
    ///
    /// # Errors
    /// [`PcaError::DimensionNotSet`] before `change_dimension`.
    pub fn similarity(&self) -> Result<f64> {
        let p = self
            .dimension
            .ok_or(PcaError::DimensionNotSet { operation: "similarity" })?;

        let ratio = *self.similarity.get_or_init(|| {
            let retained: f64 = self.eigenvalues.slice(s![..p]).sum();
            let total = retained + self.eigenvalues.slice(s![p..]).sum();
            if total == 0.0 {
                warn!("Total variance is zero; reporting similarity 1.0");
                1.0
            } else {
                retained / total
            }
        });
        debug!("Similarity at p={}: {}", p, ratio);
        Ok(ratio)
    }

    /// Projects further samples (m variables × k samples) onto the retained axes,
    /// centering them with the mean of the fitted data.
    ///
    /// # Errors
    /// [`PcaError::DimensionNotSet`] before `change_dimension`,
    /// [`PcaError::ShapeMismatch`] if the variable count differs, and
    /// [`PcaError::NonFinite`] on NaN or infinite entries.
    pub fn transform(&self, new_data: &Array2<f64>) -> Result<Array2<f64>> {
        let p = self
            .dimension
            .ok_or(PcaError::DimensionNotSet { operation: "transform" })?;
        if new_data.nrows() != self.n_variables() {
            return Err(PcaError::shape(
                "new data variables",
                format!("{} rows", self.n_variables()),
                format!("{} rows", new_data.nrows()),
            ));
        }
        ensure_finite(new_data, "new data")?;

        let centered = new_data - &self.mean.view().insert_axis(Axis(1));
        Ok(self.eigenvectors.slice(s![..p, ..]).dot(&centered))
    }

    /// Snapshot of the shape, eigenvalues and, once a dimension is set, the similarity.
    pub fn summary(&self) -> PcaSummary {
        PcaSummary {
            n_variables: self.n_variables(),
            n_samples: self.n_samples(),
            dimension: self.dimension,
            eigenvalues: self.eigenvalues.clone(),
            similarity: self.similarity().ok(),
        }
    }

    /// Number of variables m (rows of the data).
    pub fn n_variables(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples n (columns of the data).
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// The data the engine was built from, shape (m, n).
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Per-variable mean, shape (m).
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn centered_data(&self) -> &Array2<f64> {
        &self.centered
    }

    /// Sample covariance (divisor n - 1), shape (m, m).
    pub fn covariance(&self) -> &Array2<f64> {
        &self.covariance
    }

    /// All eigenvalues of the covariance matrix, largest first.
    pub fn eigenvalues(&self) -> &Array1<f64> {
        &self.eigenvalues
    }

    /// All eigenvectors of the covariance matrix, one per row, in eigenvalue order.
    pub fn eigenvectors(&self) -> &Array2<f64> {
        &self.eigenvectors
    }

    /// The retained eigenvectors (first p rows), if a dimension has been chosen.
    pub fn components(&self) -> Option<ArrayView2<'_, f64>> {
        self.dimension.map(|p| self.eigenvectors.slice(s![..p, ..]))
    }

    /// Retained dimension p, `None` before `change_dimension`.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// The principal components of the data, shape (p, n).
    pub fn principal_components(&self) -> Option<&Array2<f64>> {
        self.projected.as_ref()
    }

    /// Same as [`principal_components`](Self::principal_components).
    pub fn projected_data(&self) -> Option<&Array2<f64>> {
        self.projected.as_ref()
    }

    /// The reconstruction from the last [`apply_pca`](Self::apply_pca) call.
    pub fn new_data(&self) -> Option<&Array2<f64>> {
        self.reconstructed.as_ref()
    }
}

/// Bessel-corrected covariance of centered data (variables × samples).
///
/// Each pair (i, j) with j <= i is computed once and mirrored.
pub fn covariance_matrix(centered: &Array2<f64>, parallel_threshold: usize) -> Result<Array2<f64>> {
    let (m, n) = centered.dim();
    if n < 2 {
        return Err(PcaError::InsufficientSamples { samples: n });
    }
    let divisor = (n - 1) as f64;

    let lower_row = |i: usize| -> Vec<f64> {
        let row_i = centered.row(i);
        (0..=i).map(|j| row_i.dot(&centered.row(j)) / divisor).collect()
    };
    let lower: Vec<Vec<f64>> = if m >= parallel_threshold {
        (0..m).into_par_iter().map(lower_row).collect()
    } else {
        (0..m).map(lower_row).collect()
    };

    let mut covariance = Array2::<f64>::zeros((m, m));
    for (i, row) in lower.iter().enumerate() {
        for (j, &c) in row.iter().enumerate() {
            covariance[[i, j]] = c;
            covariance[[j, i]] = c;
        }
    }
    Ok(covariance)
}
