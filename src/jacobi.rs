// Cyclic Jacobi eigenvalue algorithm for real symmetric matrices

use log::{debug, trace};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::diagnostics::DecompositionReport;
use crate::error::{PcaError, Result};
use crate::matrix::{ensure_finite, ensure_square, matrix_from_rows};

/// Tuning knobs for [`JacobiEigensolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JacobiConfig {
    /// Upper bound on the number of rotations.
    ///
    /// `None` (the default) runs until every eigenvalue estimate has stopped
    /// changing, with no cap. Setting a limit turns a runaway solve on
    /// non-symmetric input into [`PcaError::RotationLimitExceeded`].
    pub max_rotations: Option<usize>,
}

impl Default for JacobiConfig {
    fn default() -> Self {
        JacobiConfig { max_rotations: None }
    }
}

/// Eigenvalues together with their eigenvectors.
///
/// Row `i` of `eigenvectors` is the unit eigenvector belonging to `eigenvalues[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EigenDecomposition {
    /// Shape: (n)
    pub eigenvalues: Array1<f64>,
    /// Shape: (n, n), one eigenvector per row.
    pub eigenvectors: Array2<f64>,
}

impl EigenDecomposition {
    /// Splits into the `(V, e)` pair.
    pub fn into_parts(self) -> (Array2<f64>, Array1<f64>) {
        (self.eigenvectors, self.eigenvalues)
    }

    /// Number of eigenpairs.
    pub fn len(&self) -> usize {
        self.eigenvalues.len()
    }

    /// True for the decomposition of a 0x0 matrix.
    pub fn is_empty(&self) -> bool {
        self.eigenvalues.is_empty()
    }
}

/// Full eigen-decomposition of a real symmetric matrix by cyclic Jacobi rotations.
///
/// The decomposition runs when the solver is constructed. Each rotation zeroes
/// the largest cached off-diagonal entry; the loop ends once no eigenvalue
/// estimate changes its floating-point value any more (or, earlier, once every
/// off-diagonal entry is exactly zero). There is no epsilon threshold.
///
/// # Caller contract
///
/// The input **must be symmetric**. Symmetry is not checked: only the upper
/// triangle and the diagonal are read, and a non-symmetric input may keep the
/// solver rotating forever. Validate untrusted input yourself, or set
/// [`JacobiConfig::max_rotations`].
///
/// # Examples
///
/// ```
/// use ndarray::array;
/// use jacobi_pca::JacobiEigensolver;
///
/// let s = array![[2.0, 1.0], [1.0, 2.0]];
/// let solver = JacobiEigensolver::new(s).unwrap();
/// let eig = solver.eig_sort();
/// assert!((eig.eigenvalues[0] - 3.0).abs() < 1e-12);
/// assert!((eig.eigenvalues[1] - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct JacobiEigensolver {
    /// Working matrix. Only the upper triangle reflects the rotations until `restore`.
    working: Array2<f64>,
    /// Product of all applied rotations; column `i` is eigenvector `i`.
    accumulator: Array2<f64>,
    /// Converged eigenvalue estimates, in index order.
    eigenvalues: Array1<f64>,
    rotations: usize,
}

impl JacobiEigensolver {
    /// Decomposes `matrix` with the default configuration.
    ///
    /// # Errors
    /// [`PcaError::ShapeMismatch`] if the matrix is not square,
    /// [`PcaError::NonFinite`] on NaN or infinite entries, and
    /// [`PcaError::DegeneratePivot`] if a rotation cannot be formed.
    pub fn new(matrix: Array2<f64>) -> Result<Self> {
        Self::with_config(matrix, &JacobiConfig::default())
    }

    /// Decomposes `matrix` with an explicit configuration.
    pub fn with_config(matrix: Array2<f64>, config: &JacobiConfig) -> Result<Self> {
        let n = ensure_square(&matrix, "Jacobi input")?;
        ensure_finite(&matrix, "Jacobi input")?;

        let mut working = matrix;
        let (accumulator, eigenvalues, rotations) = {
            let mut reduction = Reduction::new(&mut working);
            let rotations = reduction.run(config)?;
            (reduction.accumulator, reduction.eigenvalues, rotations)
        };
        debug!("Jacobi solver converged: n={}, rotations={}", n, rotations);

        Ok(Self {
            working,
            accumulator,
            eigenvalues,
            rotations,
        })
    }

    /// Decomposes a row-major nested array.
    ///
    /// `n` is inferred from the data when `None`; when given, the data must be
    /// exactly `n`×`n`.
    pub fn from_rows(rows: &[Vec<f64>], n: Option<usize>) -> Result<Self> {
        let matrix = matrix_from_rows(rows, n.map(|n| (n, n)))?;
        Self::new(matrix)
    }

    /// Eigenvectors (one per row) and eigenvalues in the order the rotations left them.
    pub fn eig(&self) -> EigenDecomposition {
        EigenDecomposition {
            eigenvalues: self.eigenvalues.clone(),
            eigenvectors: self.accumulator.t().to_owned(),
        }
    }

    /// Same as [`eig`](Self::eig), sorted by eigenvalue, largest first.
    ///
    /// The sort is stable: equal eigenvalues keep their original index order.
    pub fn eig_sort(&self) -> EigenDecomposition {
        let mut order: Vec<usize> = (0..self.eigenvalues.len()).collect();
        order.sort_by(|&a, &b| {
            self.eigenvalues[b]
                .partial_cmp(&self.eigenvalues[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        EigenDecomposition {
            eigenvalues: self.eigenvalues.select(Axis(0), &order),
            eigenvectors: self.accumulator.t().select(Axis(0), &order),
        }
    }

    /// Makes the working matrix symmetric again.
    ///
    /// Rotations only maintain the upper triangle and never write the stored
    /// diagonal. This mirrors the upper triangle into the lower one and puts the
    /// converged eigenvalue estimates on the diagonal, leaving the final
    /// near-diagonal form. Never called by [`eig`](Self::eig) or
    /// [`eig_sort`](Self::eig_sort).
    pub fn restore(&mut self) {
        let n = self.dimension();
        for k in 0..n {
            self.working[[k, k]] = self.eigenvalues[k];
            for l in (k + 1)..n {
                self.working[[l, k]] = self.working[[k, l]];
            }
        }
    }

    /// The working matrix as it currently stands. Symmetric only after [`restore`](Self::restore).
    pub fn working_matrix(&self) -> &Array2<f64> {
        &self.working
    }

    /// Size n of the decomposed matrix.
    pub fn dimension(&self) -> usize {
        self.eigenvalues.len()
    }

    /// Number of rotations the decomposition applied.
    pub fn rotations(&self) -> usize {
        self.rotations
    }

    /// Accuracy summary of this decomposition against the matrix it was built from.
    pub fn report(&self, original: &Array2<f64>) -> DecompositionReport {
        DecompositionReport::new(original, &self.eig(), self.rotations)
    }
}

/// State of one decomposition run. Dropped when the run ends.
struct Reduction<'a> {
    s: &'a mut Array2<f64>,
    accumulator: Array2<f64>,
    eigenvalues: Array1<f64>,
    changed: Vec<bool>,
    /// Number of `true` entries in `changed`.
    state: usize,
    /// `ind[k]`: column (> k) of the largest off-diagonal magnitude in row k.
    ind: Vec<usize>,
    n: usize,
}

impl<'a> Reduction<'a> {
    fn new(s: &'a mut Array2<f64>) -> Self {
        let n = s.nrows();
        let mut reduction = Reduction {
            accumulator: Array2::eye(n),
            eigenvalues: s.diag().to_owned(),
            changed: vec![true; n],
            state: n,
            ind: vec![0; n],
            n,
            s,
        };
        reduction.rebuild_row_maxima();
        reduction
    }

    fn rebuild_row_maxima(&mut self) {
        for k in 0..self.n.saturating_sub(1) {
            self.ind[k] = self.max_index(k);
        }
    }

    /// Requires `k + 1 < n`.
    fn max_index(&self, k: usize) -> usize {
        let mut m = k + 1;
        for i in (k + 2)..self.n {
            if self.s[[k, i]].abs() > self.s[[k, m]].abs() {
                m = i;
            }
        }
        m
    }

    /// Row whose cached maximum is largest. The last row has no entries right of
    /// the diagonal and is never a candidate.
    fn pivot(&self) -> (usize, usize) {
        let mut m = 0;
        for k in 1..self.n - 1 {
            if self.s[[k, self.ind[k]]].abs() > self.s[[m, self.ind[m]]].abs() {
                m = k;
            }
        }
        (m, self.ind[m])
    }

    fn update(&mut self, k: usize, t: f64) {
        let y = self.eigenvalues[k];
        self.eigenvalues[k] = y + t;

        if self.changed[k] && y == self.eigenvalues[k] {
            self.changed[k] = false;
            self.state -= 1;
        } else if !self.changed[k] && y != self.eigenvalues[k] {
            self.changed[k] = true;
            self.state += 1;
        }
    }

    fn rotate(&mut self, cos: f64, sin: f64, a: (usize, usize), b: (usize, usize)) {
        let sa = self.s[[a.0, a.1]];
        let sb = self.s[[b.0, b.1]];
        self.s[[a.0, a.1]] = cos * sa - sin * sb;
        self.s[[b.0, b.1]] = sin * sa + cos * sb;
    }

    fn run(&mut self, config: &JacobiConfig) -> Result<usize> {
        let n = self.n;
        if n < 2 {
            return Ok(0);
        }

        let mut rotations = 0usize;
        while self.state != 0 {
            let (mut k, mut l) = self.pivot();
            if self.s[[k, l]] == 0.0 {
                // The cache can be stale in columns touched by earlier rotations.
                self.rebuild_row_maxima();
                (k, l) = self.pivot();
                if self.s[[k, l]] == 0.0 {
                    debug!(
                        "All off-diagonal entries are zero after {} rotations; {} estimates were still flagged",
                        rotations, self.state
                    );
                    break;
                }
            }

            if let Some(limit) = config.max_rotations {
                if rotations >= limit {
                    return Err(PcaError::RotationLimitExceeded {
                        limit,
                        remaining: self.state,
                    });
                }
            }

            let p = self.s[[k, l]];
            // Halving each estimate first keeps opposite-sign extremes finite.
            let y = self.eigenvalues[l] / 2.0 - self.eigenvalues[k] / 2.0;
            let (p_s, d, r) = rotation_terms(p, y);
            if d == 0.0 || r == 0.0 || !d.is_finite() || !r.is_finite() {
                return Err(PcaError::DegeneratePivot {
                    k,
                    l,
                    pivot: p,
                    half_gap: y,
                });
            }

            let cos = d / r;
            let mut sin = p_s / r;
            let mut t = p * (p_s / d);
            if y < 0.0 {
                sin = -sin;
                t = -t;
            }
            trace!("rotation {}: pivot ({}, {}) = {:e}, t = {:e}", rotations, k, l, p, t);

            self.s[[k, l]] = 0.0;
            self.update(k, -t);
            self.update(l, t);

            // Three disjoint ranges so that no upper-triangle entry is rotated twice.
            for i in 0..k {
                self.rotate(cos, sin, (i, k), (i, l));
            }
            for i in (k + 1)..l {
                self.rotate(cos, sin, (k, i), (i, l));
            }
            for i in (l + 1)..n {
                self.rotate(cos, sin, (k, i), (l, i));
            }

            for i in 0..n {
                let eik = self.accumulator[[i, k]];
                let eil = self.accumulator[[i, l]];
                self.accumulator[[i, k]] = cos * eik - sin * eil;
                self.accumulator[[i, l]] = sin * eik + cos * eil;
            }

            self.ind[k] = self.max_index(k);
            if l + 1 < n {
                self.ind[l] = self.max_index(l);
            }
            rotations += 1;
        }

        Ok(rotations)
    }
}

/// Returns `(p, d, r)` with `d = |y| + hypot(p, y)` and `r = hypot(p, d)`,
/// all three divided by the same power of two.
///
/// The quotients `d / r`, `p / r` and `p / d` do not depend on that factor.
/// It is 1 unless `d` or `r` overflows, in which case everything is
/// recomputed at a quarter of its size. hypot keeps `p^2 + y^2` from
/// underflowing for tiny pivots.
fn rotation_terms(p: f64, y: f64) -> (f64, f64, f64) {
    let d = y.abs() + p.hypot(y);
    let r = p.hypot(d);
    if d.is_finite() && r.is_finite() {
        return (p, d, r);
    }

    let (p, y) = (p * 0.25, y * 0.25);
    let d = y.abs() + p.hypot(y);
    (p, d, p.hypot(d))
}
