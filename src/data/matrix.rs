//! Feature matrices handed from the column plan to the regressors
//!
//! Word counts and label indicators are mostly zeros, so they are kept in
//! compressed sparse row form. Scaled numeric blocks stay dense. Stacking
//! decides the layout of the combined matrix from its overall density.

use crate::error::{PredictorError, Result};
use ndarray::{concatenate, Array1, Array2, ArrayView2, Axis};

/// Compressed sparse row matrix.
///
/// Column indices within a row are strictly increasing and no stored value is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
}

impl CsrMatrix {
    /// All-zero matrix
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            indptr: vec![0; n_rows + 1],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Build from per-row `(column, value)` entries in any order.
    /// Repeated columns within a row are summed; zeros are not stored.
    pub fn from_rows(n_cols: usize, rows: Vec<Vec<(usize, f64)>>) -> Result<Self> {
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);

        let n_rows = rows.len();
        for mut row in rows {
            row.sort_unstable_by_key(|&(c, _)| c);
            let mut merged: Vec<(usize, f64)> = Vec::with_capacity(row.len());
            for (c, v) in row {
                if c >= n_cols {
                    return Err(PredictorError::ShapeError {
                        expected: format!("column index < {}", n_cols),
                        actual: format!("column index {}", c),
                    });
                }
                match merged.last_mut() {
                    Some(last) if last.0 == c => last.1 += v,
                    _ => merged.push((c, v)),
                }
            }
            for (c, v) in merged {
                if v != 0.0 {
                    indices.push(c);
                    data.push(v);
                }
            }
            indptr.push(indices.len());
        }

        Ok(Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            data,
        })
    }

    pub fn from_dense(x: &Array2<f64>) -> Self {
        let mut indptr = Vec::with_capacity(x.nrows() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for row in x.rows() {
            for (c, &v) in row.iter().enumerate() {
                if v != 0.0 {
                    indices.push(c);
                    data.push(v);
                }
            }
            indptr.push(indices.len());
        }
        Self {
            n_rows: x.nrows(),
            n_cols: x.ncols(),
            indptr,
            indices,
            data,
        }
    }

    pub fn nrows(&self) -> usize {
        self.n_rows
    }

    pub fn ncols(&self) -> usize {
        self.n_cols
    }

    /// Stored (non-zero) entries
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Non-zero `(column, value)` pairs of row `i`, by increasing column
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let (start, end) = (self.indptr[i], self.indptr[i + 1]);
        self.indices[start..end]
            .iter()
            .copied()
            .zip(self.data[start..end].iter().copied())
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        let (start, end) = (self.indptr[i], self.indptr[i + 1]);
        match self.indices[start..end].binary_search(&j) {
            Ok(k) => self.data[start + k],
            Err(_) => 0.0,
        }
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut out = Array2::zeros((self.n_rows, self.n_cols));
        for i in 0..self.n_rows {
            for (c, v) in self.row(i) {
                out[[i, c]] = v;
            }
        }
        out
    }

    /// `X v`
    pub fn dot(&self, v: &Array1<f64>) -> Array1<f64> {
        (0..self.n_rows)
            .map(|i| self.row(i).map(|(c, x)| x * v[c]).sum::<f64>())
            .collect()
    }

    /// `Xᵀ u`
    pub fn t_dot(&self, u: &Array1<f64>) -> Array1<f64> {
        let mut out = Array1::zeros(self.n_cols);
        for i in 0..self.n_rows {
            let ui = u[i];
            if ui == 0.0 {
                continue;
            }
            for (c, x) in self.row(i) {
                out[c] += x * ui;
            }
        }
        out
    }

    pub fn column_means(&self) -> Array1<f64> {
        let mut sums = Array1::zeros(self.n_cols);
        for (&c, &v) in self.indices.iter().zip(&self.data) {
            sums[c] += v;
        }
        if self.n_rows > 0 {
            sums /= self.n_rows as f64;
        }
        sums
    }

    /// Stack matrices with equal row counts left to right
    pub fn hstack(blocks: &[CsrMatrix]) -> Result<Self> {
        let n_rows = blocks.first().map_or(0, |b| b.n_rows);
        if let Some(bad) = blocks.iter().find(|b| b.n_rows != n_rows) {
            return Err(PredictorError::ShapeError {
                expected: format!("{} rows in every block", n_rows),
                actual: format!("{} rows", bad.n_rows),
            });
        }

        let n_cols = blocks.iter().map(|b| b.n_cols).sum();
        let nnz = blocks.iter().map(|b| b.nnz()).sum();
        let mut indptr = Vec::with_capacity(n_rows + 1);
        let mut indices = Vec::with_capacity(nnz);
        let mut data = Vec::with_capacity(nnz);
        indptr.push(0);

        for i in 0..n_rows {
            let mut offset = 0;
            for block in blocks {
                for (c, v) in block.row(i) {
                    indices.push(offset + c);
                    data.push(v);
                }
                offset += block.n_cols;
            }
            indptr.push(indices.len());
        }

        Ok(Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            data,
        })
    }
}

/// Output of a fitted column plan
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureMatrix {
    Dense(Array2<f64>),
    Sparse(CsrMatrix),
}

impl FeatureMatrix {
    pub fn nrows(&self) -> usize {
        match self {
            FeatureMatrix::Dense(x) => x.nrows(),
            FeatureMatrix::Sparse(x) => x.nrows(),
        }
    }

    pub fn ncols(&self) -> usize {
        match self {
            FeatureMatrix::Dense(x) => x.ncols(),
            FeatureMatrix::Sparse(x) => x.ncols(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, FeatureMatrix::Sparse(_))
    }

    /// Entries a sparse layout would store; every cell for dense blocks
    fn stored(&self) -> usize {
        match self {
            FeatureMatrix::Dense(x) => x.len(),
            FeatureMatrix::Sparse(x) => x.nnz(),
        }
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        match self {
            FeatureMatrix::Dense(x) => x[[i, j]],
            FeatureMatrix::Sparse(x) => x.get(i, j),
        }
    }

    /// `X v`
    pub fn dot(&self, v: &Array1<f64>) -> Array1<f64> {
        match self {
            FeatureMatrix::Dense(x) => x.dot(v),
            FeatureMatrix::Sparse(x) => x.dot(v),
        }
    }

    pub fn to_dense(&self) -> Array2<f64> {
        match self {
            FeatureMatrix::Dense(x) => x.clone(),
            FeatureMatrix::Sparse(x) => x.to_dense(),
        }
    }

    /// Stack blocks left to right.
    ///
    /// With at least one sparse block the result is sparse when the share of
    /// stored entries is below `sparse_threshold`, dense otherwise. Dense
    /// blocks count every cell as stored.
    pub fn hstack(blocks: Vec<FeatureMatrix>, sparse_threshold: f64) -> Result<Self> {
        let Some(first) = blocks.first() else {
            return Ok(FeatureMatrix::Dense(Array2::zeros((0, 0))));
        };
        let n_rows = first.nrows();
        if let Some(bad) = blocks.iter().find(|b| b.nrows() != n_rows) {
            return Err(PredictorError::ShapeError {
                expected: format!("{} rows in every block", n_rows),
                actual: format!("{} rows", bad.nrows()),
            });
        }

        let cells: usize = blocks.iter().map(|b| b.nrows() * b.ncols()).sum();
        let stored: usize = blocks.iter().map(|b| b.stored()).sum();
        let any_sparse = blocks.iter().any(|b| b.is_sparse());
        let density = if cells == 0 { 1.0 } else { stored as f64 / cells as f64 };

        if any_sparse && density < sparse_threshold {
            let csr: Vec<CsrMatrix> = blocks
                .into_iter()
                .map(|b| match b {
                    FeatureMatrix::Dense(x) => CsrMatrix::from_dense(&x),
                    FeatureMatrix::Sparse(x) => x,
                })
                .collect();
            return Ok(FeatureMatrix::Sparse(CsrMatrix::hstack(&csr)?));
        }

        let dense: Vec<Array2<f64>> = blocks.iter().map(|b| b.to_dense()).collect();
        let views: Vec<ArrayView2<f64>> = dense.iter().map(|b| b.view()).collect();
        Ok(FeatureMatrix::Dense(concatenate(Axis(1), &views)?))
    }
}

impl From<Array2<f64>> for FeatureMatrix {
    fn from(x: Array2<f64>) -> Self {
        FeatureMatrix::Dense(x)
    }
}

impl From<CsrMatrix> for FeatureMatrix {
    fn from(x: CsrMatrix) -> Self {
        FeatureMatrix::Sparse(x)
    }
}
