//! Ridge regression

use super::Regressor;
use crate::data::{CsrMatrix, FeatureMatrix};
use crate::error::{PredictorError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Lower-triangular `L` with `A = L Lᵀ`, or `None` if `A` is not positive definite
fn cholesky_factor(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Solve symmetric positive-definite `A x = b` by Cholesky decomposition.
/// A near-singular `A` gets a small diagonal jitter and one retry.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    let l = match cholesky_factor(a) {
        Some(l) => l,
        None => {
            let mut a_reg = a.clone();
            let jitter = 1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>() / n.max(1) as f64;
            for k in 0..n {
                a_reg[[k, k]] += jitter;
            }
            cholesky_factor(&a_reg)?
        }
    };

    // L y = b
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Lᵀ x = y
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Gauss-Jordan inverse, used when Cholesky fails
fn matrix_inverse(m: &Array2<f64>) -> Option<Array2<f64>> {
    let n = m.nrows();
    if n != m.ncols() {
        return None;
    }

    let mut aug = Array2::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = m[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        let mut max_row = col;
        for row in col + 1..n {
            if aug[[row, col]].abs() > aug[[max_row, col]].abs() {
                max_row = row;
            }
        }

        if max_row != col {
            for j in 0..2 * n {
                aug.swap([col, j], [max_row, j]);
            }
        }

        if aug[[col, col]].abs() < 1e-10 {
            return None;
        }

        let pivot = aug[[col, col]];
        for j in 0..2 * n {
            aug[[col, j]] /= pivot;
        }

        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                if factor != 0.0 {
                    for j in 0..2 * n {
                        aug[[row, j]] -= factor * aug[[col, j]];
                    }
                }
            }
        }
    }

    Some(aug.slice(ndarray::s![.., n..]).to_owned())
}

/// Solve the regularized system, Cholesky first
fn solve_regularized(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    if let Some(x) = cholesky_solve(a, b) {
        return Ok(x);
    }
    match matrix_inverse(a) {
        Some(inv) => Ok(inv.dot(b)),
        None => Err(PredictorError::ComputationError("Singular matrix".to_string())),
    }
}

/// Outcome of a conjugate gradient solve
struct CgSolution {
    x: Array1<f64>,
    iterations: usize,
    converged: bool,
}

/// Conjugate gradient for a symmetric positive-definite operator, stopping
/// once `||b - A x|| <= tol * ||b||`
fn conjugate_gradient<F>(apply: F, b: &Array1<f64>, tol: f64, max_iter: usize) -> CgSolution
where
    F: Fn(&Array1<f64>) -> Array1<f64>,
{
    let mut x = Array1::zeros(b.len());
    let target = tol * b.dot(b).sqrt();
    let mut r = b.clone();
    let mut p = r.clone();
    let mut rs = r.dot(&r);

    for iteration in 0..max_iter {
        if rs.sqrt() <= target {
            return CgSolution {
                x,
                iterations: iteration,
                converged: true,
            };
        }

        let ap = apply(&p);
        let curvature = p.dot(&ap);
        if curvature <= 0.0 {
            break;
        }
        let step = rs / curvature;
        x.scaled_add(step, &p);
        r.scaled_add(-step, &ap);

        let rs_next = r.dot(&r);
        p = &r + &(&p * (rs_next / rs));
        rs = rs_next;
    }

    CgSolution {
        x,
        iterations: max_iter,
        converged: rs.sqrt() <= target,
    }
}

/// Ridge Regression (L2-regularized linear regression with intercept)
///
/// Minimizes `||y - Xw - b||² + alpha·||w||²`. The intercept is not
/// penalized: features and target are centred before solving.
///
/// Dense input is solved exactly by Cholesky. Sparse input is never
/// densified: the centred normal equations are solved by conjugate gradient
/// using only products with the stored entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: Option<f64>,
    /// L2 regularization strength
    pub alpha: f64,
    /// Relative residual at which conjugate gradient stops
    pub tol: f64,
    /// Conjugate gradient iteration cap, `10 · system size` when `None`
    pub max_iter: Option<usize>,
    pub is_fitted: bool,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            coefficients: None,
            intercept: None,
            alpha,
            tol: 1e-4,
            max_iter: None,
            is_fitted: false,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = Some(max_iter);
        self
    }

    pub fn fit(&mut self, x: &FeatureMatrix, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples != y.len() {
            return Err(PredictorError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(PredictorError::TrainingError(
                "cannot fit ridge on zero rows".to_string(),
            ));
        }
        if self.alpha < 0.0 || !self.alpha.is_finite() {
            return Err(PredictorError::InvalidParameter {
                name: "alpha".to_string(),
                value: self.alpha.to_string(),
                reason: "must be a finite non-negative number".to_string(),
            });
        }

        let y_mean = y.mean().unwrap_or(0.0);
        let y_c = y - y_mean;
        let (coefficients, x_mean) = match x {
            FeatureMatrix::Dense(x) => self.solve_dense(x, &y_c)?,
            FeatureMatrix::Sparse(x) => self.solve_sparse(x, &y_c)?,
        };

        debug!(
            alpha = self.alpha,
            n_samples,
            n_features,
            sparse = x.is_sparse(),
            dual = n_features > n_samples,
            "Fitted ridge"
        );

        self.intercept = Some(y_mean - coefficients.dot(&x_mean));
        self.coefficients = Some(coefficients);
        self.is_fitted = true;
        Ok(self)
    }

    /// Centre explicitly and solve the primal or dual normal equations.
    /// Returns the coefficients and the column means.
    fn solve_dense(&self, x: &Array2<f64>, y_c: &Array1<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
        let (n_samples, n_features) = x.dim();
        let x_mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n_features));
        let x_c = x - &x_mean.view().insert_axis(Axis(0));

        let coefficients = if n_features <= n_samples {
            // primal: (XᵀX + αI) w = Xᵀy
            let mut xtx = x_c.t().dot(&x_c);
            for i in 0..n_features {
                xtx[[i, i]] += self.alpha;
            }
            let xty = x_c.t().dot(y_c);
            solve_regularized(&xtx, &xty)?
        } else {
            // dual: w = Xᵀ (XXᵀ + αI)⁻¹ y
            let mut kernel = x_c.dot(&x_c.t());
            for i in 0..n_samples {
                kernel[[i, i]] += self.alpha;
            }
            let dual = solve_regularized(&kernel, y_c)?;
            x_c.t().dot(&dual)
        };
        Ok((coefficients, x_mean))
    }

    /// Centring stays implicit: `Xc v = X v - (μ·v) 1` and `Xcᵀ u = Xᵀ u - μ Σu`
    fn solve_sparse(&self, x: &CsrMatrix, y_c: &Array1<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
        let (n_samples, n_features) = (x.nrows(), x.ncols());
        let x_mean = x.column_means();
        let alpha = self.alpha;

        let xc_dot = |v: &Array1<f64>| x.dot(v) - x_mean.dot(v);
        let xc_t_dot = |u: &Array1<f64>| x.t_dot(u) - &(&x_mean * u.sum());

        let (coefficients, solution) = if n_features <= n_samples {
            // primal: (XcᵀXc + αI) w = Xcᵀy
            let b = xc_t_dot(y_c);
            let max_iter = self.max_iter.unwrap_or(10 * n_features.max(1));
            let cg = conjugate_gradient(|v| xc_t_dot(&xc_dot(v)) + &(v * alpha), &b, self.tol, max_iter);
            (cg.x.clone(), cg)
        } else {
            // dual: w = Xcᵀ (XcXcᵀ + αI)⁻¹ y
            let max_iter = self.max_iter.unwrap_or(10 * n_samples.max(1));
            let cg = conjugate_gradient(|u| xc_dot(&xc_t_dot(u)) + &(u * alpha), y_c, self.tol, max_iter);
            (xc_t_dot(&cg.x), cg)
        };

        if !solution.converged {
            warn!(
                alpha,
                iterations = solution.iterations,
                tol = self.tol,
                "Ridge conjugate gradient did not converge"
            );
        }
        if coefficients.iter().any(|w| !w.is_finite()) {
            return Err(PredictorError::ComputationError(
                "ridge solve produced non-finite coefficients".to_string(),
            ));
        }
        Ok((coefficients, x_mean))
    }

    pub fn predict(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        match (&self.coefficients, self.is_fitted) {
            (Some(w), true) => {
                if x.ncols() != w.len() {
                    return Err(PredictorError::ShapeError {
                        expected: format!("{} features", w.len()),
                        actual: format!("{} features", x.ncols()),
                    });
                }
                Ok(x.dot(w) + self.intercept.unwrap_or(0.0))
            }
            _ => Err(PredictorError::ModelNotFitted),
        }
    }
}

impl Regressor for RidgeRegression {
    fn name(&self) -> &'static str {
        "ridge"
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &Array1<f64>) -> Result<()> {
        RidgeRegression::fit(self, x, y)?;
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        RidgeRegression::predict(self, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn dense(x: Array2<f64>) -> FeatureMatrix {
        FeatureMatrix::Dense(x)
    }

    fn sparse(x: &Array2<f64>) -> FeatureMatrix {
        FeatureMatrix::Sparse(CsrMatrix::from_dense(x))
    }

    #[test]
    fn test_ridge_recovers_line_with_small_alpha() {
        let x = dense(array![[1.0], [2.0], [3.0], [4.0], [5.0]]);
        let y = array![3.0, 5.0, 7.0, 9.0, 11.0];

        let mut model = RidgeRegression::new(1e-6);
        model.fit(&x, &y).unwrap();

        let w = model.coefficients.as_ref().unwrap();
        assert!((w[0] - 2.0).abs() < 1e-4);
        assert!((model.intercept.unwrap() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_ridge_shrinks_with_large_alpha() {
        let x = dense(array![[1.0], [2.0], [3.0], [4.0]]);
        let y = array![1.0, 2.0, 3.0, 4.0];

        let mut weak = RidgeRegression::new(1e-6);
        let mut strong = RidgeRegression::new(1e4);
        weak.fit(&x, &y).unwrap();
        strong.fit(&x, &y).unwrap();

        let w_weak = weak.coefficients.as_ref().unwrap()[0];
        let w_strong = strong.coefficients.as_ref().unwrap()[0];
        assert!(w_strong.abs() < w_weak.abs());
        // heavy shrinkage collapses to the mean
        let p = strong.predict(&dense(array![[10.0]])).unwrap();
        assert!((p[0] - 2.5).abs() < 0.1);
    }

    #[test]
    fn test_dual_matches_primal() {
        // 3 rows, 4 features forces the dual path
        let x_wide = array![
            [1.0, 0.0, 2.0, 1.0],
            [0.0, 1.0, 1.0, 3.0],
            [2.0, 1.0, 0.0, 1.0]
        ];
        let y = array![1.0, 2.0, 4.0];
        let mut wide = RidgeRegression::new(0.5);
        wide.fit(&dense(x_wide.clone()), &y).unwrap();

        // primal closed form on the same data
        let x_c = &x_wide - &x_wide.mean_axis(Axis(0)).unwrap().insert_axis(Axis(0));
        let y_c = &y - y.mean().unwrap();
        let mut a = x_c.t().dot(&x_c);
        for i in 0..4 {
            a[[i, i]] += 0.5;
        }
        let w = solve_regularized(&a, &x_c.t().dot(&y_c)).unwrap();

        let got = wide.coefficients.as_ref().unwrap();
        for (g, e) in got.iter().zip(w.iter()) {
            assert!((g - e).abs() < 1e-8, "{} vs {}", g, e);
        }
    }

    #[test]
    fn test_collinear_features_still_solve() {
        let x = dense(array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0]]);
        let y = array![1.0, 2.0, 3.0];
        let mut model = RidgeRegression::new(1e-6);
        model.fit(&x, &y).unwrap();
        let p = model.predict(&x).unwrap();
        for (pi, yi) in p.iter().zip(y.iter()) {
            assert!((pi - yi).abs() < 1e-3);
        }
    }

    #[test]
    fn test_predict_before_fit() {
        let model = RidgeRegression::new(1.0);
        assert!(matches!(model.predict(&dense(array![[1.0]])), Err(PredictorError::ModelNotFitted)));
    }

    fn assert_same_fit(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) {
        let mut exact = RidgeRegression::new(alpha);
        let mut iterative = RidgeRegression::new(alpha).with_tol(1e-12);
        exact.fit(&dense(x.clone()), y).unwrap();
        iterative.fit(&sparse(x), y).unwrap();

        let a = exact.coefficients.as_ref().unwrap();
        let b = iterative.coefficients.as_ref().unwrap();
        for (wa, wb) in a.iter().zip(b.iter()) {
            assert!((wa - wb).abs() < 1e-6, "{} vs {}", wa, wb);
        }
        assert!((exact.intercept.unwrap() - iterative.intercept.unwrap()).abs() < 1e-6);
        let pa = exact.predict(&dense(x.clone())).unwrap();
        let pb = iterative.predict(&sparse(x)).unwrap();
        for (u, v) in pa.iter().zip(pb.iter()) {
            assert!((u - v).abs() < 1e-6);
        }
    }

    #[test]
    fn test_sparse_primal_matches_dense() {
        let x = array![
            [1.0, 0.0, 0.0],
            [0.0, 2.0, 0.0],
            [1.0, 0.0, 3.0],
            [0.0, 0.0, 1.0],
            [2.0, 1.0, 0.0],
            [0.0, 0.0, 0.0]
        ];
        let y = array![1.0, 3.0, 2.5, 0.5, 4.0, 0.0];
        assert_same_fit(&x, &y, 1.0);
    }

    #[test]
    fn test_sparse_dual_matches_dense() {
        let x = array![
            [1.0, 0.0, 0.0, 1.0, 0.0],
            [0.0, 1.0, 0.0, 0.0, 2.0],
            [0.0, 0.0, 1.0, 1.0, 0.0]
        ];
        let y = array![2.0, -1.0, 0.5];
        assert_same_fit(&x, &y, 0.5);
    }

    #[test]
    fn test_wide_indicator_block_fits_sparse() {
        // one indicator per row plus a shared one: 2000 columns, never densified
        let n = 400;
        let n_cols = 2000;
        let rows: Vec<Vec<(usize, f64)>> = (0..n).map(|i| vec![(i * 5, 1.0), (n_cols - 1, (i % 2) as f64)]).collect();
        let x = FeatureMatrix::Sparse(CsrMatrix::from_rows(n_cols, rows).unwrap());
        let y: Array1<f64> = (0..n).map(|i| 5.0 + 2.0 * (i % 2) as f64).collect();

        let mut model = RidgeRegression::new(1e-2);
        model.fit(&x, &y).unwrap();
        let p = model.predict(&x).unwrap();
        for (pi, yi) in p.iter().zip(y.iter()) {
            assert!((pi - yi).abs() < 0.05, "{} vs {}", pi, yi);
        }
        assert_eq!(model.coefficients.as_ref().unwrap().len(), n_cols);
    }

    #[test]
    fn test_predict_checks_width() {
        let mut model = RidgeRegression::new(1.0);
        model.fit(&dense(array![[1.0, 0.0], [0.0, 1.0]]), &array![1.0, 2.0]).unwrap();
        let narrow = FeatureMatrix::Sparse(CsrMatrix::zeros(1, 1));
        assert!(matches!(model.predict(&narrow), Err(PredictorError::ShapeError { .. })));
    }
}
