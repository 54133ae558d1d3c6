//! Locally weighted regression smoothing
//!
//! Local-linear fits with tricube distance weights over a sliding window of
//! `max(2, floor(bandwidth * n))` nearest points, followed by two
//! robustness passes that down-weight large residuals with a bisquare.

const MAX_ITERS: usize = 2;
const EPSILON: f64 = 1e-12;

/// Smoothed curve through `points`: one `(x, ŷ)` per distinct x, ascending.
///
/// Non-finite points are ignored. Fitted values of duplicate x are averaged.
pub fn loess(points: &[(f64, f64)], bandwidth: f64) -> Vec<(f64, f64)> {
    let mut data: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if data.is_empty() {
        return Vec::new();
    }
    data.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = data.len();
    let mut ux = 0.0;
    let mut uy = 0.0;
    for (i, (x, y)) in data.iter().enumerate() {
        let k = (i + 1) as f64;
        ux += (x - ux) / k;
        uy += (y - uy) / k;
    }
    let xv: Vec<f64> = data.iter().map(|(x, _)| x - ux).collect();
    let yv: Vec<f64> = data.iter().map(|(_, y)| y - uy).collect();

    let bw = ((bandwidth * n as f64).floor() as usize).max(2).min(n);
    let mut yhat = vec![0.0; n];
    let mut residuals = vec![0.0; n];
    let mut robust_weights = vec![1.0; n];

    for iter in 0..=MAX_ITERS {
        let mut interval = (0usize, bw - 1);

        for i in 0..n {
            let dx = xv[i];
            let (i0, i1) = interval;
            let edge = if dx - xv[i0] > xv[i1] - dx { i0 } else { i1 };
            let span = (xv[edge] - dx).abs();
            let denom = 1.0 / if span == 0.0 { 1.0 } else { span };

            let (mut w_sum, mut x_sum, mut y_sum, mut xy_sum, mut x2_sum) = (0.0, 0.0, 0.0, 0.0, 0.0);
            for k in i0..=i1 {
                let xk = xv[k];
                let yk = yv[k];
                let w = tricube((dx - xk).abs() * denom) * robust_weights[k];
                let xkw = xk * w;
                w_sum += w;
                x_sum += xkw;
                y_sum += yk * w;
                xy_sum += yk * xkw;
                x2_sum += xk * xkw;
            }

            let (intercept, slope) = ols(x_sum / w_sum, y_sum / w_sum, xy_sum / w_sum, x2_sum / w_sum);
            yhat[i] = intercept + slope * dx;
            residuals[i] = (yv[i] - yhat[i]).abs();
            update_interval(&xv, i + 1, &mut interval);
        }

        if iter == MAX_ITERS {
            break;
        }

        let median_residual = median(&residuals);
        if median_residual.abs() < EPSILON {
            break;
        }

        for (weight, residual) in robust_weights.iter_mut().zip(&residuals) {
            let arg = residual / (6.0 * median_residual);
            *weight = if arg >= 1.0 {
                EPSILON
            } else {
                let w = 1.0 - arg * arg;
                w * w
            };
        }
    }

    collapse_duplicates(&xv, &yhat, ux, uy)
}

fn tricube(x: f64) -> f64 {
    let t = 1.0 - x * x * x;
    t * t * t
}

/// Intercept and slope from weighted means
fn ols(ux: f64, uy: f64, uxy: f64, ux2: f64) -> (f64, f64) {
    let delta = ux2 - ux * ux;
    let slope = if delta.abs() < 1e-24 { 0.0 } else { (uxy - ux * uy) / delta };
    (uy - slope * ux, slope)
}

/// Slide the window right while the next point is no farther than the
/// current left edge. Equal distances move too, so duplicate x cannot stall it.
fn update_interval(xv: &[f64], i: usize, interval: &mut (usize, usize)) {
    let mut right = interval.1 + 1;
    if right >= xv.len() {
        return;
    }
    let val = xv[i];
    let mut left = interval.0;
    while i > left && xv[right] - val <= val - xv[left] {
        left += 1;
        interval.0 = left;
        interval.1 = right;
        right += 1;
        if right >= xv.len() {
            break;
        }
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

fn collapse_duplicates(xv: &[f64], yhat: &[f64], ux: f64, uy: f64) -> Vec<(f64, f64)> {
    let mut out: Vec<(f64, f64)> = Vec::new();
    let mut count = 0usize;

    for (x, y) in xv.iter().zip(yhat) {
        let v = x + ux;
        match out.last_mut() {
            Some(prev) if prev.0 == v => {
                count += 1;
                prev.1 += (y - prev.1) / (count + 1) as f64;
            }
            _ => {
                count = 0;
                out.push((v, *y));
            }
        }
    }

    for point in &mut out {
        point.1 += uy;
    }
    out
}
