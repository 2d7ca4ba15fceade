//! Least-squares regression on small in-memory data sets.
//!
//! Coefficient vectors always end with the intercept: a linear fit is
//! `[slope, intercept]`, a multivariate fit over `n` features has `n + 1`
//! entries.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fewer usable rows than this and training is refused.
pub const MIN_TRAINING_ROWS: usize = 10;

const PIVOT_EPSILON: f64 = 1e-10;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegressionError {
    #[error("At least {min} valid rows are required, got {0}", min = MIN_TRAINING_ROWS)]
    NotEnoughData(usize),
    #[error("Linear regression takes exactly one feature, got {0}")]
    FeatureCount(usize),
    #[error("Every row needs {expected} values, got {got}")]
    RowLength { expected: usize, got: usize },
    #[error("Features are collinear or constant, the system has no unique solution")]
    Singular,
    #[error("Expected {expected} input values, got {got}")]
    InputLength { expected: usize, got: usize },
}

/// Fit quality on the training set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub mse: f64,
    pub rmse: f64,
    pub r2: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    pub coefficients: Vec<f64>,
    pub metrics: Metrics,
    pub rows: usize,
}

impl TrainedModel {
    /// R² clamped to 0..=1, reported as the model's confidence.
    pub fn accuracy(&self) -> f64 {
        self.metrics.r2.clamp(0.0, 1.0)
    }
}

/// Closed-form simple regression of `ys` on `xs`.
pub fn fit_linear(xs: &[f64], ys: &[f64]) -> Result<TrainedModel, RegressionError> {
    if xs.len() != ys.len() {
        return Err(RegressionError::RowLength { expected: ys.len(), got: xs.len() });
    }
    if xs.len() < MIN_TRAINING_ROWS {
        return Err(RegressionError::NotEnoughData(xs.len()));
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        sxy += (x - mean_x) * (y - mean_y);
        sxx += (x - mean_x) * (x - mean_x);
    }
    if sxx.abs() < PIVOT_EPSILON {
        return Err(RegressionError::Singular);
    }
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let predicted: Vec<f64> = xs.iter().map(|x| slope * x + intercept).collect();
    Ok(TrainedModel {
        coefficients: vec![slope, intercept],
        metrics: metrics(ys, &predicted),
        rows: xs.len(),
    })
}

/// Ordinary least squares over `rows` (one value per feature) through the
/// normal equations `XᵀX·b = Xᵀy`, with an intercept column appended.
pub fn fit_multivariate(rows: &[Vec<f64>], ys: &[f64]) -> Result<TrainedModel, RegressionError> {
    if rows.len() != ys.len() {
        return Err(RegressionError::RowLength { expected: ys.len(), got: rows.len() });
    }
    if rows.len() < MIN_TRAINING_ROWS {
        return Err(RegressionError::NotEnoughData(rows.len()));
    }
    let features = rows[0].len();
    if features == 0 {
        return Err(RegressionError::FeatureCount(0));
    }
    if let Some(bad) = rows.iter().find(|row| row.len() != features) {
        return Err(RegressionError::RowLength { expected: features, got: bad.len() });
    }

    let width = features + 1;
    let mut xtx = vec![vec![0.0; width]; width];
    let mut xty = vec![0.0; width];
    for (row, y) in rows.iter().zip(ys) {
        let augmented: Vec<f64> = row.iter().copied().chain(std::iter::once(1.0)).collect();
        for i in 0..width {
            xty[i] += augmented[i] * y;
            for j in 0..width {
                xtx[i][j] += augmented[i] * augmented[j];
            }
        }
    }

    let coefficients = solve(xtx, xty)?;
    let predicted: Vec<f64> = rows.iter().map(|row| evaluate(&coefficients, row)).collect();
    Ok(TrainedModel {
        metrics: metrics(ys, &predicted),
        coefficients,
        rows: rows.len(),
    })
}

/// Weighted sum of `inputs` plus the intercept. Inputs beyond the model's
/// features are ignored; missing ones count as zero.
pub fn evaluate(coefficients: &[f64], inputs: &[f64]) -> f64 {
    let Some((intercept, weights)) = coefficients.split_last() else {
        return 0.0;
    };
    weights.iter().zip(inputs).map(|(w, x)| w * x).sum::<f64>() + intercept
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, RegressionError> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .ok_or(RegressionError::Singular)?;
        if a[pivot][col].abs() < PIVOT_EPSILON {
            return Err(RegressionError::Singular);
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        let pivot_row = a[col].clone();
        let pivot_b = b[col];
        for row in col + 1..n {
            let factor = a[row][col] / pivot_row[col];
            for k in col..n {
                a[row][k] -= factor * pivot_row[k];
            }
            b[row] -= factor * pivot_b;
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}

fn metrics(actual: &[f64], predicted: &[f64]) -> Metrics {
    let n = actual.len().max(1) as f64;
    let mean = actual.iter().sum::<f64>() / n;
    let ss_res: f64 = actual.iter().zip(predicted).map(|(y, p)| (y - p).powi(2)).sum();
    let ss_tot: f64 = actual.iter().map(|y| (y - mean).powi(2)).sum();
    let mse = ss_res / n;
    let r2 = if ss_tot == 0.0 {
        if ss_res == 0.0 { 1.0 } else { 0.0 }
    } else {
        1.0 - ss_res / ss_tot
    };
    Metrics { mse, rmse: mse.sqrt(), r2 }
}
