use serde::{Deserialize, Serialize};

use crate::tfidf::SparseRow;

/// Fitting parameters for [`LogisticRegression`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticParams {
    /// Inverse L2 regularization strength.
    pub c: f64,
    pub max_iter: usize,
    pub learning_rate: f64,
    /// Stop early once the gradient's max component falls below this.
    pub tolerance: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            c: 3.0,
            max_iter: 400,
            learning_rate: 1.0,
            tolerance: 1e-6,
        }
    }
}

pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Binary logistic regression with an L2 penalty and unpenalised intercept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogisticRegression {
    pub weights: Vec<f64>,
    pub intercept: f64,
    /// Iterations actually run during fitting.
    pub n_iter: usize,
}

impl LogisticRegression {
    /// Fit by full-batch gradient descent on
    /// `mean(log_loss) + ||w||^2 / (2 * C * n)`.
    pub fn fit(rows: &[SparseRow], labels: &[u8], n_features: usize, params: LogisticParams) -> Self {
        let n = rows.len().max(1) as f64;
        let mut weights = vec![0.0; n_features];
        let mut intercept = 0.0;
        let mut grad = vec![0.0; n_features];
        let mut n_iter = 0;

        for _ in 0..params.max_iter {
            n_iter += 1;
            grad.iter_mut().for_each(|g| *g = 0.0);
            let mut grad_b = 0.0;

            for (row, &label) in rows.iter().zip(labels) {
                let err = sigmoid(dot(&weights, row) + intercept) - f64::from(label);
                for &(col, x) in row {
                    grad[col] += err * x;
                }
                grad_b += err;
            }

            let reg = 1.0 / (params.c * n);
            let mut max_grad = (grad_b / n).abs();
            for (g, w) in grad.iter_mut().zip(&weights) {
                *g = *g / n + reg * w;
                max_grad = max_grad.max(g.abs());
            }

            for (w, g) in weights.iter_mut().zip(&grad) {
                *w -= params.learning_rate * g;
            }
            intercept -= params.learning_rate * grad_b / n;

            if max_grad < params.tolerance {
                break;
            }
        }

        Self {
            weights,
            intercept,
            n_iter,
        }
    }

    /// Probability of the positive class.
    pub fn predict_proba(&self, row: &SparseRow) -> f64 {
        sigmoid(dot(&self.weights, row) + self.intercept)
    }

    pub fn predict(&self, row: &SparseRow) -> u8 {
        u8::from(self.predict_proba(row) > 0.5)
    }
}

fn dot(weights: &[f64], row: &SparseRow) -> f64 {
    row.iter()
        .filter_map(|&(col, x)| weights.get(col).map(|w| w * x))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_is_stable() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn separates_disjoint_features() {
        let rows = vec![
            vec![(0, 1.0)],
            vec![(0, 1.0)],
            vec![(1, 1.0)],
            vec![(1, 1.0)],
        ];
        let labels = [1, 1, 0, 0];
        let model = LogisticRegression::fit(&rows, &labels, 2, LogisticParams::default());

        assert!(model.predict_proba(&vec![(0, 1.0)]) > 0.7);
        assert!(model.predict_proba(&vec![(1, 1.0)]) < 0.3);
        assert_eq!(model.predict(&vec![(0, 1.0)]), 1);
    }

    #[test]
    fn empty_row_uses_intercept() {
        let rows = vec![vec![(0, 1.0)], vec![(1, 1.0)]];
        let model = LogisticRegression::fit(&rows, &[1, 0], 2, LogisticParams::default());
        let p = model.predict_proba(&Vec::new());
        assert!((p - 0.5).abs() < 1e-6);
    }

    #[test]
    fn fitting_is_deterministic() {
        let rows = vec![vec![(0, 0.6), (1, 0.8)], vec![(1, 1.0)], vec![(0, 1.0)]];
        let labels = [1, 0, 1];
        let a = LogisticRegression::fit(&rows, &labels, 2, LogisticParams::default());
        let b = LogisticRegression::fit(&rows, &labels, 2, LogisticParams::default());
        assert_eq!(a, b);
    }
}
