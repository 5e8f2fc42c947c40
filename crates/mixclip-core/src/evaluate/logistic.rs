//! L2-regularized logistic regression trained with L-BFGS.
//!
//! Two classes use a single sigmoid weight vector; more classes use a
//! multinomial softmax. The objective is
//! `C * sum(log_loss) + 0.5 * ||W||^2` with an unpenalized intercept.

use std::collections::VecDeque;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::config::LogisticConfig;
use crate::error::PipelineError;

use super::classifier::{check_training_input, not_fitted, Classifier};

/// Number of correction pairs kept by L-BFGS.
const HISTORY: usize = 10;
/// Maximum backtracking halvings per line search.
const MAX_LINE_SEARCH: usize = 50;
/// Armijo sufficient-decrease constant.
const ARMIJO_C1: f64 = 1e-4;

#[derive(Debug, Clone)]
struct LinearModel {
    /// One row per output (1 for binary, `n_classes` otherwise)
    weights: Array2<f64>,
    intercepts: Array1<f64>,
    n_classes: usize,
}

/// Logistic regression classifier.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    config: LogisticConfig,
    model: Option<LinearModel>,
    iterations: usize,
    converged: bool,
}

impl LogisticRegression {
    pub fn new(config: LogisticConfig) -> Self {
        Self {
            config,
            model: None,
            iterations: 0,
            converged: false,
        }
    }

    /// Optimizer iterations used by the last `fit`.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Whether the last `fit` reached the gradient tolerance.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Raw decision values, `n_samples × outputs`.
    pub fn decision_function(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, PipelineError> {
        let model = self.model.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        if x.ncols() != model.weights.ncols() {
            return Err(PipelineError::Evaluation(format!(
                "expected {} features, got {}",
                model.weights.ncols(),
                x.ncols()
            )));
        }
        Ok(x.dot(&model.weights.t()) + &model.intercepts)
    }
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &'static str {
        "logistic_regression"
    }

    fn fit(
        &mut self,
        x: ArrayView2<f64>,
        y: &[usize],
        n_classes: usize,
    ) -> Result<(), PipelineError> {
        check_training_input(&x, y, n_classes)?;

        let d = x.ncols();
        let outputs = if n_classes == 2 { 1 } else { n_classes };
        let c = self.config.c;

        let objective = |theta: &[f64], grad: &mut [f64]| -> f64 {
            if outputs == 1 {
                binary_objective(x, y, c, theta, grad)
            } else {
                multinomial_objective(x, y, c, outputs, theta, grad)
            }
        };

        let outcome = minimize(
            objective,
            vec![0.0; outputs * (d + 1)],
            self.config.max_iter,
            self.config.tol,
        );

        if !outcome.converged {
            tracing::warn!(
                "Logistic regression did not converge in {} iterations; consider raising max_iter",
                outcome.iterations
            );
        }

        let (w, b) = outcome.x.split_at(outputs * d);
        let weights = Array2::from_shape_vec((outputs, d), w.to_vec())
            .map_err(|e| PipelineError::Evaluation(e.to_string()))?;

        self.iterations = outcome.iterations;
        self.converged = outcome.converged;
        self.model = Some(LinearModel {
            weights,
            intercepts: Array1::from(b.to_vec()),
            n_classes,
        });
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Vec<usize>, PipelineError> {
        let scores = self.decision_function(x)?;
        let model = self.model.as_ref().ok_or_else(|| not_fitted(self.name()))?;

        if model.n_classes == 2 {
            return Ok(scores.column(0).iter().map(|&z| usize::from(z > 0.0)).collect());
        }
        Ok(scores.rows().into_iter().map(argmax).collect())
    }
}

fn argmax(row: ArrayView1<f64>) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = i;
        }
    }
    best
}

/// `log(1 + exp(z))` without overflow.
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn binary_objective(
    x: ArrayView2<f64>,
    y: &[usize],
    c: f64,
    theta: &[f64],
    grad: &mut [f64],
) -> f64 {
    let d = x.ncols();
    let w = ArrayView1::from(&theta[..d]);
    let b = theta[d];

    let z = x.dot(&w) + b;
    let mut loss = 0.0;
    let mut residual = Array1::<f64>::zeros(y.len());
    for (i, (&zi, &yi)) in z.iter().zip(y).enumerate() {
        let target = yi as f64;
        loss += softplus(zi) - target * zi;
        residual[i] = sigmoid(zi) - target;
    }

    let gw = x.t().dot(&residual) * c + w;
    for (dst, src) in grad[..d].iter_mut().zip(gw.iter()) {
        *dst = *src;
    }
    grad[d] = c * residual.sum();

    c * loss + 0.5 * w.dot(&w)
}

fn multinomial_objective(
    x: ArrayView2<f64>,
    y: &[usize],
    c: f64,
    k: usize,
    theta: &[f64],
    grad: &mut [f64],
) -> f64 {
    let d = x.ncols();
    let (w_flat, b_flat) = theta.split_at(k * d);
    let Ok(w) = ArrayView2::from_shape((k, d), w_flat) else {
        return f64::NAN;
    };
    let b = ArrayView1::from(b_flat);

    let mut probs = x.dot(&w.t()) + &b;
    let mut loss = 0.0;
    for (mut row, &label) in probs.axis_iter_mut(Axis(0)).zip(y) {
        let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        let lse = max + row.iter().map(|&v| (v - max).exp()).sum::<f64>().ln();
        loss += lse - row[label];
        row.mapv_inplace(|v| (v - lse).exp());
        row[label] -= 1.0;
    }

    let gw = probs.t().dot(&x) * c + &w;
    let gb = probs.sum_axis(Axis(0)) * c;
    for (dst, src) in grad[..k * d].iter_mut().zip(gw.iter()) {
        *dst = *src;
    }
    for (dst, src) in grad[k * d..].iter_mut().zip(gb.iter()) {
        *dst = *src;
    }

    c * loss + 0.5 * w.iter().map(|v| v * v).sum::<f64>()
}

struct Outcome {
    x: Vec<f64>,
    iterations: usize,
    converged: bool,
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |m, x| m.max(x.abs()))
}

/// Limited-memory BFGS with backtracking Armijo line search.
///
/// `f` returns the objective and writes the gradient into its second
/// argument. Stops when the largest gradient component is within `tol`,
/// when the relative objective decrease stalls, or after `max_iter` steps.
fn minimize<F>(mut f: F, x0: Vec<f64>, max_iter: usize, tol: f64) -> Outcome
where
    F: FnMut(&[f64], &mut [f64]) -> f64,
{
    let n = x0.len();
    let ftol = 64.0 * f64::EPSILON;

    let mut x = x0;
    let mut g = vec![0.0; n];
    let mut fx = f(&x, &mut g);

    let mut history: VecDeque<(Vec<f64>, Vec<f64>, f64)> = VecDeque::with_capacity(HISTORY);
    let mut x_new = vec![0.0; n];
    let mut g_new = vec![0.0; n];

    for iter in 0..max_iter {
        if max_abs(&g) <= tol {
            return Outcome {
                x,
                iterations: iter,
                converged: true,
            };
        }

        // Two-loop recursion for d = -H g
        let mut q = g.clone();
        let mut coeffs = Vec::with_capacity(history.len());
        for (s, yv, rho) in history.iter().rev() {
            let a = rho * dot(s, &q);
            for (qi, yi) in q.iter_mut().zip(yv) {
                *qi -= a * yi;
            }
            coeffs.push(a);
        }
        if let Some((s, yv, _)) = history.back() {
            let scale = dot(s, yv) / dot(yv, yv);
            q.iter_mut().for_each(|v| *v *= scale);
        }
        for ((s, yv, rho), a) in history.iter().zip(coeffs.iter().rev()) {
            let b = rho * dot(yv, &q);
            for (qi, si) in q.iter_mut().zip(s) {
                *qi += si * (a - b);
            }
        }
        let mut direction: Vec<f64> = q.iter().map(|v| -v).collect();

        let mut slope = dot(&direction, &g);
        if slope >= 0.0 {
            history.clear();
            direction = g.iter().map(|v| -v).collect();
            slope = -dot(&g, &g);
        }

        let mut step = if history.is_empty() {
            (1.0 / dot(&g, &g).sqrt()).min(1.0)
        } else {
            1.0
        };

        let mut accepted = None;
        for _ in 0..MAX_LINE_SEARCH {
            for i in 0..n {
                x_new[i] = x[i] + step * direction[i];
            }
            let f_trial = f(&x_new, &mut g_new);
            if f_trial.is_finite() && f_trial <= fx + ARMIJO_C1 * step * slope {
                accepted = Some(f_trial);
                break;
            }
            step *= 0.5;
        }

        let Some(f_next) = accepted else {
            if history.is_empty() {
                tracing::debug!("L-BFGS line search failed at iteration {}", iter);
                return Outcome {
                    x,
                    iterations: iter,
                    converged: false,
                };
            }
            history.clear();
            continue;
        };

        let s: Vec<f64> = x_new.iter().zip(&x).map(|(a, b)| a - b).collect();
        let yv: Vec<f64> = g_new.iter().zip(&g).map(|(a, b)| a - b).collect();
        let sy = dot(&s, &yv);
        if sy > 1e-10 {
            if history.len() == HISTORY {
                history.pop_front();
            }
            history.push_back((s, yv, 1.0 / sy));
        }

        let decrease = (fx - f_next) / fx.abs().max(f_next.abs()).max(1.0);
        std::mem::swap(&mut x, &mut x_new);
        std::mem::swap(&mut g, &mut g_new);
        fx = f_next;

        if decrease <= ftol {
            return Outcome {
                x,
                iterations: iter + 1,
                converged: true,
            };
        }
    }

    let converged = max_abs(&g) <= tol;
    Outcome {
        x,
        iterations: max_iter,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_blobs() -> (Array2<f64>, Vec<usize>) {
        let x = array![
            [0.0, 0.1],
            [0.2, -0.1],
            [-0.1, 0.0],
            [0.1, 0.2],
            [3.0, 3.1],
            [3.2, 2.9],
            [2.9, 3.0],
            [3.1, 3.2],
        ];
        (x, vec![0, 0, 0, 0, 1, 1, 1, 1])
    }

    #[test]
    fn test_minimize_quadratic() {
        // f(x) = (x0 - 3)^2 + 2 (x1 + 1)^2
        let outcome = minimize(
            |x, g| {
                g[0] = 2.0 * (x[0] - 3.0);
                g[1] = 4.0 * (x[1] + 1.0);
                (x[0] - 3.0).powi(2) + 2.0 * (x[1] + 1.0).powi(2)
            },
            vec![0.0, 0.0],
            100,
            1e-8,
        );
        assert!(outcome.converged);
        assert!((outcome.x[0] - 3.0).abs() < 1e-5);
        assert!((outcome.x[1] + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_binary_separable() {
        let (x, y) = two_blobs();
        let mut clf = LogisticRegression::new(LogisticConfig::default());
        clf.fit(x.view(), &y, 2).unwrap();
        assert_eq!(clf.predict(x.view()).unwrap(), y);
        let unseen = array![[0.05, 0.05], [3.05, 3.05]];
        assert_eq!(clf.predict(unseen.view()).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_multinomial_three_classes() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.2],
            [5.0, 0.0],
            [5.1, 0.2],
            [0.0, 5.0],
            [0.2, 5.1],
        ];
        let y = vec![0, 0, 1, 1, 2, 2];
        let mut clf = LogisticRegression::new(LogisticConfig::default());
        clf.fit(x.view(), &y, 3).unwrap();
        assert_eq!(clf.predict(x.view()).unwrap(), y);
        assert_eq!(clf.decision_function(x.view()).unwrap().ncols(), 3);
    }

    #[test]
    fn test_iteration_cap_still_fits() {
        let (x, y) = two_blobs();
        let mut clf = LogisticRegression::new(LogisticConfig {
            max_iter: 1,
            ..Default::default()
        });
        clf.fit(x.view(), &y, 2).unwrap();
        assert!(clf.iterations() <= 1);
        assert_eq!(clf.predict(x.view()).unwrap().len(), 8);
    }

    #[test]
    fn test_predict_before_fit_is_error() {
        let clf = LogisticRegression::new(LogisticConfig::default());
        assert!(clf.predict(array![[1.0, 2.0]].view()).is_err());
    }

    #[test]
    fn test_softplus_is_stable() {
        assert!((softplus(0.0) - 2f64.ln()).abs() < 1e-12);
        assert!((softplus(800.0) - 800.0).abs() < 1e-9);
        assert!(softplus(-800.0) >= 0.0);
    }
}
