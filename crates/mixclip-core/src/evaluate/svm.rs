//! RBF-kernel support vector classifier.
//!
//! Each pair of classes gets a binary C-SVC solved by SMO with
//! maximal-violating-pair working set selection. Prediction is by
//! one-vs-one voting; ties go to the lower class index.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::config::SvmConfig;
use crate::error::PipelineError;

use super::classifier::{check_training_input, not_fitted, Classifier};

/// Floor for a non-positive curvature in the two-variable subproblem.
const TAU: f64 = 1e-12;

#[derive(Debug, Clone)]
struct BinaryModel {
    positive: usize,
    negative: usize,
    support_vectors: Array2<f64>,
    /// `alpha_i * y_i` per support vector
    coefficients: Array1<f64>,
    rho: f64,
}

#[derive(Debug, Clone)]
struct FittedSvm {
    gamma: f64,
    n_features: usize,
    n_classes: usize,
    models: Vec<BinaryModel>,
}

/// Support vector classifier with an RBF kernel.
#[derive(Debug, Clone)]
pub struct SupportVectorClassifier {
    config: SvmConfig,
    fitted: Option<FittedSvm>,
}

impl SupportVectorClassifier {
    pub fn new(config: SvmConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    /// Kernel width used by the last `fit`.
    pub fn gamma(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.gamma)
    }

    /// Total support vectors across all pairwise models.
    pub fn n_support(&self) -> usize {
        self.fitted
            .as_ref()
            .map_or(0, |f| f.models.iter().map(|m| m.coefficients.len()).sum())
    }
}

/// `1 / (n_features * Var(X))` over every entry of `x`; 1.0 for constant data.
pub fn scale_gamma(x: &ArrayView2<f64>) -> f64 {
    let n = x.len() as f64;
    if n == 0.0 {
        return 1.0;
    }
    let mean = x.sum() / n;
    let var = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    if var > 0.0 {
        1.0 / (x.ncols() as f64 * var)
    } else {
        1.0
    }
}

fn rbf(a: ArrayView1<f64>, b: ArrayView1<f64>, gamma: f64) -> f64 {
    let sq: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();
    (-gamma * sq).exp()
}

fn kernel_matrix(x: &Array2<f64>, gamma: f64) -> Array2<f64> {
    let n = x.nrows();
    let norms: Vec<f64> = x.rows().into_iter().map(|r| r.dot(&r)).collect();
    let gram = x.dot(&x.t());
    let mut k = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in i..n {
            let sq = (norms[i] + norms[j] - 2.0 * gram[[i, j]]).max(0.0);
            let v = (-gamma * sq).exp();
            k[[i, j]] = v;
            k[[j, i]] = v;
        }
    }
    k
}

/// Solve the binary dual problem. `y` holds +1/-1.
///
/// Returns the dual coefficients and the offset `rho` so that the decision
/// value is `sum(alpha_i y_i K(x_i, x)) - rho`.
fn smo(k: &Array2<f64>, y: &[f64], c: f64, tol: f64, max_iter: usize) -> (Vec<f64>, f64) {
    let n = y.len();
    let mut alpha = vec![0.0; n];
    // Gradient of 0.5 a'Qa - e'a with Q_ij = y_i y_j K_ij
    let mut grad = vec![-1.0; n];

    let in_up = |a: f64, yt: f64| (yt > 0.0 && a < c) || (yt < 0.0 && a > 0.0);
    let in_low = |a: f64, yt: f64| (yt > 0.0 && a > 0.0) || (yt < 0.0 && a < c);

    let mut iter = 0;
    while iter < max_iter {
        let mut i = None;
        let mut g_max = f64::NEG_INFINITY;
        let mut j = None;
        let mut g_min = f64::INFINITY;
        for t in 0..n {
            let v = -y[t] * grad[t];
            if in_up(alpha[t], y[t]) && v > g_max {
                g_max = v;
                i = Some(t);
            }
            if in_low(alpha[t], y[t]) && v < g_min {
                g_min = v;
                j = Some(t);
            }
        }

        let (Some(i), Some(j)) = (i, j) else { break };
        if g_max - g_min < tol {
            break;
        }

        let (old_ai, old_aj) = (alpha[i], alpha[j]);
        let quad = {
            let q = k[[i, i]] + k[[j, j]] - 2.0 * k[[i, j]];
            if q > 0.0 {
                q
            } else {
                TAU
            }
        };

        if y[i] != y[j] {
            let delta = (-grad[i] - grad[j]) / quad;
            let diff = alpha[i] - alpha[j];
            alpha[i] += delta;
            alpha[j] += delta;
            if diff > 0.0 {
                if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = diff;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = -diff;
            }
            if diff > 0.0 {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = c - diff;
                }
            } else if alpha[j] > c {
                alpha[j] = c;
                alpha[i] = c + diff;
            }
        } else {
            let delta = (grad[i] - grad[j]) / quad;
            let sum = alpha[i] + alpha[j];
            alpha[i] -= delta;
            alpha[j] += delta;
            if sum > c {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = sum - c;
                }
            } else if alpha[j] < 0.0 {
                alpha[j] = 0.0;
                alpha[i] = sum;
            }
            if sum > c {
                if alpha[j] > c {
                    alpha[j] = c;
                    alpha[i] = sum - c;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = sum;
            }
        }

        let (di, dj) = (alpha[i] - old_ai, alpha[j] - old_aj);
        for t in 0..n {
            grad[t] += y[t] * (y[i] * k[[t, i]] * di + y[j] * k[[t, j]] * dj);
        }
        iter += 1;
    }

    if iter >= max_iter {
        tracing::warn!("SMO reached max_iter ({}) before convergence", max_iter);
    }

    let mut upper = f64::INFINITY;
    let mut lower = f64::NEG_INFINITY;
    let mut free_sum = 0.0;
    let mut free_count = 0usize;
    for t in 0..n {
        let yg = y[t] * grad[t];
        if alpha[t] >= c {
            if y[t] < 0.0 {
                upper = upper.min(yg);
            } else {
                lower = lower.max(yg);
            }
        } else if alpha[t] <= 0.0 {
            if y[t] > 0.0 {
                upper = upper.min(yg);
            } else {
                lower = lower.max(yg);
            }
        } else {
            free_sum += yg;
            free_count += 1;
        }
    }
    let rho = if free_count > 0 {
        free_sum / free_count as f64
    } else {
        (upper + lower) / 2.0
    };

    (alpha, rho)
}

impl BinaryModel {
    fn decision(&self, row: ArrayView1<f64>, gamma: f64) -> f64 {
        self.support_vectors
            .rows()
            .into_iter()
            .zip(self.coefficients.iter())
            .map(|(sv, &coef)| coef * rbf(sv, row, gamma))
            .sum::<f64>()
            - self.rho
    }
}

impl Classifier for SupportVectorClassifier {
    fn name(&self) -> &'static str {
        "svm"
    }

    fn fit(
        &mut self,
        x: ArrayView2<f64>,
        y: &[usize],
        n_classes: usize,
    ) -> Result<(), PipelineError> {
        check_training_input(&x, y, n_classes)?;
        let gamma = self.config.gamma.unwrap_or_else(|| scale_gamma(&x));
        let c = self.config.c;

        let mut models = Vec::new();
        for positive in 0..n_classes {
            for negative in (positive + 1)..n_classes {
                let indices: Vec<usize> = (0..y.len())
                    .filter(|&i| y[i] == positive || y[i] == negative)
                    .collect();
                if indices.is_empty() {
                    continue;
                }
                let sub_x = x.select(Axis(0), &indices);
                let sub_y: Vec<f64> = indices
                    .iter()
                    .map(|&i| if y[i] == positive { 1.0 } else { -1.0 })
                    .collect();

                let kernel = kernel_matrix(&sub_x, gamma);
                let (alpha, rho) =
                    smo(&kernel, &sub_y, c, self.config.tol, self.config.max_iter);

                let support: Vec<usize> = (0..alpha.len()).filter(|&t| alpha[t] > 0.0).collect();
                let coefficients: Array1<f64> =
                    support.iter().map(|&t| alpha[t] * sub_y[t]).collect();
                tracing::trace!(
                    "SVM {} vs {}: {} support vectors",
                    positive,
                    negative,
                    support.len()
                );

                models.push(BinaryModel {
                    positive,
                    negative,
                    support_vectors: sub_x.select(Axis(0), &support),
                    coefficients,
                    rho,
                });
            }
        }

        self.fitted = Some(FittedSvm {
            gamma,
            n_features: x.ncols(),
            n_classes,
            models,
        });
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Vec<usize>, PipelineError> {
        let fitted = self.fitted.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        if x.ncols() != fitted.n_features {
            return Err(PipelineError::Evaluation(format!(
                "expected {} features, got {}",
                fitted.n_features,
                x.ncols()
            )));
        }

        let predictions = x
            .rows()
            .into_iter()
            .map(|row| {
                let mut votes = vec![0usize; fitted.n_classes];
                for model in &fitted.models {
                    if model.decision(row, fitted.gamma) > 0.0 {
                        votes[model.positive] += 1;
                    } else {
                        votes[model.negative] += 1;
                    }
                }
                let mut best = 0;
                for (class, &v) in votes.iter().enumerate() {
                    if v > votes[best] {
                        best = class;
                    }
                }
                best
            })
            .collect();
        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_scale_gamma() {
        let x = array![[0.0, 2.0], [2.0, 0.0]];
        // mean 1, variance 1, two features
        assert!((scale_gamma(&x.view()) - 0.5).abs() < 1e-12);
        assert_eq!(scale_gamma(&Array2::<f64>::ones((2, 2)).view()), 1.0);
    }

    #[test]
    fn test_kernel_matrix_matches_rbf() {
        let x = array![[0.0, 1.0], [1.0, 1.0], [3.0, -1.0]];
        let k = kernel_matrix(&x, 0.3);
        for i in 0..3 {
            assert!((k[[i, i]] - 1.0).abs() < 1e-12);
            for j in 0..3 {
                let expected = rbf(x.row(i), x.row(j), 0.3);
                assert!((k[[i, j]] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_binary_separable() {
        let x = array![
            [0.0, 0.0],
            [0.2, 0.1],
            [0.1, -0.2],
            [2.0, 2.0],
            [2.1, 1.8],
            [1.9, 2.2],
        ];
        let y = vec![0, 0, 0, 1, 1, 1];
        let mut svm = SupportVectorClassifier::new(SvmConfig::default());
        svm.fit(x.view(), &y, 2).unwrap();
        assert_eq!(svm.predict(x.view()).unwrap(), y);
        assert!(svm.n_support() > 0);
        assert!(svm.gamma().unwrap() > 0.0);
    }

    #[test]
    fn test_nonlinear_ring() {
        // Inner cluster vs. four surrounding points: not linearly separable
        let x = array![
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [-0.1, 0.0],
            [2.0, 0.0],
            [-2.0, 0.0],
            [0.0, 2.0],
            [0.0, -2.0],
        ];
        let y = vec![0, 0, 0, 0, 1, 1, 1, 1];
        let mut svm = SupportVectorClassifier::new(SvmConfig {
            c: 10.0,
            gamma: Some(1.0),
            ..Default::default()
        });
        svm.fit(x.view(), &y, 2).unwrap();
        assert_eq!(svm.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn test_three_class_voting() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [4.0, 0.0],
            [4.1, 0.1],
            [0.0, 4.0],
            [0.1, 4.1],
        ];
        let y = vec![0, 0, 1, 1, 2, 2];
        let mut svm = SupportVectorClassifier::new(SvmConfig {
            c: 10.0,
            gamma: Some(0.5),
            ..Default::default()
        });
        svm.fit(x.view(), &y, 3).unwrap();
        assert_eq!(svm.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn test_feature_count_mismatch() {
        let x = array![[0.0, 0.0], [1.0, 1.0]];
        let mut svm = SupportVectorClassifier::new(SvmConfig::default());
        svm.fit(x.view(), &[0, 1], 2).unwrap();
        assert!(svm.predict(array![[1.0]].view()).is_err());
    }
}
