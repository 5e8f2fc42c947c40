//! Cross-validated classification of embedding folders.
//!
//! A folder of `.npy` embeddings is loaded as a labelled [`Dataset`], split
//! with [`StratifiedKFold`], and scored by training a fresh [`Classifier`]
//! on every fold.

pub mod classifier;
pub mod dataset;
pub mod folds;
pub mod logistic;
pub mod metrics;
pub mod svm;

use std::path::Path;

use serde::Serialize;

use crate::config::Config;
use crate::error::PipelineError;
use crate::math::mean_std;

pub use classifier::{Classifier, ClassifierSpec};
pub use dataset::{label_for, Dataset};
pub use folds::{Fold, StratifiedKFold};
pub use logistic::LogisticRegression;
pub use metrics::{accuracy, confusion_matrix, ClassificationReport};
pub use svm::SupportVectorClassifier;

/// Settings for evaluating one folder.
#[derive(Debug, Clone)]
pub struct EvaluateOptions {
    pub classes: Vec<String>,
    pub folds: usize,
    pub seed: u64,
    pub classifier: ClassifierSpec,
    /// Compute a confusion matrix and classification report
    pub debug: bool,
}

impl Default for EvaluateOptions {
    fn default() -> Self {
        Self {
            classes: vec!["cat".to_string(), "dog".to_string()],
            folds: 5,
            seed: 42,
            classifier: ClassifierSpec::default(),
            debug: false,
        }
    }
}

impl EvaluateOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            classes: config.dataset.classes.clone(),
            folds: config.evaluation.folds,
            seed: config.evaluation.seed,
            classifier: ClassifierSpec::from_config(&config.evaluation),
            debug: false,
        }
    }

    fn splitter(&self) -> StratifiedKFold {
        StratifiedKFold::new(self.folds, self.seed)
    }
}

/// Out-of-fold diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub confusion_matrix: Vec<Vec<usize>>,
    pub report: ClassificationReport,
}

/// Cross-validation result for one folder.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub accuracy_mean: f64,
    pub accuracy_std: f64,
    pub fold_scores: Vec<f64>,
    pub n_samples: usize,
    pub dimension: usize,
    pub label_counts: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
}

/// Per-fold accuracy of a fresh classifier trained on each training split.
pub fn cross_val_score(
    spec: &ClassifierSpec,
    dataset: &Dataset,
    splitter: &StratifiedKFold,
) -> Result<Vec<f64>, PipelineError> {
    let folds = splitter.split(&dataset.labels)?;
    let mut scores = Vec::with_capacity(folds.len());

    for (i, fold) in folds.iter().enumerate() {
        let (y_test, y_pred) = fit_fold(spec, dataset, fold)?;
        let score = accuracy(&y_test, &y_pred);
        tracing::debug!("  fold {}/{}: accuracy {:.4}", i + 1, folds.len(), score);
        scores.push(score);
    }
    Ok(scores)
}

/// Out-of-fold prediction for every sample, in dataset order.
pub fn cross_val_predict(
    spec: &ClassifierSpec,
    dataset: &Dataset,
    splitter: &StratifiedKFold,
) -> Result<Vec<usize>, PipelineError> {
    let folds = splitter.split(&dataset.labels)?;
    let mut predictions = vec![0; dataset.len()];
    for fold in &folds {
        let (_, y_pred) = fit_fold(spec, dataset, fold)?;
        for (&idx, pred) in fold.test.iter().zip(y_pred) {
            predictions[idx] = pred;
        }
    }
    Ok(predictions)
}

fn fit_fold(
    spec: &ClassifierSpec,
    dataset: &Dataset,
    fold: &Fold,
) -> Result<(Vec<usize>, Vec<usize>), PipelineError> {
    let (x_train, y_train) = dataset.select(&fold.train);
    let (x_test, y_test) = dataset.select(&fold.test);

    let mut model = spec.build();
    model.fit(x_train.view(), &y_train, dataset.n_classes())?;
    let y_pred = model.predict(x_test.view())?;
    Ok((y_test, y_pred))
}

/// Evaluate an already loaded dataset.
pub fn evaluate_dataset(
    dataset: &Dataset,
    options: &EvaluateOptions,
) -> Result<Evaluation, PipelineError> {
    let splitter = options.splitter();
    let fold_scores = cross_val_score(&options.classifier, dataset, &splitter)?;
    let (accuracy_mean, accuracy_std) = mean_std(&fold_scores);

    let diagnostics = if options.debug {
        let predictions = cross_val_predict(&options.classifier, dataset, &splitter)?;
        Some(Diagnostics {
            confusion_matrix: confusion_matrix(
                &dataset.labels,
                &predictions,
                dataset.n_classes(),
            ),
            report: ClassificationReport::new(&dataset.labels, &predictions, &dataset.classes),
        })
    } else {
        None
    };

    Ok(Evaluation {
        accuracy_mean,
        accuracy_std,
        fold_scores,
        n_samples: dataset.len(),
        dimension: dataset.dimension(),
        label_counts: dataset.label_counts(),
        diagnostics,
    })
}

/// Load a folder of embeddings and cross-validate the configured classifier.
pub fn evaluate_folder(dir: &Path, options: &EvaluateOptions) -> Result<Evaluation, PipelineError> {
    let dataset = Dataset::load(dir, &options.classes)?;

    if options.debug {
        tracing::info!("Evaluating {:?}", dir);
        tracing::info!("  Embedding dimension: {}", dataset.dimension());
        for (class, count) in dataset.classes.iter().zip(dataset.label_counts()) {
            tracing::info!("  {}: {} samples", class, count);
        }
    }

    let evaluation = evaluate_dataset(&dataset, options)?;

    if let Some(diag) = &evaluation.diagnostics {
        tracing::info!("Confusion matrix: {:?}", diag.confusion_matrix);
        tracing::info!("Classification report:\n{}", diag.report);
    }
    tracing::debug!(
        "{:?}: {:.3} ± {:.3} ({} classifier)",
        dir,
        evaluation.accuracy_mean,
        evaluation.accuracy_std,
        options.classifier.kind()
    );

    Ok(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClassifierKind, EvaluationConfig};
    use crate::store::write_vector;
    use ndarray::Array2;

    /// Two well-separated clusters with a little deterministic jitter.
    fn separable(per_class: usize) -> Dataset {
        let mut data = Vec::new();
        let mut labels = Vec::new();
        for i in 0..per_class * 2 {
            let class = i % 2;
            let jitter = (i as f64 * 0.37).sin() * 0.2;
            let center = if class == 0 { -2.0 } else { 2.0 };
            data.extend([center + jitter, center - jitter, jitter]);
            labels.push(class);
        }
        Dataset::from_parts(
            Array2::from_shape_vec((per_class * 2, 3), data).unwrap(),
            labels,
            vec!["cat".to_string(), "dog".to_string()],
        )
    }

    #[test]
    fn test_cross_val_score_perfect_on_separable_logistic() {
        let ds = separable(20);
        let scores =
            cross_val_score(&ClassifierSpec::default(), &ds, &StratifiedKFold::new(5, 42)).unwrap();
        assert_eq!(scores.len(), 5);
        assert!(scores.iter().all(|&s| (s - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_cross_val_score_perfect_on_separable_svm() {
        let ds = separable(20);
        let config = EvaluationConfig::default();
        let spec = ClassifierSpec::for_kind(ClassifierKind::Svm, &config);
        let scores = cross_val_score(&spec, &ds, &StratifiedKFold::new(5, 42)).unwrap();
        assert!(scores.iter().all(|&s| (s - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_single_class_dataset_is_rejected() {
        let ds = Dataset::from_parts(
            Array2::from_shape_fn((10, 3), |(i, j)| (i * 3 + j) as f64 * 0.1),
            vec![0; 10],
            vec!["cat".to_string(), "dog".to_string()],
        );
        let config = EvaluationConfig::default();
        for kind in [ClassifierKind::LogisticRegression, ClassifierKind::Svm] {
            let options = EvaluateOptions {
                classifier: ClassifierSpec::for_kind(kind, &config),
                ..Default::default()
            };
            assert!(evaluate_dataset(&ds, &options).is_err(), "{kind} scored one class");
        }
    }

    #[test]
    fn test_cross_val_predict_covers_every_sample() {
        let ds = separable(10);
        let preds =
            cross_val_predict(&ClassifierSpec::default(), &ds, &StratifiedKFold::new(5, 1)).unwrap();
        assert_eq!(preds, ds.labels);
    }

    #[test]
    fn test_evaluate_dataset_with_diagnostics() {
        let ds = separable(10);
        let options = EvaluateOptions {
            debug: true,
            ..Default::default()
        };
        let eval = evaluate_dataset(&ds, &options).unwrap();
        assert_eq!(eval.n_samples, 20);
        assert_eq!(eval.dimension, 3);
        assert_eq!(eval.label_counts, vec![10, 10]);
        assert!((0.0..=1.0).contains(&eval.accuracy_mean));
        let diag = eval.diagnostics.unwrap();
        assert_eq!(diag.confusion_matrix, vec![vec![10, 0], vec![0, 10]]);
    }

    #[test]
    fn test_evaluate_folder_reads_npy() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..10 {
            let j = i as f32 * 0.01;
            write_vector(&dir.path().join(format!("cat.{i}.npy")), &[-1.0 - j, 0.5]).unwrap();
            write_vector(&dir.path().join(format!("dog.{i}.npy")), &[1.0 + j, 0.5]).unwrap();
        }
        let eval = evaluate_folder(dir.path(), &EvaluateOptions::default()).unwrap();
        assert_eq!(eval.fold_scores.len(), 5);
        assert!((eval.accuracy_mean - 1.0).abs() < 1e-12);
        assert_eq!(eval.accuracy_std, 0.0);
        assert!(eval.diagnostics.is_none());
    }

    #[test]
    fn test_too_many_folds_is_error() {
        let ds = separable(2);
        let options = EvaluateOptions {
            folds: 10,
            ..Default::default()
        };
        assert!(evaluate_dataset(&ds, &options).is_err());
    }
}
