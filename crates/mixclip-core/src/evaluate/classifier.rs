//! Classifier trait and construction from configuration.

use ndarray::ArrayView2;

use crate::config::{ClassifierKind, EvaluationConfig, LogisticConfig, SvmConfig};
use crate::error::PipelineError;

use super::logistic::LogisticRegression;
use super::svm::SupportVectorClassifier;

/// A supervised classifier over dense `f64` features.
///
/// Labels are class indices in `0..n_classes`. `fit` may be called once per
/// instance; cross-validation builds a fresh classifier for every fold.
pub trait Classifier: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Train on `x` (one row per sample) and matching labels.
    fn fit(&mut self, x: ArrayView2<f64>, y: &[usize], n_classes: usize)
        -> Result<(), PipelineError>;

    /// Predict a class index for every row of `x`.
    fn predict(&self, x: ArrayView2<f64>) -> Result<Vec<usize>, PipelineError>;
}

/// Classifier choice plus hyperparameters; builds fresh instances on demand.
#[derive(Debug, Clone)]
pub enum ClassifierSpec {
    Logistic(LogisticConfig),
    Svm(SvmConfig),
}

impl ClassifierSpec {
    /// Select the configured classifier.
    pub fn from_config(config: &EvaluationConfig) -> Self {
        Self::for_kind(config.classifier, config)
    }

    /// Select a specific classifier, taking its hyperparameters from `config`.
    pub fn for_kind(kind: ClassifierKind, config: &EvaluationConfig) -> Self {
        match kind {
            ClassifierKind::LogisticRegression => Self::Logistic(config.logistic.clone()),
            ClassifierKind::Svm => Self::Svm(config.svm.clone()),
        }
    }

    pub fn kind(&self) -> ClassifierKind {
        match self {
            Self::Logistic(_) => ClassifierKind::LogisticRegression,
            Self::Svm(_) => ClassifierKind::Svm,
        }
    }

    /// A new, untrained classifier.
    pub fn build(&self) -> Box<dyn Classifier> {
        match self {
            Self::Logistic(cfg) => Box::new(LogisticRegression::new(cfg.clone())),
            Self::Svm(cfg) => Box::new(SupportVectorClassifier::new(cfg.clone())),
        }
    }
}

impl Default for ClassifierSpec {
    fn default() -> Self {
        Self::Logistic(LogisticConfig::default())
    }
}

/// Shared input checks for `fit`.
pub(crate) fn check_training_input(
    x: &ArrayView2<f64>,
    y: &[usize],
    n_classes: usize,
) -> Result<(), PipelineError> {
    if x.nrows() != y.len() {
        return Err(PipelineError::Evaluation(format!(
            "{} feature rows but {} labels",
            x.nrows(),
            y.len()
        )));
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(PipelineError::Evaluation("empty training set".to_string()));
    }
    if n_classes < 2 {
        return Err(PipelineError::Evaluation(format!(
            "need at least 2 classes, got {n_classes}"
        )));
    }
    if let Some(&bad) = y.iter().find(|&&l| l >= n_classes) {
        return Err(PipelineError::Evaluation(format!(
            "label {bad} out of range for {n_classes} classes"
        )));
    }
    if y.iter().all(|&l| l == y[0]) {
        return Err(PipelineError::Evaluation(format!(
            "training data needs samples of at least 2 classes, only class {} present",
            y[0]
        )));
    }
    Ok(())
}

pub(crate) fn not_fitted(name: &str) -> PipelineError {
    PipelineError::Evaluation(format!("{name} used before fit"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_spec_follows_config_kind() {
        let mut config = EvaluationConfig::default();
        assert_eq!(
            ClassifierSpec::from_config(&config).kind(),
            ClassifierKind::LogisticRegression
        );
        config.classifier = ClassifierKind::Svm;
        let spec = ClassifierSpec::from_config(&config);
        assert_eq!(spec.kind(), ClassifierKind::Svm);
        assert_eq!(spec.build().name(), "svm");
    }

    #[test]
    fn test_check_training_input() {
        let x = Array2::<f64>::zeros((3, 2));
        assert!(check_training_input(&x.view(), &[0, 1, 0], 2).is_ok());
        assert!(check_training_input(&x.view(), &[0, 1], 2).is_err());
        assert!(check_training_input(&x.view(), &[0, 2, 0], 2).is_err());
        assert!(check_training_input(&x.view(), &[0, 0, 0], 1).is_err());
    }

    #[test]
    fn test_check_training_input_rejects_single_label() {
        let x = Array2::<f64>::zeros((3, 2));
        let err = check_training_input(&x.view(), &[1, 1, 1], 2).unwrap_err();
        assert!(err.to_string().contains("at least 2 classes"));
    }
}
