//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.dataset.classes.len() < 2 {
            return Err(ConfigError::ValidationError(
                "dataset.classes must name at least two classes".into(),
            ));
        }
        if self.dataset.classes.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "dataset.classes must not contain empty names".into(),
            ));
        }
        if self.sampling.per_class == 0 {
            return Err(ConfigError::ValidationError(
                "sampling.per_class must be > 0".into(),
            ));
        }
        if let Some(level) = self.dropout.levels.iter().find(|&&l| l > 100) {
            return Err(ConfigError::ValidationError(format!(
                "dropout.levels must be percentages in 0..=100, got {level}"
            )));
        }
        if self.embedding.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.image_size must be > 0".into(),
            ));
        }
        if self.embedding.max_tokens < 2 {
            return Err(ConfigError::ValidationError(
                "embedding.max_tokens must be >= 2".into(),
            ));
        }
        if let Some(alpha) = self
            .combine
            .alphas
            .iter()
            .find(|a| !(0.0..=1.0).contains(*a))
        {
            return Err(ConfigError::ValidationError(format!(
                "combine.alphas must lie within [0, 1], got {alpha}"
            )));
        }
        if self.evaluation.folds < 2 {
            return Err(ConfigError::ValidationError(
                "evaluation.folds must be >= 2".into(),
            ));
        }
        if self.evaluation.logistic.c <= 0.0 || self.evaluation.svm.c <= 0.0 {
            return Err(ConfigError::ValidationError(
                "evaluation.logistic.c and evaluation.svm.c must be > 0".into(),
            ));
        }
        if matches!(self.evaluation.svm.gamma, Some(g) if g <= 0.0) {
            return Err(ConfigError::ValidationError(
                "evaluation.svm.gamma must be > 0 when set".into(),
            ));
        }
        if self.evaluation.logistic.max_iter == 0 || self.evaluation.svm.max_iter == 0 {
            return Err(ConfigError::ValidationError(
                "evaluation max_iter values must be > 0".into(),
            ));
        }
        if self.describe.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "describe.timeout_ms must be > 0".into(),
            ));
        }
        if self.describe.progress_every == 0 {
            return Err(ConfigError::ValidationError(
                "describe.progress_every must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_single_class() {
        let mut config = Config::default();
        config.dataset.classes = vec!["cat".into()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("dataset.classes"));
    }

    #[test]
    fn test_validate_rejects_alpha_out_of_range() {
        let mut config = Config::default();
        config.combine.alphas = vec![0.0, 1.25];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("combine.alphas"));
    }

    #[test]
    fn test_validate_rejects_single_fold() {
        let mut config = Config::default();
        config.evaluation.folds = 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("evaluation.folds"));
    }

    #[test]
    fn test_validate_rejects_dropout_over_100() {
        let mut config = Config::default();
        config.dropout.levels = vec![50, 120];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("120"));
    }

    #[test]
    fn test_validate_rejects_non_positive_gamma() {
        let mut config = Config::default();
        config.evaluation.svm.gamma = Some(0.0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("gamma"));
    }
}
