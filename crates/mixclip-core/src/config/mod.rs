//! Configuration management for mixclip.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. All config structs implement `Default` with the values used by
//! the reference experiments.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for mixclip.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Directory layout
    pub layout: LayoutConfig,

    /// Dataset labelling
    pub dataset: DatasetConfig,

    /// Sample-set construction
    pub sampling: SamplingConfig,

    /// Pixel dropout
    pub dropout: DropoutConfig,

    /// Embedding model settings
    pub embedding: EmbeddingConfig,

    /// Embedding combination
    pub combine: CombineConfig,

    /// Cross-validated evaluation
    pub evaluation: EvaluationConfig,

    /// Description generation
    pub describe: DescribeConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// LLM provider settings
    pub llm: LlmConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from an explicit path if given, otherwise from the default location.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load_from(p),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.mixclip.mixclip/config.toml
    /// - Linux: ~/.config/mixclip/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\mixclip\config\config.toml
    ///
    /// Falls back to ~/.mixclip/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "mixclip", "mixclip")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".mixclip").join("config.toml")
            })
    }

    /// Get the resolved model directory path (with ~ expansion).
    pub fn model_dir(&self) -> PathBuf {
        expand(&self.general.model_dir)
    }

    /// Directory holding the configured CLIP model's files.
    pub fn clip_model_dir(&self) -> PathBuf {
        self.model_dir().join(&self.embedding.model)
    }

    /// Get the resolved experiment workspace root (with ~ expansion).
    pub fn data_dir(&self) -> PathBuf {
        expand(&self.general.data_dir)
    }

    /// Resolve a layout path against the workspace root.
    pub fn data_path(&self, relative: &Path) -> PathBuf {
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.data_dir().join(relative)
        }
    }

    /// Directory for result CSVs.
    pub fn results_dir(&self) -> PathBuf {
        self.data_path(&self.general.results_dir)
    }

    /// Root of the embedding store.
    pub fn vector_store_dir(&self) -> PathBuf {
        self.data_path(&self.layout.vector_store)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let expanded = shellexpand::tilde(&path_str);
    PathBuf::from(expanded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.evaluation.folds, 5);
        assert_eq!(config.evaluation.seed, 42);
        assert_eq!(config.combine.alphas, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(config.combine.pairings.len(), 4);
        assert_eq!(config.dropout.levels, vec![25, 50, 75, 90]);
        assert_eq!(config.sampling.per_class, 500);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[evaluation]"));
        assert!(toml.contains("LowImg-HighText"));
    }

    #[test]
    fn test_toml_round_trip_keeps_overrides() {
        let toml = r#"
            [evaluation]
            folds = 10
            classifier = "svm"

            [evaluation.svm]
            gamma = 0.5

            [combine]
            alphas = [0.0, 1.0]
            pairings = ["HighImg-HighText"]
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.evaluation.folds, 10);
        assert_eq!(config.evaluation.classifier, ClassifierKind::Svm);
        assert_eq!(config.evaluation.svm.gamma, Some(0.5));
        assert_eq!(config.combine.alphas, vec![0.0, 1.0]);
        assert_eq!(config.combine.pairings[0].code(), "HighImg-HighText");
        // Untouched sections keep their defaults
        assert_eq!(config.evaluation.logistic.max_iter, 1000);
    }

    #[test]
    fn test_load_from_file_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[evaluation]\nfolds = 1\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("evaluation.folds"));
    }

    #[test]
    fn test_data_path_resolution() {
        let mut config = Config::default();
        config.general.data_dir = PathBuf::from("/srv/exp");
        assert_eq!(
            config.vector_store_dir(),
            PathBuf::from("/srv/exp/vector_store")
        );
        assert_eq!(
            config.data_path(Path::new("/abs/elsewhere")),
            PathBuf::from("/abs/elsewhere")
        );
        assert_eq!(config.results_dir(), PathBuf::from("/srv/exp/results"));
    }
}
