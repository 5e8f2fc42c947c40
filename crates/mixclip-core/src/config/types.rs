//! Sub-configuration structs with defaults matching the reference experiments.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::experiment::representation::Pairing;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Root of the experiment workspace; layout paths are relative to it
    pub data_dir: PathBuf,

    /// Directory where ONNX models and tokenizers are stored
    pub model_dir: PathBuf,

    /// Directory for result CSVs, relative to `data_dir`
    pub results_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            model_dir: PathBuf::from("~/.mixclip/models"),
            results_dir: PathBuf::from("results"),
        }
    }
}

/// Directory layout, relative to `general.data_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Pool of unlabelled-by-directory source photos (`cat.1.jpg`, `dog.7.jpg`)
    pub unfiltered_dir: PathBuf,

    /// Sampled photos; `high_info/` and `low_info/dropout_{p}/` below it
    pub photos_dir: PathBuf,

    /// Generated descriptions; `high_info/` and `low_info/` below it
    pub descriptions_dir: PathBuf,

    /// Embedding store root
    pub vector_store: PathBuf,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            unfiltered_dir: PathBuf::from("unfiltered_photos"),
            photos_dir: PathBuf::from("sample_sets/photos"),
            descriptions_dir: PathBuf::from("sample_sets/descriptions"),
            vector_store: PathBuf::from("vector_store"),
        }
    }
}

/// Dataset labelling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Class names, in label order. A file's label is the first class whose
    /// name appears in its file name.
    pub classes: Vec<String>,

    /// Expected number of embeddings per store directory
    pub expected_samples: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            classes: vec!["cat".to_string(), "dog".to_string()],
            expected_samples: 1000,
        }
    }
}

/// Sample-set construction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Images drawn per class
    pub per_class: usize,

    /// RNG seed; unset draws a fresh seed each run
    pub seed: Option<u64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            per_class: 500,
            seed: None,
        }
    }
}

/// Pixel dropout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DropoutConfig {
    /// Dropout levels (percent of pixels zeroed) used across experiments
    pub levels: Vec<u8>,

    /// RNG seed; unset draws a fresh seed each run
    pub seed: Option<u64>,
}

impl Default for DropoutConfig {
    fn default() -> Self {
        Self {
            levels: vec![25, 50, 75, 90],
            seed: None,
        }
    }
}

/// CLIP embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model directory name under `general.model_dir`
    pub model: String,

    /// Square input resolution of the vision tower
    pub image_size: u32,

    /// Text context length (CLIP: 77 tokens including BOS/EOS)
    pub max_tokens: usize,

    /// L2-normalize embeddings before writing them
    pub normalize: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "clip-vit-base-patch32".to_string(),
            image_size: 224,
            max_tokens: 77,
            normalize: false,
        }
    }
}

/// Embedding combination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombineConfig {
    /// Mixing weights (1.0 = image only, 0.0 = text only)
    pub alphas: Vec<f32>,

    /// Image/text pairings to combine and evaluate
    pub pairings: Vec<Pairing>,
}

impl Default for CombineConfig {
    fn default() -> Self {
        Self {
            alphas: vec![0.0, 0.25, 0.5, 0.75, 1.0],
            pairings: Pairing::defaults().to_vec(),
        }
    }
}

/// Which classifier the evaluation stage trains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    /// Multinomial logistic regression with L2 penalty
    #[default]
    LogisticRegression,
    /// RBF-kernel support vector classifier
    Svm,
}

impl std::fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierKind::LogisticRegression => write!(f, "logistic_regression"),
            ClassifierKind::Svm => write!(f, "svm"),
        }
    }
}

/// Cross-validated evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Number of stratified folds
    pub folds: usize,

    /// Seed for fold shuffling
    pub seed: u64,

    /// Classifier to train
    pub classifier: ClassifierKind,

    /// Logistic regression hyperparameters
    pub logistic: LogisticConfig,

    /// SVM hyperparameters
    pub svm: SvmConfig,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            folds: 5,
            seed: 42,
            classifier: ClassifierKind::default(),
            logistic: LogisticConfig::default(),
            svm: SvmConfig::default(),
        }
    }
}

/// Logistic regression hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticConfig {
    /// Inverse regularization strength
    pub c: f64,

    /// Maximum optimizer iterations
    pub max_iter: usize,

    /// Gradient-norm stopping tolerance
    pub tol: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tol: 1e-4,
        }
    }
}

/// RBF support vector classifier hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SvmConfig {
    /// Box constraint
    pub c: f64,

    /// Kernel width; unset uses `1 / (n_features * Var(X))`
    pub gamma: Option<f64>,

    /// KKT violation tolerance
    pub tol: f64,

    /// Maximum SMO iterations per binary problem
    pub max_iter: usize,
}

impl Default for SvmConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            gamma: None,
            tol: 1e-3,
            max_iter: 100_000,
        }
    }
}

/// Description generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DescribeConfig {
    /// LLM provider ("openai", "anthropic", "ollama")
    pub provider: String,

    /// Maximum tokens the model may generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Max retry attempts for transient failures
    pub retry_attempts: u32,

    /// Base delay between retries in milliseconds
    pub retry_delay_ms: u64,

    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,

    /// Log progress every N images
    pub progress_every: usize,
}

impl Default for DescribeConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            max_tokens: 400,
            temperature: 1.0,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            timeout_ms: 60_000,
            progress_every: 10,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// LLM provider configurations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI configuration
    pub openai: Option<OpenAiConfig>,

    /// Anthropic configuration
    pub anthropic: Option<AnthropicConfig>,

    /// Ollama (local) configuration
    pub ollama: Option<OllamaConfig>,
}

/// OpenAI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API endpoint (Chat Completions)
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-4o".to_string(),
        }
    }
}

/// Anthropic configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: "${ANTHROPIC_API_KEY}".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
        }
    }
}

/// Ollama configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama API endpoint
    pub endpoint: String,

    /// Model name
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2-vision".to_string(),
        }
    }
}
