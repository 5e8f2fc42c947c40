//! Error types for the mixclip pipeline.
//!
//! Errors are organized by stage so messages carry the context that matters
//! (file paths, stage names, offending values).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for mixclip operations.
#[derive(Error, Debug)]
pub enum MixError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline stage errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Filesystem access failed for a specific path
    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing a `.npy` vector failed
    #[error("Vector file error for {path}: {message}")]
    Vector { path: PathBuf, message: String },

    /// Two vectors that must line up do not
    #[error("Dimension mismatch for {path}: expected {expected}, got {actual}")]
    DimensionMismatch {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    /// A mixing weight outside [0, 1]
    #[error("Alpha must be within [0, 1], got {0}")]
    InvalidAlpha(f32),

    /// Image decoding or encoding failed
    #[error("Image error for {path}: {message}")]
    Image { path: PathBuf, message: String },

    /// Embedding generation failed
    #[error("Embedding failed for {path}: {message}")]
    Embedding { path: PathBuf, message: String },

    /// Model loading or inference failed (not tied to one input file)
    #[error("Model error: {message}")]
    Model { message: String },

    /// LLM call failed
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        status_code: Option<u16>,
    },

    /// The LLM answered but not in the expected shape
    #[error("Malformed description response for {path}: {response}")]
    MalformedResponse { path: PathBuf, response: String },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },

    /// Random sampling could not be satisfied
    #[error("Sampling error: {0}")]
    Sampling(String),

    /// A labelled dataset could not be built
    #[error("Dataset error for {path}: {message}")]
    Dataset { path: PathBuf, message: String },

    /// Classifier training or cross-validation failed
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Reading or writing a results CSV failed
    #[error("CSV error for {path}: {message}")]
    Csv { path: PathBuf, message: String },

    /// Result rows needed for an analysis are missing
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

impl PipelineError {
    /// Wrap an I/O error with the path that produced it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience type alias for mixclip results.
pub type Result<T> = std::result::Result<T, MixError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_helper_keeps_path() {
        let err = PipelineError::io(
            "vector_store/x.npy",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let msg = err.to_string();
        assert!(msg.contains("vector_store/x.npy"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn test_pipeline_error_converts_to_mix_error() {
        let err: MixError = PipelineError::InvalidAlpha(1.5).into();
        assert!(err.to_string().contains("1.5"));
    }
}
