//! mixclip core: blending CLIP image and text embeddings and measuring how
//! well simple classifiers separate the classes at each blend.
//!
//! # Architecture
//!
//! Each stage reads one directory and writes another, so stages can be rerun
//! independently:
//!
//! ```text
//! sample → degrade → describe (LLM) → embed (CLIP) → combine (α grid)
//!        → evaluate (k-fold CV) → analyze (CSV summaries)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use mixclip_core::{Config, evaluate::{evaluate_folder, EvaluateOptions}};
//!
//! let config = Config::load()?;
//! let options = EvaluateOptions::from_config(&config);
//! let result = evaluate_folder(&config.vector_store_dir().join("image_high_info"), &options)?;
//! println!("{:.3} ± {:.3}", result.accuracy_mean, result.accuracy_std);
//! ```

pub mod config;
pub mod degrade;
pub mod describe;
pub mod discovery;
pub mod embedding;
pub mod error;
pub mod evaluate;
pub mod experiment;
pub mod llm;
pub mod math;
pub mod output;
pub mod sampling;
pub mod store;

pub use config::Config;
pub use error::{ConfigError, MixError, PipelineError, PipelineResult, Result};
pub use evaluate::{evaluate_folder, EvaluateOptions, Evaluation};
pub use experiment::{DropoutLevel, InfoLevel, Pairing};
pub use output::{OutputFormat, OutputWriter};
pub use store::VectorStore;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
