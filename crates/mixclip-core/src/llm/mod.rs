//! Vision-language model backends used to write image descriptions.
//!
//! A provider abstraction over OpenAI, Anthropic and Ollama, plus retry with
//! exponential backoff for transient failures.

pub(crate) mod anthropic;
pub(crate) mod ollama;
pub(crate) mod openai;
pub mod provider;
pub mod retry;

pub use provider::{ImageInput, LlmProvider, LlmProviderFactory, LlmRequest, LlmResponse};
pub use retry::RetryPolicy;
