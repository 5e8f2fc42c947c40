//! LLM provider trait and request/response types.
//!
//! Defines the interface every vision-language backend implements, plus the
//! factory that builds the right one from config and CLI flags.

use crate::config::LlmConfig;
use crate::error::PipelineError;
use async_trait::async_trait;
use base64::Engine;
use std::time::Duration;

/// Base64-encoded image ready to send to an LLM API.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg", "image/png")
    pub media_type: String,
}

impl ImageInput {
    /// Create an `ImageInput` from raw bytes and a file extension.
    pub fn from_bytes(bytes: &[u8], format: &str) -> Self {
        let media_type = match format.to_lowercase().as_str() {
            "jpeg" | "jpg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            other => {
                tracing::warn!("Unknown image format '{other}', sending as image/jpeg");
                "image/jpeg"
            }
        };

        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: media_type.to_string(),
        }
    }

    /// Data URL for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// A single image + prompt call.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub image: ImageInput,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl LlmRequest {
    pub fn new(image: ImageInput, prompt: &str) -> Self {
        Self {
            image,
            prompt: prompt.to_string(),
            max_tokens: 400,
            temperature: 1.0,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// The response from an LLM call.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated text, trimmed
    pub text: String,
    /// Model identifier reported by the backend
    pub model: String,
    /// Input + output tokens, if reported
    pub tokens_used: Option<u32>,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all LLM providers implement.
///
/// `async_trait` keeps the trait object-safe so callers can hold a
/// `Box<dyn LlmProvider>`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging (e.g., "openai").
    fn name(&self) -> &str;

    /// Whether the provider is configured and reachable.
    async fn is_available(&self) -> bool;

    /// Send one request.
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, PipelineError>;

    /// Per-request timeout for this provider.
    fn timeout(&self) -> Duration;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn missing_key(provider: &str, var: &str) -> PipelineError {
    PipelineError::Llm {
        message: format!("{provider} API key not set. Set {var} env var."),
        status_code: None,
    }
}

/// Builds a provider from its name, the `[llm]` config, and an optional model override.
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    pub const PROVIDERS: &'static [&'static str] = &["openai", "anthropic", "ollama"];

    pub fn create(
        provider: &str,
        config: &LlmConfig,
        model_override: Option<&str>,
    ) -> Result<Box<dyn LlmProvider>, PipelineError> {
        match provider {
            "openai" => {
                let cfg = config.openai.clone().unwrap_or_default();
                let api_key = resolve_env_var(&cfg.api_key)
                    .ok_or_else(|| missing_key("OpenAI", "OPENAI_API_KEY"))?;
                let model = model_override.unwrap_or(&cfg.model);
                Ok(Box::new(super::openai::OpenAiProvider::with_endpoint(
                    &api_key,
                    model,
                    &cfg.endpoint,
                )))
            }
            "anthropic" => {
                let cfg = config.anthropic.clone().unwrap_or_default();
                let api_key = resolve_env_var(&cfg.api_key)
                    .ok_or_else(|| missing_key("Anthropic", "ANTHROPIC_API_KEY"))?;
                let model = model_override.unwrap_or(&cfg.model);
                Ok(Box::new(super::anthropic::AnthropicProvider::new(
                    &api_key, model,
                )))
            }
            "ollama" => {
                let cfg = config.ollama.clone().unwrap_or_default();
                let model = model_override.unwrap_or(&cfg.model);
                Ok(Box::new(super::ollama::OllamaProvider::new(
                    &cfg.endpoint,
                    model,
                )))
            }
            other => Err(PipelineError::Llm {
                message: format!(
                    "Unknown LLM provider: {other} (expected one of {})",
                    Self::PROVIDERS.join(", ")
                ),
                status_code: None,
            }),
        }
    }
}
