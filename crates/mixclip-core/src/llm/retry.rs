//! Retrying LLM calls through transient failures.

use super::provider::{LlmProvider, LlmRequest, LlmResponse};
use crate::error::PipelineError;
use std::path::Path;
use std::time::Duration;

/// How often and how patiently to call a provider.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub attempts: u32,
    /// Base backoff delay in milliseconds
    pub base_delay_ms: u64,
    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_ms: 1000,
            timeout_ms: 60_000,
        }
    }
}

/// Whether an error is worth another attempt.
///
/// Timeouts, HTTP 429 and 5xx are retried. Auth failures, bad requests and
/// missing models are not.
pub fn is_retryable(error: &PipelineError) -> bool {
    match error {
        PipelineError::Timeout { .. } => true,
        PipelineError::Llm {
            status_code,
            message,
        } => {
            if let Some(code) = status_code {
                return *code == 429 || (500..=599).contains(code);
            }
            // No status: connection refused, DNS failure, client-side timeout
            message.contains("timed out") || message.contains("connect")
        }
        _ => false,
    }
}

/// `base_delay * 2^attempt`, capped at 30 seconds.
pub fn backoff_duration(attempt: u32, base_delay_ms: u64) -> Duration {
    let delay = base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay.min(30_000))
}

/// Call `provider` for the image at `path`, retrying per `policy`.
///
/// Returns the last error once attempts run out or a non-retryable error occurs.
pub async fn generate_with_retry(
    provider: &dyn LlmProvider,
    request: &LlmRequest,
    policy: &RetryPolicy,
    path: &Path,
) -> Result<LlmResponse, PipelineError> {
    let mut attempt = 0;
    loop {
        let result = match tokio::time::timeout(
            Duration::from_millis(policy.timeout_ms),
            provider.generate(request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(PipelineError::Timeout {
                path: path.to_path_buf(),
                stage: "describe".to_string(),
                timeout_ms: policy.timeout_ms,
            }),
        };

        match result {
            Ok(response) => return Ok(response),
            Err(e) if attempt < policy.attempts && is_retryable(&e) => {
                let delay = backoff_duration(attempt, policy.base_delay_ms);
                attempt += 1;
                tracing::debug!(
                    "Retry {attempt}/{} for {:?} after {delay:?}: {e}",
                    policy.attempts,
                    path
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
