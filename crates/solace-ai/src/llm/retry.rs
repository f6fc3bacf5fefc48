//! Backoff policy for model requests.

use std::time::Duration;

use reqwest::Response;
use tracing::warn;

use crate::error::AiError;
use crate::http_client::truncate_body;

/// Exponential backoff with a hard ceiling.
///
/// A turn blocks on the model, so every wait, including one hinted by a
/// `retry-after` header, is capped at `max_delay_ms`.
#[derive(Debug, Clone)]
pub struct LlmRetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for LlmRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl LlmRetryConfig {
    /// Wait before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32, retry_after_secs: Option<u64>) -> Duration {
        let ceiling = Duration::from_millis(self.max_delay_ms);
        let wanted = match retry_after_secs {
            Some(seconds) => Duration::from_secs(seconds),
            None => {
                let factor = self.backoff_multiplier.powi(retry.saturating_sub(1) as i32);
                Duration::from_millis((self.initial_delay_ms as f64 * factor) as u64)
            }
        };
        wanted.min(ceiling)
    }

    /// Whether `error`, raised on zero-based `attempt`, earns another try.
    pub fn should_retry(&self, error: &AiError, attempt: u32) -> bool {
        attempt < self.max_retries && error.is_retryable()
    }

    /// Sleep before the next attempt, logging why.
    pub(crate) async fn back_off(&self, attempt: u32, error: &AiError) {
        let delay = self.delay_for(attempt + 1, error.retry_after());
        warn!(
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Retrying model request"
        );
        tokio::time::sleep(delay).await;
    }
}

fn retry_after_header(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Turn a non-success response into an `AiError::LlmHttp`.
pub async fn response_to_error(response: Response, provider: &str) -> AiError {
    let status = response.status().as_u16();
    let retry_after_secs = retry_after_header(&response);
    let body = response.text().await.unwrap_or_default();

    AiError::LlmHttp {
        provider: provider.to_string(),
        status,
        message: truncate_body(body),
        retry_after_secs,
    }
}
