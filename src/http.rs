use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{RequestBuilder, Response, StatusCode};
use tracing::warn;

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;

/// Rate limiting and server errors are worth another attempt.
pub fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt))
}

/// Send a request built by `build`, retrying with exponential backoff on 429/5xx.
/// The final response is returned as-is, whatever its status.
pub async fn send_with_retry<F>(label: &str, build: F) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    for attempt in 0..MAX_RETRIES {
        let response = build()
            .send()
            .await
            .with_context(|| format!("{} request failed", label))?;

        let status = response.status();
        if !is_retryable(status) {
            return Ok(response);
        }

        let delay = backoff(attempt);
        warn!(
            "{} returned {} (attempt {}/{}), backing off {:.1}s",
            label,
            status,
            attempt + 1,
            MAX_RETRIES,
            delay.as_secs_f64()
        );
        tokio::time::sleep(delay).await;
    }

    build()
        .send()
        .await
        .with_context(|| format!("{} request failed", label))
}
