use std::future::Future;
use std::time::Duration;

use crate::error::{EmbedError, Result};

const BASE_BACKOFF_MS: u64 = 500;

/// Parse the `Retry-After` header value as seconds, falling back to
/// exponential backoff.
pub(crate) fn retry_delay(response: &reqwest::Response, attempt: u32) -> Duration {
    if let Some(val) = response.headers().get("retry-after")
        && let Ok(s) = val.to_str()
        && let Ok(secs) = s.parse::<u64>()
    {
        return Duration::from_secs(secs);
    }
    Duration::from_millis(BASE_BACKOFF_MS << attempt)
}

/// Send an HTTP request, retrying up to `max_retries` times on transport
/// errors, 429, and 5xx responses.
///
/// `f` must return a `reqwest::Response`. On each transient failure, emits a
/// warning and waits before retrying. Returns the response for further
/// processing by the caller once it is neither rate-limited nor a server
/// error.
///
/// # Errors
///
/// Returns [`EmbedError::Unavailable`] once the retry budget is exhausted.
pub(crate) async fn send_with_retry<F, Fut>(
    provider_name: &str,
    max_retries: u32,
    mut f: F,
) -> Result<reqwest::Response>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<reqwest::Response, reqwest::Error>>,
{
    for attempt in 0..=max_retries {
        let response = match f().await {
            Ok(response) => response,
            Err(e) => {
                if attempt == max_retries {
                    return Err(EmbedError::from(e));
                }
                let delay = Duration::from_millis(BASE_BACKOFF_MS << attempt);
                tracing::warn!(
                    "{provider_name} request failed ({e}), retrying in {}ms ({}/{})",
                    delay.as_millis(),
                    attempt + 1,
                    max_retries
                );
                tokio::time::sleep(delay).await;
                continue;
            }
        };

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            if attempt == max_retries {
                return Err(EmbedError::unavailable(format!(
                    "{provider_name} returned {status} after {max_retries} retries"
                )));
            }
            let delay = retry_delay(&response, attempt);
            tracing::warn!(
                "{provider_name} returned {status}, retrying in {}ms ({}/{})",
                delay.as_millis(),
                attempt + 1,
                max_retries
            );
            tokio::time::sleep(delay).await;
            continue;
        }

        return Ok(response);
    }

    Err(EmbedError::unavailable(format!(
        "{provider_name} retry budget exhausted"
    )))
}
