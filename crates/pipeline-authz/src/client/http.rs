//! HTTP layer: status mapping and retry.
//!
//! This is the ONLY place for status code handling. client/mod.rs never
//! interprets status codes.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use tracing::{debug, warn};
use url::Url;

use crate::auth::TokenProvider;
use crate::error::{ClientError, ClientResult};
use crate::types::ClientConfig;

use super::helpers::parse_error_message;

/// Upper bound for any single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// HTTP backend for making requests (holds reqwest client, auth, config).
#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) org_url: Url,
    pub(crate) token_provider: TokenProvider,
    pub(crate) config: ClientConfig,
}

impl HttpBackend {
    /// Send a request, retrying transient failures up to `max_retries` times.
    pub(crate) async fn request(
        &self,
        method: reqwest::Method,
        url: &Url,
        body: Option<&serde_json::Value>,
    ) -> ClientResult<reqwest::Response> {
        let mut retries = 0;
        let max_retries = self.config.max_retries;

        loop {
            let result = self.request_once(method.clone(), url, body).await;

            match result {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && retries < max_retries => {
                    retries += 1;

                    let backoff = backoff_for(&e, retries);

                    warn!(
                        error = %e,
                        retry = retries,
                        max_retries = max_retries,
                        backoff_ms = backoff.as_millis(),
                        "retrying request"
                    );

                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request_once(
        &self,
        method: reqwest::Method,
        url: &Url,
        body: Option<&serde_json::Value>,
    ) -> ClientResult<reqwest::Response> {
        let mut request = self.client.request(method, url.clone());

        if let Some(value) = self.token_provider.authorization_header() {
            request = request.header(AUTHORIZATION, value);
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %url, "response received");

        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let body = response.text().await.unwrap_or_default();
                Err(ClientError::Unauthorized {
                    message: parse_error_message(&body, "invalid or expired token"),
                })
            }

            StatusCode::NOT_FOUND => {
                let body = response.text().await.unwrap_or_default();
                Err(ClientError::NotFound {
                    message: parse_error_message(&body, url.path()),
                })
            }

            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);
                let body = response.text().await.unwrap_or_default();

                Err(ClientError::RateLimited {
                    retry_after,
                    message: parse_error_message(&body, "rate limited"),
                })
            }

            s if s.is_client_error() => {
                let body = response.text().await.unwrap_or_default();
                Err(ClientError::Rejected {
                    status: s.as_u16(),
                    message: parse_error_message(&body, &s.to_string()),
                })
            }

            s => {
                let body = response.text().await.unwrap_or_default();
                Err(ClientError::Network {
                    message: format!(
                        "HTTP {}: {}",
                        s.as_u16(),
                        parse_error_message(&body, &s.to_string())
                    ),
                })
            }
        }
    }
}

/// Sleep before retry number `retries` (1-based).
///
/// 429 with `Retry-After` waits that long (capped, ±10% jitter); everything
/// else uses full-jitter exponential backoff.
fn backoff_for(error: &ClientError, retries: u32) -> Duration {
    use rand::Rng;

    match error {
        ClientError::RateLimited {
            retry_after: Some(retry_after),
            ..
        } => {
            let capped = (*retry_after).min(MAX_BACKOFF);
            let base_ms = capped.as_millis() as u64;
            let jitter_factor: f64 = rand::thread_rng().gen_range(0.9_f64..=1.1_f64);
            let jittered_ms = ((base_ms as f64) * jitter_factor).round() as u64;
            Duration::from_millis(jittered_ms.max(100))
        }
        _ => {
            let base_secs = 1u64.checked_shl(retries).unwrap_or(u64::MAX);
            let base_backoff = Duration::from_secs(base_secs).min(MAX_BACKOFF);
            let jittered_ms = rand::thread_rng().gen_range(0..=base_backoff.as_millis() as u64);
            Duration::from_millis(jittered_ms.max(10))
        }
    }
}
