//! JSON-over-HTTP plumbing for OpenAI-compatible model APIs

use crate::errors::{AppError, Result};
use backoff::future::retry;
use backoff::ExponentialBackoff;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub(crate) const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

pub(crate) fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AppError::Configuration {
            message: format!("Failed to create HTTP client: {}", e),
        })
}

fn retry_policy() -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: Duration::from_millis(200),
        max_interval: Duration::from_secs(5),
        max_elapsed_time: Some(Duration::from_secs(30)),
        ..ExponentialBackoff::default()
    }
}

/// POST `body` and decode the JSON reply, retrying transport errors,
/// 429 and 5xx up to `max_retries` times. `wrap` turns a message into the
/// caller's error variant.
pub(crate) async fn post_json<Req, Resp>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &Req,
    max_retries: u32,
    wrap: fn(String) -> AppError,
) -> Result<Resp>
where
    Req: Serialize + Sync,
    Resp: DeserializeOwned + Send,
{
    let mut attempt = 0u32;

    retry(retry_policy(), || {
        attempt += 1;
        let current = attempt;
        async move {
            let outcome = send_once(client, url, api_key, body, wrap).await;
            match outcome {
                Ok(resp) => Ok(resp),
                Err((err, transient)) if transient && current <= max_retries => {
                    tracing::warn!(
                        attempt = current,
                        max_retries,
                        error = %err,
                        "Model API request failed, retrying"
                    );
                    Err(backoff::Error::transient(err))
                }
                Err((err, _)) => Err(backoff::Error::permanent(err)),
            }
        }
    })
    .await
}

async fn send_once<Req, Resp>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &Req,
    wrap: fn(String) -> AppError,
) -> std::result::Result<Resp, (AppError, bool)>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    let response = client
        .post(url)
        .bearer_auth(api_key)
        .json(body)
        .send()
        .await
        .map_err(|e| (wrap(format!("Request failed: {}", e)), true))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let transient = status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS;
        return Err((wrap(format!("API error {}: {}", status, text)), transient));
    }

    response
        .json::<Resp>()
        .await
        .map_err(|e| (wrap(format!("Failed to parse response: {}", e)), false))
}
