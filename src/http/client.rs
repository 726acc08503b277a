//! JSON-over-HTTP fetch operation.
//!
//! # Responsibilities
//! - GET a URL, reject non-success statuses, decode the body as JSON
//! - Classify failures for the retry layer
//!
//! # Failure Classification
//! - Transport errors (connect, timeout, request, body): retryable
//! - 5xx, 408 Request Timeout, 429 Too Many Requests: retryable
//! - Other 4xx: not retryable (the request itself is wrong)
//! - JSON decode errors: not retryable

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::config::HttpConfig;
use crate::resilience::Retryable;

/// Failure of a single fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("HTTP status {status} from {url}")]
    Status { status: StatusCode, url: Url },

    #[error("invalid JSON body: {0}")]
    Decode(#[source] reqwest::Error),
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Status { status, .. } => is_retryable_status(*status),
            FetchError::Decode(_) => false,
        }
    }
}

impl Retryable for reqwest::Error {
    fn is_retryable(&self) -> bool {
        if let Some(status) = self.status() {
            return is_retryable_status(status);
        }
        self.is_connect() || self.is_timeout() || self.is_request() || self.is_body()
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

/// HTTP client performing JSON GETs.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    /// Use an already configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// GET `url` and decode the response body as JSON.
    pub async fn get_json(&self, url: Url) -> Result<Value, FetchError> {
        tracing::debug!(url = %url, "Fetching");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status, url });
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_decode() {
                FetchError::Decode(e)
            } else {
                FetchError::Transport(e)
            }
        })
    }
}
