//! # HTTP Retrieval Utilities
//!
//! An asynchronous JSON client around `reqwest` with retry middleware. Transient
//! failures (connection errors, 5xx, 429) are retried with exponential backoff
//! before the caller ever sees them.

use reqwest::{header::HeaderMap, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("prh-sync/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("could not build http client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("request failed: {0}")]
    Request(#[from] reqwest_middleware::Error),
    #[error("could not read response body: {0}")]
    Body(#[source] reqwest::Error),
    #[error("response body is not the expected json: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A standardized container for API responses.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The deserialized body of a 2xx response.
    pub data: Option<T>,
    /// The raw body of a non-2xx response.
    pub error_body: Option<String>,
    pub status: u16,
    pub success: bool,
    pub headers: HeaderMap,
}

/// GET-only JSON client rooted at a base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    inner: ClientWithMiddleware,
    base_url: Url,
}

impl ApiClient {
    /// Creates a client retrying transient failures up to `max_retries` times.
    ///
    /// `base_url` must be absolute; end it with `/` so relative paths are
    /// appended rather than replacing the last segment.
    pub fn new(base_url: &str, max_retries: u32, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(ApiError::Build)?;

        let inner = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { inner, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves `path` against the base URL.
    pub fn url_for(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    /// GETs `path` and deserializes a 2xx body into `T`.
    ///
    /// Non-2xx answers are returned as an unsuccessful [`ApiResponse`], not as an error.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, ApiError> {
        let url = self.url_for(path)?;
        let response = self.inner.get(url).send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(ApiError::Body)?;

        if status.is_success() {
            Ok(ApiResponse {
                data: Some(serde_json::from_str(&body)?),
                error_body: None,
                status: status.as_u16(),
                success: true,
                headers,
            })
        } else {
            Ok(ApiResponse {
                data: None,
                error_body: Some(body),
                status: status.as_u16(),
                success: false,
                headers,
            })
        }
    }
}
