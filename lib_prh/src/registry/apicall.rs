//! # PRH Open-Data Client
//!
//! Fetches company documents from the PRH BIS v1 API
//! (`GET {base}/{businessId}` answering `{"results": [document]}`).
//! Every request waits on a shared [`RateLimiter`] first; transient HTTP errors
//! are retried by the underlying [`ApiClient`].

use super::identifier::CompanyNumber;
use crate::ingestors::sources::{FetchError, Fetcher};
use crate::retrieve::{ApiClient, ApiError, RateLimiter};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Public endpoint of the BIS v1 API.
pub const DEFAULT_BASE_URL: &str = "https://avoindata.prh.fi/bis/v1/";
/// The API allows 300 calls per minute; stay a little below it.
pub const DEFAULT_RATE_LIMIT_CALLS: u32 = 290;
pub const DEFAULT_RATE_LIMIT_PERIOD: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct BisResponse {
    #[serde(default)]
    results: Option<Vec<Value>>,
}

/// Rate-limited [`Fetcher`] for the PRH registry.
#[derive(Debug, Clone)]
pub struct PrhClient {
    api: ApiClient,
    limiter: Arc<RateLimiter>,
}

impl PrhClient {
    pub fn new(api: ApiClient, limiter: Arc<RateLimiter>) -> Self {
        Self { api, limiter }
    }

    /// Client for the public endpoint with the default budget.
    pub fn with_defaults(max_retries: u32, timeout: Duration) -> Result<Self, ApiError> {
        let api = ApiClient::new(DEFAULT_BASE_URL, max_retries, timeout)?;
        let limiter = RateLimiter::new(DEFAULT_RATE_LIMIT_CALLS, DEFAULT_RATE_LIMIT_PERIOD);
        Ok(Self::new(api, Arc::new(limiter)))
    }
}

/// Picks the company document out of a BIS v1 response body.
fn first_result(body: BisResponse) -> Option<Value> {
    body.results?.into_iter().next().filter(|doc| !doc.is_null())
}

#[async_trait]
impl Fetcher for PrhClient {
    async fn fetch(&self, company_number: &CompanyNumber) -> Result<Option<Value>, FetchError> {
        self.limiter.acquire().await;
        debug!(company_number = %company_number, "Requesting company from PRH");

        let response = self
            .api
            .get_json::<BisResponse>(company_number.as_str())
            .await
            .map_err(|e| match e {
                ApiError::Decode(e) => FetchError::Body {
                    company_number: company_number.to_string(),
                    reason: e.to_string(),
                },
                other => FetchError::Transport {
                    company_number: company_number.to_string(),
                    reason: other.to_string(),
                },
            })?;

        if !response.success {
            warn!(
                company_number = %company_number,
                status = response.status,
                "Couldn't get a response for company"
            );
            return Ok(None);
        }

        let document = response.data.and_then(first_result);
        if document.is_none() {
            info!(company_number = %company_number, "No data returned for company");
        }
        Ok(document)
    }
}
