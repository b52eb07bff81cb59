//! Builds the PRH fetcher from resolved settings. Shared by the sync binaries.

use lib_prh::configs::SyncConfig;
use lib_prh::registry::apicall::PrhClient;
use lib_prh::retrieve::{ApiClient, RateLimiter};
use std::sync::Arc;

pub fn prh_client(config: &SyncConfig) -> anyhow::Result<PrhClient> {
    let api = ApiClient::new(&config.api_base_url, config.max_retries, config.request_timeout)?;
    let limiter = RateLimiter::new(config.rate_limit_calls, config.rate_limit_period);
    Ok(PrhClient::new(api, Arc::new(limiter)))
}
