//! # Data Retrieval Module
//!
//! Generic HTTP plumbing shared by registry clients.
//!
//! ## Contained Modules:
//!
//! - **`ky_http`**: an `ApiClient` built on `reqwest` and `reqwest-middleware`
//!   with automatic retries and exponential backoff.
//! - **`rate_limit`**: a `RateLimiter` enforcing a minimum spacing between calls.
//!
//! Registry-specific parsing lives with the registry (`registry::apicall`).

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// JSON client with retry middleware.
pub mod ky_http;
/// Minimum-interval call spacing.
pub mod rate_limit;

pub use ky_http::{ApiClient, ApiError, ApiResponse};
pub use rate_limit::RateLimiter;
