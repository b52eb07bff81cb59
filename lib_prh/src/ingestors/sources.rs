//! # Batch Inputs
//!
//! The two seams the batch orchestrator pulls from: a [`CandidateSource`] that
//! lists which companies to sync, and a [`Fetcher`] that retrieves the raw
//! document for one of them.

use crate::registry::CompanyNumber;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One company to process: its business id and, when already known, the key of
/// its existing aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub company_number: String,
    pub company_uid: Option<String>,
}

impl Candidate {
    pub fn new(company_number: impl Into<String>, company_uid: Option<String>) -> Self {
        Self {
            company_number: company_number.into(),
            company_uid,
        }
    }
}

/// Transport-level failure while fetching a document.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request for {company_number} failed: {reason}")]
    Transport { company_number: String, reason: String },
    #[error("response for {company_number} is not valid JSON: {reason}")]
    Body { company_number: String, reason: String },
}

/// Failure while listing candidates.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("candidate source unavailable: {0}")]
    Unavailable(String),
    #[error("candidate query failed: {0}")]
    Query(String),
}

/// Retrieves the raw registry document for a company.
///
/// `Ok(None)` means the registry does not know the company (or answered with an
/// error status); `Err` is reserved for failures where no answer was obtained.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, company_number: &CompanyNumber) -> Result<Option<Value>, FetchError>;
}

/// Lists the companies a batch run should process.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Runs `filter` (or the source's default selection) and returns the rows in order.
    async fn candidates(&self, filter: Option<&str>) -> Result<Vec<Candidate>, SourceError>;
}

/// A fixed candidate list. Useful for tests and for ids given on the command line.
#[derive(Debug, Clone, Default)]
pub struct StaticCandidates(pub Vec<Candidate>);

#[async_trait]
impl CandidateSource for StaticCandidates {
    async fn candidates(&self, _filter: Option<&str>) -> Result<Vec<Candidate>, SourceError> {
        Ok(self.0.clone())
    }
}
