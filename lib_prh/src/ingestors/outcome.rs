//! Per-company results of a sync run.

use crate::registry::AggregateKey;
use serde::Serialize;

/// Why a company was skipped before any write was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The business id does not match `NNNNNNN-N`.
    InvalidIdentifier,
    /// The registry returned no document.
    NotFound,
}

/// Terminal state of one company within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Skipped(SkipReason),
    /// No transaction could be opened.
    StoreUnavailable(String),
    /// The document decomposed to a parent with no data.
    NothingToSync,
    /// A write failed; the transaction was rolled back.
    PersistenceFailure(String),
    /// The document could not be decomposed.
    ParseFailure(String),
    /// The registry could not be reached.
    FetchFailure(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemResult {
    pub company_number: String,
    /// Key the aggregate was (or would have been) written under.
    pub company_uid: Option<AggregateKey>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Counts of a finished run, by outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub success: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_results(results: &[ItemResult]) -> Self {
        results.iter().fold(Self::default(), |mut acc, item| {
            acc.total += 1;
            match item.outcome {
                Outcome::Success => acc.success += 1,
                Outcome::Skipped(_) | Outcome::NothingToSync => acc.skipped += 1,
                _ => acc.failed += 1,
            }
            acc
        })
    }
}
