//! # Batch Orchestrator
//!
//! Runs fetch, decompose and sync for a list of candidates, one at a time, and
//! turns every per-item failure into an [`Outcome`]. Nothing that goes wrong
//! with one company stops the next one from being processed, and the results
//! come back in input order.

use super::outcome::{ItemResult, Outcome, RunSummary, SkipReason};
use super::sources::{Candidate, CandidateSource, Fetcher, SourceError};
use super::sync_engine::{SyncEngine, SyncError};
use crate::registry::{decompose, AggregateKey, CompanyAggregate, CompanyNumber};
use crate::store::Store;
use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

/// Failures of the batch entry point as a whole.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The candidate source returned no rows.
    #[error("no candidates to process")]
    NoCandidates,
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Which engine operation an item is written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Insert,
    Upsert,
}

/// Result of a single-item run, with the aggregate when one was decomposed.
#[derive(Debug)]
pub struct SingleRun {
    pub result: ItemResult,
    pub aggregate: Option<CompanyAggregate>,
}

/// Couples a [`Fetcher`] with a [`SyncEngine`].
pub struct Orchestrator<F, S> {
    fetcher: F,
    engine: SyncEngine<S>,
}

impl<F: Fetcher, S: Store> Orchestrator<F, S> {
    pub fn new(fetcher: F, engine: SyncEngine<S>) -> Self {
        Self { fetcher, engine }
    }

    pub fn engine(&self) -> &SyncEngine<S> {
        &self.engine
    }

    /// Pulls candidates from `source` and upserts each of them.
    ///
    /// Fails only when the source itself fails or yields nothing.
    #[instrument(skip_all)]
    pub async fn run_batch<C>(
        &self,
        source: &C,
        filter: Option<&str>,
    ) -> Result<Vec<ItemResult>, BatchError>
    where
        C: CandidateSource + ?Sized,
    {
        let candidates = source.candidates(filter).await?;
        if candidates.is_empty() {
            warn!("Candidate source returned no rows");
            return Err(BatchError::NoCandidates);
        }
        Ok(self.run_candidates(&candidates).await)
    }

    /// Upserts every candidate in order. Never fails as a whole.
    pub async fn run_candidates(&self, candidates: &[Candidate]) -> Vec<ItemResult> {
        info!(candidates = candidates.len(), "Starting batch");
        let mut results = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let run = self.process(candidate, SyncMode::Upsert).await;
            results.push(run.result);
        }

        let summary = RunSummary::from_results(&results);
        info!(
            total = summary.total,
            success = summary.success,
            skipped = summary.skipped,
            failed = summary.failed,
            "Batch finished"
        );
        results
    }

    /// First-time sync of one company, reusing `company_uid` as its key when given.
    pub async fn sync_single(&self, company_number: &str, company_uid: Option<&str>) -> ItemResult {
        self.sync_single_with_aggregate(company_number, company_uid)
            .await
            .result
    }

    /// Like [`Orchestrator::sync_single`], also handing back the decomposed aggregate.
    pub async fn sync_single_with_aggregate(
        &self,
        company_number: &str,
        company_uid: Option<&str>,
    ) -> SingleRun {
        let candidate = Candidate::new(company_number, company_uid.map(str::to_owned));
        self.process(&candidate, SyncMode::Insert).await
    }

    #[instrument(skip(self), fields(company_number = %candidate.company_number))]
    async fn process(&self, candidate: &Candidate, mode: SyncMode) -> SingleRun {
        let key = AggregateKey::from_hint(candidate.company_uid.as_deref());
        let finish = |outcome: Outcome, aggregate: Option<CompanyAggregate>| SingleRun {
            result: ItemResult {
                company_number: candidate.company_number.clone(),
                company_uid: Some(key.clone()),
                outcome,
            },
            aggregate,
        };

        let number = match CompanyNumber::parse(&candidate.company_number) {
            Ok(number) => number,
            Err(e) => {
                warn!(error = %e, "Skipping company");
                return finish(Outcome::Skipped(SkipReason::InvalidIdentifier), None);
            }
        };

        let document = match self.fetcher.fetch(&number).await {
            Ok(Some(document)) => document,
            Ok(None) => {
                warn!(company_uid = %key, "No data found for company");
                return finish(Outcome::Skipped(SkipReason::NotFound), None);
            }
            Err(e) => {
                error!(company_uid = %key, error = %e, "Fetching company failed");
                return finish(Outcome::FetchFailure(e.to_string()), None);
            }
        };

        let aggregate = match decompose(&key, Utc::now(), Some(&document)) {
            Ok(aggregate) => aggregate,
            Err(e) => {
                error!(company_uid = %key, error = %e, "Could not decompose company data");
                return finish(Outcome::ParseFailure(e.to_string()), None);
            }
        };

        let synced = match mode {
            SyncMode::Insert => self.engine.insert(&aggregate).await,
            SyncMode::Upsert => self.engine.upsert(&aggregate).await,
        };
        let outcome = match synced {
            Ok(()) => Outcome::Success,
            Err(SyncError::StoreUnavailable(e)) => Outcome::StoreUnavailable(e.to_string()),
            Err(SyncError::NothingToSync { .. }) => Outcome::NothingToSync,
            Err(e @ SyncError::Persistence { .. }) => Outcome::PersistenceFailure(e.to_string()),
        };
        finish(outcome, Some(aggregate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestors::sources::{FetchError, StaticCandidates};
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MapFetcher {
        documents: HashMap<String, Value>,
        calls: AtomicUsize,
    }

    impl MapFetcher {
        fn with(mut self, number: &str, doc: Value) -> Self {
            self.documents.insert(number.to_string(), doc);
            self
        }
    }

    #[async_trait]
    impl Fetcher for MapFetcher {
        async fn fetch(&self, number: &CompanyNumber) -> Result<Option<Value>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if number.as_str() == "9999999-9" {
                return Err(FetchError::Transport {
                    company_number: number.to_string(),
                    reason: "connection reset".into(),
                });
            }
            Ok(self.documents.get(number.as_str()).cloned())
        }
    }

    fn doc(number: &str) -> Value {
        json!({"businessId": number, "name": "Acme", "names": [{"name": "Acme Oy"}]})
    }

    #[tokio::test]
    async fn test_invalid_identifier_never_reaches_fetcher() {
        let orchestrator = Orchestrator::new(MapFetcher::default(), SyncEngine::new(MemoryStore::new()));
        let result = orchestrator.sync_single("123456-78", None).await;
        assert_eq!(result.outcome, Outcome::Skipped(SkipReason::InvalidIdentifier));
        assert_eq!(orchestrator.fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sync_single_reuses_hint_as_key() {
        let fetcher = MapFetcher::default().with("1234567-8", doc("1234567-8"));
        let orchestrator = Orchestrator::new(fetcher, SyncEngine::new(MemoryStore::new()));

        let run = orchestrator.sync_single_with_aggregate("1234567-8", Some("known")).await;
        assert_eq!(run.result.outcome, Outcome::Success);
        assert_eq!(run.result.company_uid, Some(AggregateKey::from("known")));
        assert_eq!(run.aggregate.map(|a| a.names.len()), Some(1));
        assert!(orchestrator
            .engine()
            .store()
            .company(&AggregateKey::from("known"))
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_recorded_and_batch_continues() {
        let fetcher = MapFetcher::default().with("1234567-8", doc("1234567-8"));
        let orchestrator = Orchestrator::new(fetcher, SyncEngine::new(MemoryStore::new()));
        let candidates = vec![
            Candidate::new("9999999-9", None),
            Candidate::new("1234567-8", None),
        ];

        let results = orchestrator.run_candidates(&candidates).await;
        assert!(matches!(results[0].outcome, Outcome::FetchFailure(_)));
        assert_eq!(results[1].outcome, Outcome::Success);
    }

    #[tokio::test]
    async fn test_malformed_document_is_parse_failure() {
        let fetcher = MapFetcher::default().with("1234567-8", json!({"registrationDate": "31.12.2020"}));
        let orchestrator = Orchestrator::new(fetcher, SyncEngine::new(MemoryStore::new()));
        let result = orchestrator.sync_single("1234567-8", None).await;
        assert!(matches!(result.outcome, Outcome::ParseFailure(_)));
        assert_eq!(orchestrator.engine().store().company_count().await, 0);
    }

    #[tokio::test]
    async fn test_empty_source_is_no_candidates() {
        let orchestrator = Orchestrator::new(MapFetcher::default(), SyncEngine::new(MemoryStore::new()));
        let err = orchestrator
            .run_batch(&StaticCandidates::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::NoCandidates));
    }

    #[tokio::test]
    async fn test_duplicates_are_processed_twice_in_order() {
        let fetcher = MapFetcher::default().with("1234567-8", doc("1234567-8"));
        let orchestrator = Orchestrator::new(fetcher, SyncEngine::new(MemoryStore::new()));
        let source = StaticCandidates(vec![
            Candidate::new("1234567-8", Some("k1".into())),
            Candidate::new("bogus", None),
            Candidate::new("1234567-8", Some("k1".into())),
        ]);

        let results = orchestrator.run_batch(&source, None).await.unwrap();
        let numbers: Vec<_> = results.iter().map(|r| r.company_number.as_str()).collect();
        assert_eq!(numbers, ["1234567-8", "bogus", "1234567-8"]);
        assert_eq!(results[2].outcome, Outcome::Success);
        assert_eq!(orchestrator.engine().store().company_count().await, 1);
    }
}
