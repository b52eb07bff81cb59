//! # Synchronization Engine
//!
//! Writes one [`CompanyAggregate`] to a [`Store`] inside a single transaction.
//!
//! - `insert` is the first-time write: parent row, then every non-empty child
//!   collection.
//! - `upsert` is the idempotent re-sync: the parent row is updated in place (or
//!   inserted when missing) and every child kind is fully replaced, so running
//!   it twice with the same document leaves the same rows behind.
//!
//! The parent is always written before its children. Any failure rolls back the
//! whole transaction; the connection is released on every exit path.

use crate::registry::{AggregateKey, CompanyAggregate};
use crate::store::{Store, StoreError, StoreTransaction};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Why a sync did not complete.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No transaction could be opened. Nothing was written.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),
    /// The aggregate has no parent data; writing it would null out a good row.
    #[error("nothing to sync for company_uid {key}: parent has no data")]
    NothingToSync { key: AggregateKey },
    /// A write failed and the transaction was rolled back.
    #[error(
        "persisting company_uid {key} (company number {}) failed: {source}",
        .company_number.as_deref().unwrap_or("unknown")
    )]
    Persistence {
        key: AggregateKey,
        company_number: Option<String>,
        #[source]
        source: StoreError,
    },
}

impl SyncError {
    fn persistence(aggregate: &CompanyAggregate, source: StoreError) -> Self {
        SyncError::Persistence {
            key: aggregate.key().clone(),
            company_number: aggregate.company_number().map(str::to_owned),
            source,
        }
    }
}

/// Drives the insert and upsert protocols against a store.
#[derive(Debug, Clone)]
pub struct SyncEngine<S> {
    store: S,
}

impl<S: Store> SyncEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// First-time persistence of an aggregate.
    #[instrument(skip_all, fields(company_uid = %aggregate.key(), company_number = aggregate.company_number()))]
    pub async fn insert(&self, aggregate: &CompanyAggregate) -> Result<(), SyncError> {
        let mut tx = self.store.begin().await.map_err(SyncError::StoreUnavailable)?;

        let written = Self::write_insert(&mut tx, aggregate).await;
        Self::finish(tx, aggregate, written).await?;
        info!(children = aggregate.child_count(), "Inserted company");
        Ok(())
    }

    /// Idempotent re-sync of an aggregate.
    #[instrument(skip_all, fields(company_uid = %aggregate.key(), company_number = aggregate.company_number()))]
    pub async fn upsert(&self, aggregate: &CompanyAggregate) -> Result<(), SyncError> {
        let mut tx = self.store.begin().await.map_err(SyncError::StoreUnavailable)?;

        if aggregate.is_empty() {
            warn!("Refusing to sync a company without parent data");
            Self::release(tx).await;
            return Err(SyncError::NothingToSync {
                key: aggregate.key().clone(),
            });
        }

        let written = Self::write_upsert(&mut tx, aggregate).await;
        Self::finish(tx, aggregate, written).await?;
        info!(children = aggregate.child_count(), "Upserted company");
        Ok(())
    }

    async fn write_insert(tx: &mut S::Tx, aggregate: &CompanyAggregate) -> Result<(), StoreError> {
        // Children carry a foreign key to the parent.
        tx.insert_company(&aggregate.company).await?;

        for rows in aggregate.child_rows() {
            if rows.is_empty() {
                continue;
            }
            tx.insert_children(rows).await?;
            debug!(table = rows.kind().table(), rows = rows.len(), "Inserted child rows");
        }
        Ok(())
    }

    async fn write_upsert(tx: &mut S::Tx, aggregate: &CompanyAggregate) -> Result<(), StoreError> {
        if tx.company_exists(aggregate.key()).await? {
            tx.update_company(&aggregate.company).await?;
            debug!("Merged existing company row");
        } else {
            tx.insert_company(&aggregate.company).await?;
            debug!("Inserted new company row");
        }

        for rows in aggregate.child_rows() {
            let kind = rows.kind();
            let removed = tx.delete_children(kind, aggregate.key()).await?;
            tx.insert_children(rows).await?;
            debug!(table = kind.table(), removed, inserted = rows.len(), "Replaced child rows");
        }
        Ok(())
    }

    /// Commits on success, rolls back on failure.
    async fn finish(
        tx: S::Tx,
        aggregate: &CompanyAggregate,
        written: Result<(), StoreError>,
    ) -> Result<(), SyncError> {
        match written {
            Ok(()) => tx
                .commit()
                .await
                .map_err(|e| SyncError::persistence(aggregate, e)),
            Err(e) => {
                error!(error = %e, "Error committing company rows, rolling back");
                Self::release(tx).await;
                Err(SyncError::persistence(aggregate, e))
            }
        }
    }

    /// Rolls back; a failing rollback is logged and otherwise ignored.
    async fn release(tx: S::Tx) {
        if let Err(e) = tx.rollback().await {
            error!(error = %e, "Rollback failed");
        }
    }
}
