//! # Store Interfaces
//!
//! The synchronization engine talks to the relational store only through these
//! two traits. A [`Store`] hands out one [`StoreTransaction`] per sync; the
//! transaction exposes the handful of row operations the engine needs and is
//! finished by exactly one `commit` or `rollback`. Dropping an unfinished
//! transaction must discard its writes and release the connection.
//!
//! ## Implementations:
//! - **`memory`**: an in-process store with foreign-key checks and failure
//!   injection, used by tests and dry runs.
//! - **`connections::pg_store`** (feature `connections`): PostgreSQL via `sqlx`.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

use crate::registry::{AggregateKey, ChildKind, ChildRows, CompanyRow};
use async_trait::async_trait;
use thiserror::Error;

/// In-process store used by tests and dry runs.
pub mod memory;

/// Errors surfaced by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No connection could be acquired.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// A statement failed.
    #[error("query failed: {0}")]
    Query(String),
    /// A child row referenced a company that does not exist.
    #[error("{table} row references missing company '{company_uid}'")]
    ForeignKey { table: &'static str, company_uid: String },
    /// A primary key was written twice.
    #[error("duplicate key '{key}' in {table}")]
    DuplicateKey { table: &'static str, key: String },
}

/// A source of transactions against the output database.
#[async_trait]
pub trait Store: Send + Sync {
    /// The transaction type handed out by [`Store::begin`].
    type Tx: StoreTransaction;

    /// Acquires a connection and opens a transaction on it.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

/// One open transaction. Every method runs inside it.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Whether a `company` row with this primary key exists.
    async fn company_exists(&mut self, key: &AggregateKey) -> Result<bool, StoreError>;

    /// Inserts a new `company` row.
    async fn insert_company(&mut self, row: &CompanyRow) -> Result<(), StoreError>;

    /// Overwrites the data columns of an existing `company` row, keeping its key.
    async fn update_company(&mut self, row: &CompanyRow) -> Result<(), StoreError>;

    /// Deletes every row of `kind` belonging to `key`. Returns the number removed.
    async fn delete_children(
        &mut self,
        kind: ChildKind,
        key: &AggregateKey,
    ) -> Result<u64, StoreError>;

    /// Inserts a child collection. Empty collections are a no-op.
    async fn insert_children(&mut self, rows: ChildRows<'_>) -> Result<(), StoreError>;

    /// Makes every write of this transaction durable.
    async fn commit(self) -> Result<(), StoreError>;

    /// Discards every write of this transaction.
    async fn rollback(self) -> Result<(), StoreError>;
}
