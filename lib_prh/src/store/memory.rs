//! # In-Memory Store
//!
//! A [`Store`] that keeps the `company` table and the eleven child tables in
//! process memory. A transaction validates its writes against a private view
//! of the tables and records them; commit replays the recorded writes onto the
//! committed tables under the lock, so overlapping transactions that touch
//! different companies both survive. A rollback (or a dropped transaction)
//! leaves nothing behind. Child inserts are checked against the parent table
//! the same way the database foreign keys are.
//!
//! Failures can be injected to exercise the engine's rollback and isolation
//! paths: an unavailable store refuses `begin`, and a poisoned aggregate key
//! makes every child insert for that key fail.

use super::{Store, StoreError, StoreTransaction};
use crate::registry::{AggregateKey, ChildKind, ChildRows, CompanyRow};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Stored child row with the table-level columns kept alongside the serialized row.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChild {
    pub pk: String,
    pub company_uid: AggregateKey,
    pub row: Value,
}

/// One write of a transaction, kept for replay at commit.
#[derive(Debug, Clone)]
enum Write {
    InsertCompany(CompanyRow),
    UpdateCompany(CompanyRow),
    DeleteChildren(ChildKind, AggregateKey),
    InsertChildren(ChildKind, Vec<StoredChild>),
}

#[derive(Debug, Clone, Default)]
struct Tables {
    companies: BTreeMap<AggregateKey, CompanyRow>,
    children: BTreeMap<ChildKind, Vec<StoredChild>>,
}

impl Tables {
    /// Applies one write with the table constraints enforced. Returns the affected row count.
    fn apply(&mut self, write: &Write) -> Result<u64, StoreError> {
        match write {
            Write::InsertCompany(row) => {
                if self.companies.contains_key(&row.pk) {
                    return Err(StoreError::DuplicateKey {
                        table: "company",
                        key: row.pk.to_string(),
                    });
                }
                self.companies.insert(row.pk.clone(), row.clone());
                Ok(1)
            }
            Write::UpdateCompany(row) => match self.companies.get_mut(&row.pk) {
                Some(existing) => {
                    *existing = row.clone();
                    Ok(1)
                }
                None => Err(StoreError::Query(format!("no company row '{}' to update", row.pk))),
            },
            Write::DeleteChildren(kind, key) => {
                let rows = self.children.entry(*kind).or_default();
                let before = rows.len();
                rows.retain(|row| &row.company_uid != key);
                Ok((before - rows.len()) as u64)
            }
            Write::InsertChildren(kind, staged) => {
                let table = kind.table();
                let rows = self.children.entry(*kind).or_default();
                for child in staged {
                    if !self.companies.contains_key(&child.company_uid) {
                        return Err(StoreError::ForeignKey {
                            table,
                            company_uid: child.company_uid.to_string(),
                        });
                    }
                    if rows.iter().any(|r| r.pk == child.pk) {
                        return Err(StoreError::DuplicateKey {
                            table,
                            key: child.pk.clone(),
                        });
                    }
                }
                rows.extend(staged.iter().cloned());
                Ok(staged.len() as u64)
            }
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    unavailable: AtomicBool,
    poisoned: std::sync::Mutex<HashSet<AggregateKey>>,
}

impl Faults {
    fn is_poisoned(&self, key: &AggregateKey) -> bool {
        self.poisoned
            .lock()
            .map(|keys| keys.contains(key))
            .unwrap_or(false)
    }
}

/// Cheap to clone; clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Faults>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `begin` fail with [`StoreError::Unavailable`] while `true`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes every child insert for `key` fail with [`StoreError::Query`].
    pub fn poison(&self, key: &AggregateKey) {
        if let Ok(mut keys) = self.faults.poisoned.lock() {
            keys.insert(key.clone());
        }
    }

    /// Committed `company` row for `key`.
    pub async fn company(&self, key: &AggregateKey) -> Option<CompanyRow> {
        self.tables.lock().await.companies.get(key).cloned()
    }

    pub async fn company_count(&self) -> usize {
        self.tables.lock().await.companies.len()
    }

    /// Committed rows of `kind` belonging to `key`, in insertion order.
    pub async fn children(&self, kind: ChildKind, key: &AggregateKey) -> Vec<StoredChild> {
        self.tables
            .lock()
            .await
            .children
            .get(&kind)
            .map(|rows| rows.iter().filter(|r| &r.company_uid == key).cloned().collect())
            .unwrap_or_default()
    }

    /// Committed child rows whose `company_uid` has no `company` row.
    pub async fn orphans(&self) -> Vec<StoredChild> {
        let tables = self.tables.lock().await;
        tables
            .children
            .values()
            .flatten()
            .filter(|row| !tables.companies.contains_key(&row.company_uid))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        if self.faults.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store marked unavailable".into()));
        }
        let working = self.tables.lock().await.clone();
        Ok(MemoryTransaction {
            committed: Arc::clone(&self.tables),
            faults: Arc::clone(&self.faults),
            working,
            writes: Vec::new(),
        })
    }
}

/// Pending writes plus the view they were validated against.
/// Dropping it without `commit` discards both.
#[derive(Debug)]
pub struct MemoryTransaction {
    committed: Arc<Mutex<Tables>>,
    faults: Arc<Faults>,
    working: Tables,
    writes: Vec<Write>,
}

impl MemoryTransaction {
    fn record(&mut self, write: Write) -> Result<u64, StoreError> {
        let affected = self.working.apply(&write)?;
        self.writes.push(write);
        Ok(affected)
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn company_exists(&mut self, key: &AggregateKey) -> Result<bool, StoreError> {
        Ok(self.working.companies.contains_key(key))
    }

    async fn insert_company(&mut self, row: &CompanyRow) -> Result<(), StoreError> {
        self.record(Write::InsertCompany(row.clone())).map(drop)
    }

    async fn update_company(&mut self, row: &CompanyRow) -> Result<(), StoreError> {
        self.record(Write::UpdateCompany(row.clone())).map(drop)
    }

    async fn delete_children(
        &mut self,
        kind: ChildKind,
        key: &AggregateKey,
    ) -> Result<u64, StoreError> {
        self.record(Write::DeleteChildren(kind, key.clone()))
    }

    async fn insert_children(&mut self, rows: ChildRows<'_>) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }
        let kind = rows.kind();
        let table = kind.table();

        let values = match serde_json::to_value(rows) {
            Ok(Value::Array(values)) => values,
            Ok(_) => return Err(StoreError::Query(format!("{table}: rows did not serialize to a list"))),
            Err(e) => return Err(StoreError::Query(format!("{table}: {e}"))),
        };

        let mut staged = Vec::with_capacity(values.len());
        for (header, row) in rows.headers().into_iter().zip(values) {
            if self.faults.is_poisoned(&header.company_uid) {
                return Err(StoreError::Query(format!(
                    "{table}: injected failure for company '{}'",
                    header.company_uid
                )));
            }
            staged.push(StoredChild {
                pk: header.pk.clone(),
                company_uid: header.company_uid.clone(),
                row,
            });
        }

        self.record(Write::InsertChildren(kind, staged)).map(drop)
    }

    /// Replays the recorded writes onto the committed tables. A write that no
    /// longer fits the committed state fails the commit and publishes nothing.
    async fn commit(self) -> Result<(), StoreError> {
        let mut committed = self.committed.lock().await;
        let mut next = committed.clone();
        for write in &self.writes {
            next.apply(write)?;
        }
        *committed = next;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
