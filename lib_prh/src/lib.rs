//! Synchronizes company records from the Finnish PRH open-data registry into a
//! relational store.
//!
//! The registry model, the decomposer, the sync engine and the in-memory store
//! are always compiled. Network, database, configuration and logging support
//! sit behind the `retrieve`, `connections`, `configs` and `loggers` features.

// Always available
pub mod ingestors;
pub mod registry;
pub mod store;

#[cfg(feature = "configs")]
pub mod configs;
#[cfg(feature = "connections")]
pub mod connections;
#[cfg(feature = "loggers")]
pub mod loggers;
#[cfg(feature = "retrieve")]
pub mod retrieve;

pub use ingestors::{ItemResult, Orchestrator, Outcome, SyncEngine};
pub use registry::{decompose, AggregateKey, CompanyAggregate, CompanyNumber};
