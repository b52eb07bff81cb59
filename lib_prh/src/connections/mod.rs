//! # Connections Module
//!
//! PostgreSQL access for both ends of a sync: the input database the
//! candidates are read from and the output database the aggregates are
//! written to.

/// Connection pooling, health checks and schema setup.
pub mod db_postgres;
/// Candidate query against the input database.
pub mod pg_source;
/// Transactional `Store` over the output database.
pub mod pg_store;

pub use db_postgres::{Database, DbError};
pub use pg_source::{PgCandidateSource, DEFAULT_CANDIDATE_QUERY};
pub use pg_store::{PgStore, PgTransaction};
