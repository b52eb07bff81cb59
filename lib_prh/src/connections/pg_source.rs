//! Candidate companies read from the input database.

use super::db_postgres::Database;
use crate::ingestors::sources::{Candidate, CandidateSource, SourceError};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::{debug, error};

/// Every Finnish company in the input database.
pub const DEFAULT_CANDIDATE_QUERY: &str =
    "SELECT company_number, pk FROM company WHERE country_code = 'FI'";

/// Runs a candidate query against the input database.
///
/// A custom query must project a `company_number` and a `pk` column; `pk`
/// becomes the aggregate key hint.
#[derive(Debug, Clone)]
pub struct PgCandidateSource {
    pool: PgPool,
}

impl PgCandidateSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl From<Database> for PgCandidateSource {
    fn from(db: Database) -> Self {
        Self::new(db.pool)
    }
}

fn candidate_from_row(row: &PgRow) -> Result<Candidate, sqlx::Error> {
    Ok(Candidate {
        company_number: row.try_get::<Option<String>, _>("company_number")?.unwrap_or_default(),
        company_uid: row.try_get("pk")?,
    })
}

#[async_trait]
impl CandidateSource for PgCandidateSource {
    async fn candidates(&self, filter: Option<&str>) -> Result<Vec<Candidate>, SourceError> {
        let sql = filter.unwrap_or(DEFAULT_CANDIDATE_QUERY);
        debug!(query = sql, "Querying candidate companies");

        let rows = sqlx::query(sql).fetch_all(&self.pool).await.map_err(|e| {
            error!(error = %e, "Error querying candidate companies");
            match e {
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                    SourceError::Unavailable(e.to_string())
                }
                other => SourceError::Query(other.to_string()),
            }
        })?;

        rows.iter()
            .map(candidate_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SourceError::Query(e.to_string()))
    }
}
