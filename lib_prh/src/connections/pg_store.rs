//! # PostgreSQL Store
//!
//! [`Store`] over a `sqlx` pool. Each `begin` checks a connection out of the
//! pool and opens a transaction on it; the connection goes back to the pool
//! when the transaction is committed, rolled back or dropped.

use super::db_postgres::Database;
use crate::registry::model::{
    AddressRow, BusinessIdChangeRow, BusinessLineRow, ContactDetailRow, NameRow,
    RegisteredEntryRow, RowHeader, TypedNameRow,
};
use crate::registry::{AggregateKey, ChildKind, ChildRows, CompanyRow};
use crate::store::{Store, StoreError, StoreTransaction};
use async_trait::async_trait;
use sqlx::error::ErrorKind;
use sqlx::postgres::{PgConnection, PgPool};
use sqlx::query_builder::Separated;
use sqlx::{Postgres, QueryBuilder, Transaction};

type Row<'qb, 'args> = Separated<'qb, 'args, Postgres, &'static str>;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl From<Database> for PgStore {
    fn from(db: Database) -> Self {
        Self::new(db.pool)
    }
}

#[async_trait]
impl Store for PgStore {
    type Tx = PgTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(PgTransaction { tx })
    }
}

pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

/// Maps constraint violations onto the matching [`StoreError`] variants.
fn store_error(table: &'static str, key: &str, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        match db.kind() {
            ErrorKind::ForeignKeyViolation => {
                return StoreError::ForeignKey {
                    table,
                    company_uid: key.to_string(),
                }
            }
            ErrorKind::UniqueViolation => {
                return StoreError::DuplicateKey {
                    table,
                    key: key.to_string(),
                }
            }
            _ => {}
        }
    }
    StoreError::Query(format!("{table}: {e}"))
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn company_exists(&mut self, key: &AggregateKey) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM company WHERE pk = $1)")
            .bind(key.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| store_error("company", key.as_str(), e))
    }

    async fn insert_company(&mut self, row: &CompanyRow) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO company \
             (pk, company_number, registration_date, company_form, details_uri, company_name, data_fetched) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(row.pk.as_str())
        .bind(row.company_number.as_deref())
        .bind(row.registration_date)
        .bind(row.company_form.as_deref())
        .bind(row.details_uri.as_deref())
        .bind(row.company_name.as_deref())
        .bind(row.data_fetched)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| store_error("company", row.pk.as_str(), e))?;
        Ok(())
    }

    async fn update_company(&mut self, row: &CompanyRow) -> Result<(), StoreError> {
        let done = sqlx::query(
            "UPDATE company SET company_number = $2, registration_date = $3, company_form = $4, \
             details_uri = $5, company_name = $6, data_fetched = $7 WHERE pk = $1",
        )
        .bind(row.pk.as_str())
        .bind(row.company_number.as_deref())
        .bind(row.registration_date)
        .bind(row.company_form.as_deref())
        .bind(row.details_uri.as_deref())
        .bind(row.company_name.as_deref())
        .bind(row.data_fetched)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| store_error("company", row.pk.as_str(), e))?;

        if done.rows_affected() == 0 {
            return Err(StoreError::Query(format!("no company row '{}' to update", row.pk)));
        }
        Ok(())
    }

    async fn delete_children(
        &mut self,
        kind: ChildKind,
        key: &AggregateKey,
    ) -> Result<u64, StoreError> {
        let sql = format!("DELETE FROM {} WHERE company_uid = $1", kind.table());
        let done = sqlx::query(&sql)
            .bind(key.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| store_error(kind.table(), key.as_str(), e))?;
        Ok(done.rows_affected())
    }

    async fn insert_children(&mut self, rows: ChildRows<'_>) -> Result<(), StoreError> {
        let kind = rows.kind();
        let conn: &mut PgConnection = &mut self.tx;
        let inserted = match rows {
            ChildRows::Names(r)
            | ChildRows::AuxiliaryNames(r)
            | ChildRows::Languages(r)
            | ChildRows::RegisteredOffices(r) => insert_rows(conn, kind, r).await,
            ChildRows::Addresses(r) => insert_rows(conn, kind, r).await,
            ChildRows::CompanyForms(r) | ChildRows::Liquidations(r) => {
                insert_rows(conn, kind, r).await
            }
            ChildRows::BusinessLines(r) => insert_rows(conn, kind, r).await,
            ChildRows::ContactDetails(r) => insert_rows(conn, kind, r).await,
            ChildRows::RegisteredEntries(r) => insert_rows(conn, kind, r).await,
            ChildRows::BusinessIdChanges(r) => insert_rows(conn, kind, r).await,
        };

        inserted.map_err(|e| {
            let key = rows
                .headers()
                .first()
                .map(|h| h.company_uid.to_string())
                .unwrap_or_default();
            store_error(kind.table(), &key, e)
        })
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| StoreError::Query(format!("commit: {e}")))
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| StoreError::Query(format!("rollback: {e}")))
    }
}

/// Multi-row `INSERT` for one child table.
async fn insert_rows<R: PgChildRow>(
    conn: &mut PgConnection,
    kind: ChildKind,
    rows: &[R],
) -> Result<(), sqlx::Error> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut query = QueryBuilder::<Postgres>::new(insert_prefix(kind, R::columns(kind)));
    query.push_values(rows, |mut b, row| {
        let header = row.header();
        b.push_bind(header.pk.clone())
            .push_bind(header.company_uid.as_str().to_owned())
            .push_bind(header.data_fetched);
        row.push_payload(kind, &mut b);
    });
    query.build().execute(conn).await?;
    Ok(())
}

fn insert_prefix(kind: ChildKind, columns: &str) -> String {
    format!(
        "INSERT INTO {} (pk, company_uid, data_fetched, {}) ",
        kind.table(),
        columns
    )
}

/// Column list and bind order of one child row shape.
trait PgChildRow: Sync {
    fn columns(kind: ChildKind) -> &'static str;
    fn header(&self) -> &RowHeader;
    fn push_payload(&self, kind: ChildKind, b: &mut Row<'_, '_>);
}

impl PgChildRow for NameRow {
    fn columns(kind: ChildKind) -> &'static str {
        match kind {
            ChildKind::Languages => "source, version, registration_date, end_date, name, language",
            _ => r#"source, "order", version, registration_date, end_date, name, language"#,
        }
    }

    fn header(&self) -> &RowHeader {
        &self.header
    }

    fn push_payload(&self, kind: ChildKind, b: &mut Row<'_, '_>) {
        b.push_bind(self.source);
        if kind != ChildKind::Languages {
            b.push_bind(self.order);
        }
        b.push_bind(self.version)
            .push_bind(self.registration_date)
            .push_bind(self.end_date)
            .push_bind(self.name.clone())
            .push_bind(self.language.clone());
    }
}

impl PgChildRow for AddressRow {
    fn columns(_: ChildKind) -> &'static str {
        "source, version, registration_date, end_date, care_of, street, post_code, city, \
         language, address_type, country"
    }

    fn header(&self) -> &RowHeader {
        &self.header
    }

    fn push_payload(&self, _: ChildKind, b: &mut Row<'_, '_>) {
        b.push_bind(self.source)
            .push_bind(self.version)
            .push_bind(self.registration_date)
            .push_bind(self.end_date)
            .push_bind(self.care_of.clone())
            .push_bind(self.street.clone())
            .push_bind(self.post_code.clone())
            .push_bind(self.city.clone())
            .push_bind(self.language.clone())
            .push_bind(self.address_type)
            .push_bind(self.country.clone());
    }
}

impl PgChildRow for TypedNameRow {
    fn columns(kind: ChildKind) -> &'static str {
        match kind {
            ChildKind::Liquidations => {
                "source, version, registration_date, end_date, name, language, liquidation_type"
            }
            _ => "source, version, registration_date, end_date, name, language, form_type",
        }
    }

    fn header(&self) -> &RowHeader {
        &self.header
    }

    fn push_payload(&self, _: ChildKind, b: &mut Row<'_, '_>) {
        b.push_bind(self.source)
            .push_bind(self.version)
            .push_bind(self.registration_date)
            .push_bind(self.end_date)
            .push_bind(self.name.clone())
            .push_bind(self.language.clone())
            .push_bind(self.kind.clone());
    }
}

impl PgChildRow for BusinessLineRow {
    fn columns(_: ChildKind) -> &'static str {
        r#"source, code, "order", version, registration_date, end_date, name, language"#
    }

    fn header(&self) -> &RowHeader {
        &self.header
    }

    fn push_payload(&self, _: ChildKind, b: &mut Row<'_, '_>) {
        b.push_bind(self.source)
            .push_bind(self.code.clone())
            .push_bind(self.order)
            .push_bind(self.version)
            .push_bind(self.registration_date)
            .push_bind(self.end_date)
            .push_bind(self.name.clone())
            .push_bind(self.language.clone());
    }
}

impl PgChildRow for ContactDetailRow {
    fn columns(_: ChildKind) -> &'static str {
        "source, version, registration_date, end_date, language, contact_type, value"
    }

    fn header(&self) -> &RowHeader {
        &self.header
    }

    fn push_payload(&self, _: ChildKind, b: &mut Row<'_, '_>) {
        b.push_bind(self.source)
            .push_bind(self.version)
            .push_bind(self.registration_date)
            .push_bind(self.end_date)
            .push_bind(self.language.clone())
            .push_bind(self.contact_type.clone())
            .push_bind(self.value.clone());
    }
}

impl PgChildRow for RegisteredEntryRow {
    fn columns(_: ChildKind) -> &'static str {
        "description, status, registration_date, end_date, register, language, authority"
    }

    fn header(&self) -> &RowHeader {
        &self.header
    }

    fn push_payload(&self, _: ChildKind, b: &mut Row<'_, '_>) {
        b.push_bind(self.description.clone())
            .push_bind(self.status)
            .push_bind(self.registration_date)
            .push_bind(self.end_date)
            .push_bind(self.register)
            .push_bind(self.language.clone())
            .push_bind(self.authority);
    }
}

impl PgChildRow for BusinessIdChangeRow {
    fn columns(_: ChildKind) -> &'static str {
        "source, description, reason, change_date, change, old_company_number, \
         new_company_number, language"
    }

    fn header(&self) -> &RowHeader {
        &self.header
    }

    fn push_payload(&self, _: ChildKind, b: &mut Row<'_, '_>) {
        b.push_bind(self.source)
            .push_bind(self.description.clone())
            .push_bind(self.reason.clone())
            .push_bind(self.change_date)
            .push_bind(self.change.clone())
            .push_bind(self.old_company_number.clone())
            .push_bind(self.new_company_number.clone())
            .push_bind(self.language.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_count(columns: &str) -> usize {
        columns.split(',').count()
    }

    #[test]
    fn test_language_rows_have_no_order_column() {
        assert!(!NameRow::columns(ChildKind::Languages).contains("order"));
        assert!(NameRow::columns(ChildKind::RegisteredOffices).contains(r#""order""#));
        assert_eq!(column_count(NameRow::columns(ChildKind::Names)), 7);
    }

    #[test]
    fn test_typed_name_column_follows_kind() {
        assert!(TypedNameRow::columns(ChildKind::Liquidations).ends_with("liquidation_type"));
        assert!(TypedNameRow::columns(ChildKind::CompanyForms).ends_with("form_type"));
    }

    #[test]
    fn test_insert_prefix_targets_kind_table() {
        assert_eq!(
            insert_prefix(ChildKind::Addresses, "city"),
            "INSERT INTO address (pk, company_uid, data_fetched, city) "
        );
    }

    #[test]
    fn test_columns_exist_in_schema() {
        let schema = super::super::db_postgres::SCHEMA_SQL;
        let all = [
            NameRow::columns(ChildKind::Names),
            AddressRow::columns(ChildKind::Addresses),
            TypedNameRow::columns(ChildKind::Liquidations),
            BusinessLineRow::columns(ChildKind::BusinessLines),
            ContactDetailRow::columns(ChildKind::ContactDetails),
            RegisteredEntryRow::columns(ChildKind::RegisteredEntries),
            BusinessIdChangeRow::columns(ChildKind::BusinessIdChanges),
        ];
        for columns in all {
            for column in columns.split(',') {
                let column = column.trim();
                assert!(schema.contains(&format!("    {column} ")), "{column} not in schema");
            }
        }
    }
}
