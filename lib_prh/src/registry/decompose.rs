//! # Entity Decomposer
//!
//! Splits one raw company document into a [`CompanyAggregate`]. No I/O happens
//! here; the only non-determinism is the freshly generated child row keys.

use super::identifier::{new_row_key, AggregateKey};
use super::model::{
    AddressRow, BusinessIdChangeRow, BusinessLineRow, ChildKind, CompanyAggregate, CompanyRow,
    ContactDetailRow, NameRow, RegisteredEntryRow, RowHeader, TypedNameRow,
};
use super::raw::{
    elements, OneOrMany, RawAddress, RawBusinessIdChange, RawBusinessLine, RawCompany,
    RawContactDetail, RawName, RawRegisteredEntry, RawTypedName,
};
use super::translate::{
    address_type_label, entry_authority_label, entry_register_label, entry_status_label,
    parse_date, source_label, version_label, TranslateError,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

/// Why a document could not be turned into rows.
#[derive(Debug, Error)]
pub enum DecomposeError {
    /// The document does not match the expected structure.
    #[error("malformed company document: {0}")]
    Malformed(#[from] serde_json::Error),
    /// A date field failed to parse.
    #[error("{kind} field '{field}': {source}")]
    Date {
        kind: &'static str,
        field: &'static str,
        #[source]
        source: TranslateError,
    },
}

/// Builds the aggregate for `key` from `raw`.
///
/// `None` or JSON `null` yields [`CompanyAggregate::empty`].
pub fn decompose(
    key: &AggregateKey,
    data_fetched: DateTime<Utc>,
    raw: Option<&Value>,
) -> Result<CompanyAggregate, DecomposeError> {
    let document = match raw {
        None | Some(Value::Null) => return Ok(CompanyAggregate::empty(key.clone(), data_fetched)),
        Some(document) => RawCompany::deserialize(document)?,
    };

    if !document.extra.is_empty() {
        let fields: Vec<&str> = document.extra.keys().map(String::as_str).collect();
        info!(company_uid = %key, extra_fields = ?fields, "Ignoring unknown fields in company document");
    }

    let builder = RowBuilder { key, data_fetched };

    Ok(CompanyAggregate {
        company: builder.company(&document)?,
        names: builder.collect(ChildKind::Names, document.names, RowBuilder::name)?,
        auxiliary_names: builder.collect(
            ChildKind::AuxiliaryNames,
            document.auxiliary_names,
            RowBuilder::name,
        )?,
        addresses: builder.collect(ChildKind::Addresses, document.addresses, RowBuilder::address)?,
        company_forms: builder.collect(
            ChildKind::CompanyForms,
            document.company_forms,
            RowBuilder::typed_name,
        )?,
        liquidations: builder.collect(
            ChildKind::Liquidations,
            document.liquidations,
            RowBuilder::typed_name,
        )?,
        business_lines: builder.collect(
            ChildKind::BusinessLines,
            document.business_lines,
            RowBuilder::business_line,
        )?,
        languages: builder.collect(ChildKind::Languages, document.languages, RowBuilder::name)?,
        registered_offices: builder.collect(
            ChildKind::RegisteredOffices,
            document.registered_offices,
            RowBuilder::name,
        )?,
        contact_details: builder.collect(
            ChildKind::ContactDetails,
            document.contact_details,
            RowBuilder::contact_detail,
        )?,
        registered_entries: builder.collect(
            ChildKind::RegisteredEntries,
            document.registered_entries,
            RowBuilder::registered_entry,
        )?,
        business_id_changes: builder.collect(
            ChildKind::BusinessIdChanges,
            document.business_id_changes,
            RowBuilder::business_id_change,
        )?,
    })
}

/// Stamps every row with the same aggregate key and fetch time.
struct RowBuilder<'a> {
    key: &'a AggregateKey,
    data_fetched: DateTime<Utc>,
}

type DateResult = Result<Option<NaiveDate>, DecomposeError>;

fn date(kind: &'static str, field: &'static str, raw: Option<&str>) -> DateResult {
    parse_date(raw).map_err(|source| DecomposeError::Date { kind, field, source })
}

impl RowBuilder<'_> {
    fn header(&self) -> RowHeader {
        RowHeader {
            pk: new_row_key(),
            company_uid: self.key.clone(),
            data_fetched: self.data_fetched,
        }
    }

    fn collect<R, T>(
        &self,
        kind: ChildKind,
        field: Option<OneOrMany<R>>,
        build: fn(&Self, &'static str, R) -> Result<T, DecomposeError>,
    ) -> Result<Vec<T>, DecomposeError> {
        elements(field)
            .into_iter()
            .map(|raw| build(self, kind.table(), raw))
            .collect()
    }

    fn company(&self, raw: &RawCompany) -> Result<CompanyRow, DecomposeError> {
        Ok(CompanyRow {
            pk: self.key.clone(),
            company_number: raw.business_id.clone(),
            registration_date: date("company", "registrationDate", raw.registration_date.as_deref())?,
            company_form: raw.company_form.clone(),
            details_uri: raw.details_uri.clone(),
            company_name: raw.name.clone(),
            data_fetched: self.data_fetched,
        })
    }

    fn name(&self, kind: &'static str, raw: RawName) -> Result<NameRow, DecomposeError> {
        Ok(NameRow {
            header: self.header(),
            source: source_label(raw.source),
            order: raw.order,
            version: version_label(raw.version),
            registration_date: date(kind, "registrationDate", raw.registration_date.as_deref())?,
            end_date: date(kind, "endDate", raw.end_date.as_deref())?,
            name: raw.name,
            language: raw.language,
        })
    }

    fn address(&self, kind: &'static str, raw: RawAddress) -> Result<AddressRow, DecomposeError> {
        Ok(AddressRow {
            header: self.header(),
            source: source_label(raw.source),
            version: version_label(raw.version),
            registration_date: date(kind, "registrationDate", raw.registration_date.as_deref())?,
            end_date: date(kind, "endDate", raw.end_date.as_deref())?,
            care_of: raw.care_of,
            street: raw.street,
            post_code: raw.post_code,
            city: raw.city,
            language: raw.language,
            address_type: address_type_label(raw.address_type),
            country: raw.country,
        })
    }

    fn typed_name(
        &self,
        kind: &'static str,
        raw: RawTypedName,
    ) -> Result<TypedNameRow, DecomposeError> {
        Ok(TypedNameRow {
            header: self.header(),
            source: source_label(raw.source),
            version: version_label(raw.version),
            registration_date: date(kind, "registrationDate", raw.registration_date.as_deref())?,
            end_date: date(kind, "endDate", raw.end_date.as_deref())?,
            name: raw.name,
            language: raw.language,
            kind: raw.kind,
        })
    }

    fn business_line(
        &self,
        kind: &'static str,
        raw: RawBusinessLine,
    ) -> Result<BusinessLineRow, DecomposeError> {
        Ok(BusinessLineRow {
            header: self.header(),
            source: source_label(raw.source),
            code: raw.code,
            order: raw.order,
            version: version_label(raw.version),
            registration_date: date(kind, "registrationDate", raw.registration_date.as_deref())?,
            end_date: date(kind, "endDate", raw.end_date.as_deref())?,
            name: raw.name,
            language: raw.language,
        })
    }

    fn contact_detail(
        &self,
        kind: &'static str,
        raw: RawContactDetail,
    ) -> Result<ContactDetailRow, DecomposeError> {
        Ok(ContactDetailRow {
            header: self.header(),
            source: source_label(raw.source),
            version: version_label(raw.version),
            registration_date: date(kind, "registrationDate", raw.registration_date.as_deref())?,
            end_date: date(kind, "endDate", raw.end_date.as_deref())?,
            language: raw.language,
            contact_type: raw.contact_type,
            value: raw.value,
        })
    }

    fn registered_entry(
        &self,
        kind: &'static str,
        raw: RawRegisteredEntry,
    ) -> Result<RegisteredEntryRow, DecomposeError> {
        Ok(RegisteredEntryRow {
            header: self.header(),
            description: raw.description,
            status: entry_status_label(raw.status),
            registration_date: date(kind, "registrationDate", raw.registration_date.as_deref())?,
            end_date: date(kind, "endDate", raw.end_date.as_deref())?,
            register: entry_register_label(raw.register),
            language: raw.language,
            authority: entry_authority_label(raw.authority),
        })
    }

    fn business_id_change(
        &self,
        kind: &'static str,
        raw: RawBusinessIdChange,
    ) -> Result<BusinessIdChangeRow, DecomposeError> {
        Ok(BusinessIdChangeRow {
            header: self.header(),
            source: source_label(raw.source),
            description: raw.description,
            reason: raw.reason,
            change_date: date(kind, "changeDate", raw.change_date.as_deref())?,
            change: raw.change,
            old_company_number: raw.old_business_id,
            new_company_number: raw.new_business_id,
            language: raw.language,
        })
    }
}
