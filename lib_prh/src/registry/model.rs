//! # Company Aggregate Data Model
//!
//! One decomposed company: a parent [`CompanyRow`] keyed by the aggregate key
//! plus eleven ordered child collections. Every row produced by one
//! decomposition carries the same `data_fetched` timestamp.

use super::identifier::AggregateKey;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;

/// The eleven child collections of a company, each stored in its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildKind {
    Names,
    AuxiliaryNames,
    Addresses,
    CompanyForms,
    Liquidations,
    BusinessLines,
    Languages,
    RegisteredOffices,
    ContactDetails,
    RegisteredEntries,
    BusinessIdChanges,
}

impl ChildKind {
    /// All kinds, in the order they are written during a sync.
    pub const ALL: [ChildKind; 11] = [
        ChildKind::Names,
        ChildKind::AuxiliaryNames,
        ChildKind::Addresses,
        ChildKind::CompanyForms,
        ChildKind::Liquidations,
        ChildKind::BusinessLines,
        ChildKind::Languages,
        ChildKind::RegisteredOffices,
        ChildKind::ContactDetails,
        ChildKind::RegisteredEntries,
        ChildKind::BusinessIdChanges,
    ];

    /// Database table holding rows of this kind.
    pub fn table(self) -> &'static str {
        match self {
            ChildKind::Names => "company_name",
            ChildKind::AuxiliaryNames => "auxiliary_name",
            ChildKind::Addresses => "address",
            ChildKind::CompanyForms => "company_form",
            ChildKind::Liquidations => "liquidation",
            ChildKind::BusinessLines => "business_line",
            ChildKind::Languages => "company_language",
            ChildKind::RegisteredOffices => "registered_office",
            ChildKind::ContactDetails => "contact_detail",
            ChildKind::RegisteredEntries => "registered_entry",
            ChildKind::BusinessIdChanges => "business_id_change",
        }
    }

    /// Key of the collection in the source document.
    pub fn source_field(self) -> &'static str {
        match self {
            ChildKind::Names => "names",
            ChildKind::AuxiliaryNames => "auxiliaryNames",
            ChildKind::Addresses => "addresses",
            ChildKind::CompanyForms => "companyForms",
            ChildKind::Liquidations => "liquidations",
            ChildKind::BusinessLines => "businessLines",
            ChildKind::Languages => "languages",
            ChildKind::RegisteredOffices => "registeredOffices",
            ChildKind::ContactDetails => "contactDetails",
            ChildKind::RegisteredEntries => "registeredEntries",
            ChildKind::BusinessIdChanges => "businessIdChanges",
        }
    }
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// The `company` row. Primary key is the aggregate key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyRow {
    pub pk: AggregateKey,
    pub company_number: Option<String>,
    pub registration_date: Option<NaiveDate>,
    pub company_form: Option<String>,
    pub details_uri: Option<String>,
    pub company_name: Option<String>,
    pub data_fetched: DateTime<Utc>,
}

impl CompanyRow {
    /// The "empty aggregate" parent: key and timestamp set, every data field null.
    pub fn empty(pk: AggregateKey, data_fetched: DateTime<Utc>) -> Self {
        Self {
            pk,
            company_number: None,
            registration_date: None,
            company_form: None,
            details_uri: None,
            company_name: None,
            data_fetched,
        }
    }

    /// True when no data field is populated.
    pub fn is_empty(&self) -> bool {
        self.company_number.is_none()
            && self.registration_date.is_none()
            && self.company_form.is_none()
            && self.details_uri.is_none()
            && self.company_name.is_none()
    }
}

/// Columns every child row starts with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowHeader {
    /// Freshly generated for every row of every sync.
    pub pk: String,
    pub company_uid: AggregateKey,
    pub data_fetched: DateTime<Utc>,
}

/// Names, auxiliary names, languages and registered offices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NameRow {
    #[serde(flatten)]
    pub header: RowHeader,
    pub source: Option<&'static str>,
    pub order: Option<i32>,
    pub version: Option<&'static str>,
    pub registration_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub name: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressRow {
    #[serde(flatten)]
    pub header: RowHeader,
    pub source: Option<&'static str>,
    pub version: Option<&'static str>,
    pub registration_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub care_of: Option<String>,
    pub street: Option<String>,
    pub post_code: Option<String>,
    pub city: Option<String>,
    pub language: Option<String>,
    pub address_type: Option<&'static str>,
    pub country: Option<String>,
}

/// Company forms and liquidations; `kind` is stored as `form_type` or `liquidation_type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypedNameRow {
    #[serde(flatten)]
    pub header: RowHeader,
    pub source: Option<&'static str>,
    pub version: Option<&'static str>,
    pub registration_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub name: Option<String>,
    pub language: Option<String>,
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessLineRow {
    #[serde(flatten)]
    pub header: RowHeader,
    pub source: Option<&'static str>,
    pub code: Option<String>,
    pub order: Option<i32>,
    pub version: Option<&'static str>,
    pub registration_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub name: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactDetailRow {
    #[serde(flatten)]
    pub header: RowHeader,
    pub source: Option<&'static str>,
    pub version: Option<&'static str>,
    pub registration_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub language: Option<String>,
    pub contact_type: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisteredEntryRow {
    #[serde(flatten)]
    pub header: RowHeader,
    pub description: Option<String>,
    pub status: Option<&'static str>,
    pub registration_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub register: Option<&'static str>,
    pub language: Option<String>,
    pub authority: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessIdChangeRow {
    #[serde(flatten)]
    pub header: RowHeader,
    pub source: Option<&'static str>,
    pub description: Option<String>,
    pub reason: Option<String>,
    pub change_date: Option<NaiveDate>,
    pub change: Option<String>,
    pub old_company_number: Option<String>,
    pub new_company_number: Option<String>,
    pub language: Option<String>,
}

/// A borrowed view of one child collection, tagged with its kind.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum ChildRows<'a> {
    Names(&'a [NameRow]),
    AuxiliaryNames(&'a [NameRow]),
    Addresses(&'a [AddressRow]),
    CompanyForms(&'a [TypedNameRow]),
    Liquidations(&'a [TypedNameRow]),
    BusinessLines(&'a [BusinessLineRow]),
    Languages(&'a [NameRow]),
    RegisteredOffices(&'a [NameRow]),
    ContactDetails(&'a [ContactDetailRow]),
    RegisteredEntries(&'a [RegisteredEntryRow]),
    BusinessIdChanges(&'a [BusinessIdChangeRow]),
}

impl ChildRows<'_> {
    pub fn kind(&self) -> ChildKind {
        match self {
            ChildRows::Names(_) => ChildKind::Names,
            ChildRows::AuxiliaryNames(_) => ChildKind::AuxiliaryNames,
            ChildRows::Addresses(_) => ChildKind::Addresses,
            ChildRows::CompanyForms(_) => ChildKind::CompanyForms,
            ChildRows::Liquidations(_) => ChildKind::Liquidations,
            ChildRows::BusinessLines(_) => ChildKind::BusinessLines,
            ChildRows::Languages(_) => ChildKind::Languages,
            ChildRows::RegisteredOffices(_) => ChildKind::RegisteredOffices,
            ChildRows::ContactDetails(_) => ChildKind::ContactDetails,
            ChildRows::RegisteredEntries(_) => ChildKind::RegisteredEntries,
            ChildRows::BusinessIdChanges(_) => ChildKind::BusinessIdChanges,
        }
    }

    /// Headers of every row in the collection.
    pub fn headers(&self) -> Vec<&RowHeader> {
        match self {
            ChildRows::Names(rows)
            | ChildRows::AuxiliaryNames(rows)
            | ChildRows::Languages(rows)
            | ChildRows::RegisteredOffices(rows) => rows.iter().map(|r| &r.header).collect(),
            ChildRows::Addresses(rows) => rows.iter().map(|r| &r.header).collect(),
            ChildRows::CompanyForms(rows) | ChildRows::Liquidations(rows) => {
                rows.iter().map(|r| &r.header).collect()
            }
            ChildRows::BusinessLines(rows) => rows.iter().map(|r| &r.header).collect(),
            ChildRows::ContactDetails(rows) => rows.iter().map(|r| &r.header).collect(),
            ChildRows::RegisteredEntries(rows) => rows.iter().map(|r| &r.header).collect(),
            ChildRows::BusinessIdChanges(rows) => rows.iter().map(|r| &r.header).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ChildRows::Names(rows)
            | ChildRows::AuxiliaryNames(rows)
            | ChildRows::Languages(rows)
            | ChildRows::RegisteredOffices(rows) => rows.len(),
            ChildRows::Addresses(rows) => rows.len(),
            ChildRows::CompanyForms(rows) | ChildRows::Liquidations(rows) => rows.len(),
            ChildRows::BusinessLines(rows) => rows.len(),
            ChildRows::ContactDetails(rows) => rows.len(),
            ChildRows::RegisteredEntries(rows) => rows.len(),
            ChildRows::BusinessIdChanges(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One decomposed company, ready to be written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyAggregate {
    pub company: CompanyRow,
    pub names: Vec<NameRow>,
    pub auxiliary_names: Vec<NameRow>,
    pub addresses: Vec<AddressRow>,
    pub company_forms: Vec<TypedNameRow>,
    pub liquidations: Vec<TypedNameRow>,
    pub business_lines: Vec<BusinessLineRow>,
    pub languages: Vec<NameRow>,
    pub registered_offices: Vec<NameRow>,
    pub contact_details: Vec<ContactDetailRow>,
    pub registered_entries: Vec<RegisteredEntryRow>,
    pub business_id_changes: Vec<BusinessIdChangeRow>,
}

impl CompanyAggregate {
    /// The explicit "fetched, found nothing" aggregate.
    pub fn empty(key: AggregateKey, data_fetched: DateTime<Utc>) -> Self {
        Self {
            company: CompanyRow::empty(key, data_fetched),
            names: Vec::new(),
            auxiliary_names: Vec::new(),
            addresses: Vec::new(),
            company_forms: Vec::new(),
            liquidations: Vec::new(),
            business_lines: Vec::new(),
            languages: Vec::new(),
            registered_offices: Vec::new(),
            contact_details: Vec::new(),
            registered_entries: Vec::new(),
            business_id_changes: Vec::new(),
        }
    }

    pub fn key(&self) -> &AggregateKey {
        &self.company.pk
    }

    pub fn data_fetched(&self) -> DateTime<Utc> {
        self.company.data_fetched
    }

    /// True when the parent carries no identifying data.
    pub fn is_empty(&self) -> bool {
        self.company.is_empty()
    }

    /// Business id for log lines and error reports.
    pub fn company_number(&self) -> Option<&str> {
        self.company.company_number.as_deref()
    }

    /// Every child collection in write order.
    pub fn child_rows(&self) -> [ChildRows<'_>; 11] {
        [
            ChildRows::Names(&self.names),
            ChildRows::AuxiliaryNames(&self.auxiliary_names),
            ChildRows::Addresses(&self.addresses),
            ChildRows::CompanyForms(&self.company_forms),
            ChildRows::Liquidations(&self.liquidations),
            ChildRows::BusinessLines(&self.business_lines),
            ChildRows::Languages(&self.languages),
            ChildRows::RegisteredOffices(&self.registered_offices),
            ChildRows::ContactDetails(&self.contact_details),
            ChildRows::RegisteredEntries(&self.registered_entries),
            ChildRows::BusinessIdChanges(&self.business_id_changes),
        ]
    }

    /// Total number of child rows across all kinds.
    pub fn child_count(&self) -> usize {
        self.child_rows().iter().map(ChildRows::len).sum()
    }
}
