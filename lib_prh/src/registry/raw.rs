//! # Raw Source Document
//!
//! Strongly-typed mirror of one company record returned by the PRH BIS v1 API.
//! Fields are camelCase on the wire and all optional; anything the registry
//! adds later is collected into `RawCompany::extra` instead of failing.

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// One entry of a child field. `null` and `{}` carry no data and hold `None`.
#[derive(Debug, Clone)]
pub struct Element<T>(pub Option<T>);

impl<'de, T: DeserializeOwned> Deserialize<'de> for Element<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match &value {
            Value::Null => Ok(Element(None)),
            Value::Object(map) if map.is_empty() => Ok(Element(None)),
            _ => T::deserialize(value).map(|item| Element(Some(item))).map_err(de::Error::custom),
        }
    }
}

/// A child field that may arrive as a list, a single object, or `null`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged, bound(deserialize = "T: DeserializeOwned"))]
pub enum OneOrMany<T> {
    Many(Vec<Element<T>>),
    One(Element<T>),
}

impl<T> OneOrMany<T> {
    /// The entries that carry data, in source order.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items.into_iter().filter_map(|item| item.0).collect(),
            OneOrMany::One(item) => item.0.into_iter().collect(),
        }
    }
}

/// Flattens an optional child field into a list; absent, `null` and `{}` give an empty list.
pub fn elements<T>(field: Option<OneOrMany<T>>) -> Vec<T> {
    field.map(OneOrMany::into_vec).unwrap_or_default()
}

/// Accepts a JSON string or number and keeps it as text.
fn deserialize_lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

/// The top-level company document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCompany {
    pub business_id: Option<String>,
    pub registration_date: Option<String>,
    pub company_form: Option<String>,
    pub details_uri: Option<String>,
    pub name: Option<String>,

    #[serde(default)]
    pub names: Option<OneOrMany<RawName>>,
    #[serde(default)]
    pub auxiliary_names: Option<OneOrMany<RawName>>,
    #[serde(default)]
    pub addresses: Option<OneOrMany<RawAddress>>,
    #[serde(default)]
    pub company_forms: Option<OneOrMany<RawTypedName>>,
    #[serde(default)]
    pub liquidations: Option<OneOrMany<RawTypedName>>,
    #[serde(default)]
    pub business_lines: Option<OneOrMany<RawBusinessLine>>,
    #[serde(default)]
    pub languages: Option<OneOrMany<RawName>>,
    #[serde(default)]
    pub registered_offices: Option<OneOrMany<RawName>>,
    #[serde(default)]
    pub contact_details: Option<OneOrMany<RawContactDetail>>,
    #[serde(default)]
    pub registered_entries: Option<OneOrMany<RawRegisteredEntry>>,
    #[serde(default)]
    pub business_id_changes: Option<OneOrMany<RawBusinessIdChange>>,

    /// Fields this crate does not know about yet.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Shape shared by names, auxiliary names, languages and registered offices.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawName {
    pub source: Option<i64>,
    pub order: Option<i32>,
    pub version: Option<i64>,
    pub registration_date: Option<String>,
    pub end_date: Option<String>,
    pub name: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAddress {
    pub source: Option<i64>,
    pub version: Option<i64>,
    pub registration_date: Option<String>,
    pub end_date: Option<String>,
    pub care_of: Option<String>,
    pub street: Option<String>,
    pub post_code: Option<String>,
    pub city: Option<String>,
    pub language: Option<String>,
    #[serde(rename = "type")]
    pub address_type: Option<i64>,
    pub country: Option<String>,
}

/// Company forms and liquidations: a name plus a free-text type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTypedName {
    pub source: Option<i64>,
    pub version: Option<i64>,
    pub registration_date: Option<String>,
    pub end_date: Option<String>,
    pub name: Option<String>,
    pub language: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "deserialize_lenient_text")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBusinessLine {
    pub source: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub code: Option<String>,
    pub order: Option<i32>,
    pub version: Option<i64>,
    pub registration_date: Option<String>,
    pub end_date: Option<String>,
    pub name: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContactDetail {
    pub source: Option<i64>,
    pub version: Option<i64>,
    pub registration_date: Option<String>,
    pub end_date: Option<String>,
    pub language: Option<String>,
    #[serde(rename = "type")]
    pub contact_type: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRegisteredEntry {
    pub description: Option<String>,
    pub status: Option<i64>,
    pub registration_date: Option<String>,
    pub end_date: Option<String>,
    pub register: Option<i64>,
    pub language: Option<String>,
    pub authority: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBusinessIdChange {
    pub source: Option<i64>,
    pub description: Option<String>,
    pub reason: Option<String>,
    pub change_date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub change: Option<String>,
    pub old_business_id: Option<String>,
    pub new_business_id: Option<String>,
    pub language: Option<String>,
}
