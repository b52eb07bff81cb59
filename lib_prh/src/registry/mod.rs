//! # PRH Registry Module
//!
//! Everything that knows the shape of the Finnish Patent and Registration
//! Office (PRH) company data: identifiers, the raw document, the relational
//! model it is decomposed into, and the translators between the two.
//!
//! ## Contained Modules:
//!
//! - **`identifier`**: `CompanyNumber` validation and the `AggregateKey` shared
//!   by a company and its child rows.
//! - **`translate`**: code-to-label mappings and date parsing.
//! - **`raw`**: serde model of the source document.
//! - **`model`**: the parent row, the eleven child row kinds and `CompanyAggregate`.
//! - **`decompose`**: raw document to aggregate.
//! - **`apicall`** (feature `retrieve`): the rate-limited PRH open-data fetcher.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Rate-limited client for the PRH BIS v1 open-data API.
#[cfg(feature = "retrieve")]
pub mod apicall;
/// Raw document to `CompanyAggregate`.
pub mod decompose;
/// Business id validation and aggregate keys.
pub mod identifier;
/// Parent and child row types.
pub mod model;
/// Serde model of the source document.
pub mod raw;
/// Code-to-label mappings and date parsing.
pub mod translate;

pub use decompose::{decompose, DecomposeError};
pub use identifier::{AggregateKey, CompanyNumber, IdentifierError};
pub use model::{ChildKind, ChildRows, CompanyAggregate, CompanyRow};
