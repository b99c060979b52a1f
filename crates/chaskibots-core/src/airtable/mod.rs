//! Airtable REST API access.
//!
//! This module provides the `AirtableClient` for reading and writing
//! records in the ChaskiBots base, the `Formula` builder used for every
//! `filterByFormula` query, and the `TableStore` trait that the
//! repository and the reconciliation job are written against.
//!
//! Requests are authenticated with a bearer token (personal access token).

pub mod client;
pub mod error;
pub mod formula;
pub mod query;
pub mod record;
pub mod store;

pub use client::AirtableClient;
pub use error::ApiError;
pub use formula::{Formula, FormulaError, Value};
pub use query::{ListQuery, SortDirection};
pub use record::Record;
pub use store::TableStore;
