//! Core library for the ChaskiBots EDU backend.
//!
//! All persistent data lives in Airtable. This crate provides:
//!
//! - `airtable`: typed REST client, record shapes and the formula builder
//! - `cache`: in-memory TTL cache and the cache key builder
//! - `models`: domain types (levels, courses, users, assignments, tasks)
//! - `repository`: cached resource accessors shared by the HTTP handlers
//! - `sync`: the teacher-course level reconciliation job
//! - `config`: file + environment configuration

pub mod airtable;
pub mod cache;
pub mod config;
pub mod models;
pub mod repository;
pub mod sync;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use airtable::{AirtableClient, ApiError, Formula, ListQuery, Record, TableStore};
pub use cache::Cache;
pub use config::Config;
pub use repository::Repository;
