//! In-memory response caching.
//!
//! This module provides the `Cache` used to avoid redundant Airtable
//! calls, and the `keys` functions that name cached entries. Entries
//! expire after a per-resource TTL and are dropped by prefix whenever
//! the underlying table is mutated.
//!
//! The cache is best-effort: a miss always falls through to Airtable,
//! and nothing is persisted across restarts.

pub mod keys;
pub mod store;

pub use store::Cache;
