//! In-memory `TableStore` for tests.
//!
//! Records are kept as raw JSON per table. `filterByFormula` is evaluated
//! against the stored fields, so filtered listings behave like Airtable for
//! the formulas this crate builds. Individual record updates can be made to
//! fail to exercise partial-failure paths.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value as Json};

use crate::airtable::formula::Value;
use crate::airtable::{ApiError, Formula, ListQuery, Record, SortDirection, TableStore};

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Record<Json>>>>,
    failing_updates: Mutex<HashSet<String>>,
    next_id: AtomicUsize,
    list_calls: AtomicUsize,
    update_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record and return its generated record id.
    pub fn insert(&self, table: &str, fields: Json) -> String {
        let id = format!("rec{:014}", self.next_id.fetch_add(1, AtomicOrdering::SeqCst) + 1);
        lock(&self.tables)
            .entry(table.to_string())
            .or_default()
            .push(Record {
                id: id.clone(),
                created_time: Some(Utc::now()),
                fields,
            });
        id
    }

    /// Make every later update of `record_id` fail with a server error.
    pub fn fail_updates_for(&self, record_id: &str) {
        lock(&self.failing_updates).insert(record_id.to_string());
    }

    pub fn records(&self, table: &str) -> Vec<Record<Json>> {
        lock(&self.tables).get(table).cloned().unwrap_or_default()
    }

    pub fn fields(&self, table: &str, record_id: &str) -> Option<Json> {
        self.records(table)
            .into_iter()
            .find(|r| r.id == record_id)
            .map(|r| r.fields)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(AtomicOrdering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(AtomicOrdering::SeqCst)
    }

    fn not_found(table: &str, record_id: &str) -> anyhow::Error {
        ApiError::NotFound(format!("{} has no record {}", table, record_id)).into()
    }
}

fn decode<F: DeserializeOwned>(record: Record<Json>) -> Result<Record<F>> {
    Ok(Record {
        id: record.id,
        created_time: record.created_time,
        fields: serde_json::from_value(record.fields)?,
    })
}

fn to_object<F: Serialize>(fields: &F) -> Result<Map<String, Json>> {
    match serde_json::to_value(fields)? {
        Json::Object(map) => Ok(map),
        other => {
            let reason = format!("fields must be an object, got {}", other);
            Err(ApiError::InvalidRequest(reason).into())
        }
    }
}

fn is_blank(value: Option<&Json>) -> bool {
    match value {
        None | Some(Json::Null) => true,
        Some(Json::String(s)) => s.is_empty(),
        Some(Json::Array(items)) => items.is_empty(),
        _ => false,
    }
}

fn value_equals(stored: Option<&Json>, expected: &Value) -> bool {
    match expected {
        Value::Text(s) if s.is_empty() => is_blank(stored),
        Value::Text(s) => stored.and_then(Json::as_str) == Some(s.as_str()),
        Value::Number(n) => stored.and_then(Json::as_f64) == Some(*n),
        Value::Bool(b) => stored.and_then(Json::as_bool).unwrap_or(false) == *b,
    }
}

fn joined(value: Option<&Json>) -> String {
    match value {
        Some(Json::String(s)) => s.clone(),
        Some(Json::Array(items)) => items
            .iter()
            .map(|i| i.as_str().map(str::to_string).unwrap_or_else(|| i.to_string()))
            .collect::<Vec<_>>()
            .join(", "),
        Some(Json::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Evaluate a formula against one record the way Airtable would.
pub fn matches(formula: &Formula, record_id: &str, fields: &Json) -> bool {
    let field = |name: &str| fields.get(name);
    match formula {
        Formula::Eq(name, value) => value_equals(field(name), value),
        Formula::Ne(name, value) => !value_equals(field(name), value),
        Formula::EqIgnoreCase(name, text) => {
            joined(field(name)).to_uppercase() == text.to_uppercase()
        }
        Formula::Contains(name, needle) => joined(field(name)).contains(needle.as_str()),
        Formula::Blank(name) => is_blank(field(name)),
        Formula::RecordId(id) => record_id == id,
        Formula::And(parts) => parts.iter().all(|p| matches(p, record_id, fields)),
        Formula::Or(parts) => parts.iter().any(|p| matches(p, record_id, fields)),
        Formula::Not(inner) => !matches(inner, record_id, fields),
    }
}

fn compare_field(a: &Json, b: &Json, name: &str) -> Ordering {
    match (a.get(name), b.get(name)) {
        (Some(x), Some(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => joined(Some(x)).cmp(&joined(Some(y))),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn list<F>(&self, table: &str, query: &ListQuery) -> Result<Vec<Record<F>>>
    where
        F: DeserializeOwned + Send + 'static,
    {
        self.list_calls.fetch_add(1, AtomicOrdering::SeqCst);
        // Render so invalid formulas fail here like they would remotely
        query.to_params(None)?;

        let mut records: Vec<Record<Json>> = self
            .records(table)
            .into_iter()
            .filter(|r| {
                query
                    .formula
                    .as_ref()
                    .map_or(true, |f| matches(f, &r.id, &r.fields))
            })
            .collect();

        for (name, direction) in query.sort.iter().rev() {
            records.sort_by(|a, b| {
                let ord = compare_field(&a.fields, &b.fields, name);
                match direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }

        if let Some(max) = query.max_records {
            records.truncate(max as usize);
        }

        records.into_iter().map(decode).collect()
    }

    async fn get<F>(&self, table: &str, record_id: &str) -> Result<Record<F>>
    where
        F: DeserializeOwned + Send + 'static,
    {
        let record = self
            .records(table)
            .into_iter()
            .find(|r| r.id == record_id)
            .ok_or_else(|| Self::not_found(table, record_id))?;
        decode(record)
    }

    async fn create<F>(&self, table: &str, fields: &F) -> Result<Record<F>>
    where
        F: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let object = to_object(fields)?;
        let id = self.insert(table, Json::Object(object));
        self.get(table, &id).await
    }

    async fn update<F>(&self, table: &str, record_id: &str, fields: &F) -> Result<Record<F>>
    where
        F: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.update_calls.fetch_add(1, AtomicOrdering::SeqCst);
        if lock(&self.failing_updates).contains(record_id) {
            let reason = format!("simulated failure updating {}", record_id);
            return Err(ApiError::ServerError(reason).into());
        }

        let patch = to_object(fields)?;
        let updated = {
            let mut tables = lock(&self.tables);
            let record = tables
                .get_mut(table)
                .and_then(|records| records.iter_mut().find(|r| r.id == record_id))
                .ok_or_else(|| Self::not_found(table, record_id))?;
            if let Json::Object(ref mut existing) = record.fields {
                existing.extend(patch);
            }
            record.clone()
        };
        decode(updated)
    }

    async fn delete(&self, table: &str, record_id: &str) -> Result<()> {
        let mut tables = lock(&self.tables);
        let records = tables
            .get_mut(table)
            .ok_or_else(|| Self::not_found(table, record_id))?;
        let before = records.len();
        records.retain(|r| r.id != record_id);
        if records.len() == before {
            return Err(Self::not_found(table, record_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_formula_matching() {
        let fields = json!({"role": "teacher", "courseIds": ["C1", "C2"], "order": 2, "name": ""});
        assert!(matches(&Formula::eq("role", "teacher"), "rec1", &fields));
        assert!(!matches(&Formula::eq("role", "student"), "rec1", &fields));
        assert!(matches(&Formula::eq("order", 2), "rec1", &fields));
        assert!(matches(&Formula::contains("courseIds", "C2"), "rec1", &fields));
        assert!(matches(&Formula::blank("name"), "rec1", &fields));
        assert!(matches(&Formula::blank("missing"), "rec1", &fields));
        assert!(matches(&Formula::record_id("rec1"), "rec1", &fields));
        assert!(matches(
            &Formula::and([Formula::eq("role", "teacher"), Formula::not(Formula::eq("order", 3))]),
            "rec1",
            &fields
        ));
    }

    #[tokio::test]
    async fn test_crud_roundtrip() {
        let store = MemoryStore::new();
        let created: Record<Json> = store
            .create("levels", &json!({"id": "L1", "order": 2}))
            .await
            .unwrap();
        store.insert("levels", json!({"id": "L0", "order": 1}));

        let listed: Vec<Record<Json>> = store
            .list("levels", &ListQuery::new().sort_by("order", SortDirection::Asc))
            .await
            .unwrap();
        assert_eq!(listed[0].fields["id"], "L0");
        assert_eq!(listed[1].fields["id"], "L1");

        let updated: Record<Json> = store
            .update("levels", &created.id, &json!({"name": "Nivel 1"}))
            .await
            .unwrap();
        assert_eq!(updated.fields, json!({"id": "L1", "order": 2, "name": "Nivel 1"}));

        store.delete("levels", &created.id).await.unwrap();
        assert!(store.delete("levels", &created.id).await.is_err());
        assert_eq!(store.records("levels").len(), 1);
    }

    #[tokio::test]
    async fn test_failing_updates() {
        let store = MemoryStore::new();
        let id = store.insert("teacher_courses", json!({"levelId": "L0"}));
        store.fail_updates_for(&id);
        let result: Result<Record<Json>> = store
            .update("teacher_courses", &id, &json!({"levelId": "L1"}))
            .await;
        assert!(result.is_err());
        assert_eq!(store.fields("teacher_courses", &id), Some(json!({"levelId": "L0"})));
    }
}
