use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use super::{ListQuery, Record};

/// Record-level capabilities of a remote table store.
///
/// `AirtableClient` is the production implementation. The repository and
/// the reconciliation job only depend on this trait.
#[async_trait]
pub trait TableStore: Send + Sync + 'static {
    /// List every record matching `query`, following pagination to the end.
    async fn list<F>(&self, table: &str, query: &ListQuery) -> Result<Vec<Record<F>>>
    where
        F: DeserializeOwned + Send + 'static;

    async fn get<F>(&self, table: &str, record_id: &str) -> Result<Record<F>>
    where
        F: DeserializeOwned + Send + 'static;

    async fn create<F>(&self, table: &str, fields: &F) -> Result<Record<F>>
    where
        F: Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Partial update: only the fields present in the serialized value change.
    async fn update<F>(&self, table: &str, record_id: &str, fields: &F) -> Result<Record<F>>
    where
        F: Serialize + DeserializeOwned + Send + Sync + 'static;

    async fn delete(&self, table: &str, record_id: &str) -> Result<()>;

    /// List an entire table without filtering.
    async fn list_all<F>(&self, table: &str) -> Result<Vec<Record<F>>>
    where
        F: DeserializeOwned + Send + 'static,
    {
        self.list(table, &ListQuery::default()).await
    }
}
