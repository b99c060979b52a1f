//! Cached resource accessors.
//!
//! `Repository` combines the table store, the shared `Cache` and the key
//! builders. Reads consult the cache first and fall through to Airtable
//! on a miss; every mutation invalidates the mutated resource's prefix so
//! a stale list is never served after a write.

pub mod assignments;
pub mod catalog;
pub mod people;
pub mod tasks;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::airtable::record::Entity;
use crate::airtable::{AirtableClient, ListQuery, Record, TableStore};
use crate::cache::{keys, Cache};
use crate::config::{CacheTtls, Config, TableNames};
use crate::models::{
    Course, Kit, Lesson, Level, Program, School, TaskSubmission, TeacherCourse, User,
};

pub use assignments::AssignTeacher;
pub use catalog::CourseRef;
pub use tasks::GradeTask;

/// Failures decided by the application rather than by Airtable.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid access code")]
    InvalidAccessCode,
}

/// A table the HTTP API exposes generic create/update/delete for.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Cache resource name, see `cache::keys`.
    const NAME: &'static str;

    fn table(tables: &TableNames) -> &str;
}

macro_rules! resource {
    ($ty:ty, $name:expr, $field:ident) => {
        impl Resource for $ty {
            const NAME: &'static str = $name;

            fn table(tables: &TableNames) -> &str {
                &tables.$field
            }
        }
    };
}

resource!(Level, keys::LEVELS, levels);
resource!(Program, keys::PROGRAMS, programs);
resource!(Course, keys::COURSES, courses);
resource!(School, keys::SCHOOLS, schools);
resource!(Kit, keys::KITS, kits);
resource!(Lesson, keys::LESSONS, lessons);
resource!(User, keys::USERS, users);
resource!(TeacherCourse, keys::TEACHER_COURSES, teacher_courses);
resource!(TaskSubmission, keys::TASKS, tasks);

pub struct Repository<S: TableStore = AirtableClient> {
    store: S,
    cache: Arc<Cache>,
    tables: TableNames,
    ttls: CacheTtls,
}

impl Repository<AirtableClient> {
    /// Build the production repository from configuration.
    pub fn from_config(config: &Config, cache: Arc<Cache>) -> Result<Self> {
        let client = AirtableClient::new(&config.airtable)?;
        Ok(Self::new(
            client,
            cache,
            config.tables.clone(),
            config.cache_ttls.clone(),
        ))
    }
}

impl<S: TableStore> Repository<S> {
    pub fn new(store: S, cache: Arc<Cache>, tables: TableNames, ttls: CacheTtls) -> Self {
        Self {
            store,
            cache,
            tables,
            ttls,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn tables(&self) -> &TableNames {
        &self.tables
    }

    async fn cached_list<F>(
        &self,
        key: String,
        ttl: Duration,
        table: &str,
        query: ListQuery,
    ) -> Result<Vec<Entity<F>>>
    where
        F: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        if let Some(hit) = self.cache.get::<Vec<Entity<F>>>(&key) {
            debug!(key = %key, "Cache hit");
            return Ok(hit);
        }

        debug!(key = %key, table = table, "Cache miss, fetching from Airtable");
        let records = self.store.list::<F>(table, &query).await?;
        let entities: Vec<Entity<F>> = records.into_iter().map(Record::into_entity).collect();
        self.cache.set(key, entities.clone(), ttl);
        Ok(entities)
    }

    fn invalidate(&self, resource: &str) {
        self.cache.invalidate_prefix(&keys::prefix(resource));
    }

    pub async fn get<R: Resource>(&self, record_id: &str) -> Result<Entity<R>> {
        let record = self.store.get::<R>(R::table(&self.tables), record_id).await?;
        Ok(record.into_entity())
    }

    pub async fn create<R: Resource>(&self, fields: &R) -> Result<Entity<R>> {
        let record = self.store.create(R::table(&self.tables), fields).await?;
        self.invalidate(R::NAME);
        Ok(record.into_entity())
    }

    pub async fn update<R: Resource>(&self, record_id: &str, fields: &R) -> Result<Entity<R>> {
        let record = self
            .store
            .update(R::table(&self.tables), record_id, fields)
            .await?;
        self.invalidate(R::NAME);
        Ok(record.into_entity())
    }

    pub async fn delete<R: Resource>(&self, record_id: &str) -> Result<()> {
        self.store.delete(R::table(&self.tables), record_id).await?;
        self.invalidate(R::NAME);
        Ok(())
    }
}
