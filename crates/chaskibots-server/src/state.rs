use std::sync::Arc;

use anyhow::Result;
use chaskibots_core::{AirtableClient, Cache, Config, Repository, TableStore};

/// Shared handler state. One repository (and so one cache) per process.
pub struct AppState<S: TableStore = AirtableClient> {
    pub repo: Repository<S>,
}

impl AppState<AirtableClient> {
    pub fn new(config: &Config) -> Result<Arc<Self>> {
        let cache = Arc::new(Cache::default());
        let repo = Repository::from_config(config, cache)?;
        Ok(Arc::new(Self { repo }))
    }
}

impl<S: TableStore> AppState<S> {
    pub fn with_repository(repo: Repository<S>) -> Arc<Self> {
        Arc::new(Self { repo })
    }
}
