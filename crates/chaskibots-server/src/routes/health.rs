use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chaskibots_core::TableStore;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
    pub cache_entries: usize,
}

pub async fn health<S: TableStore>(State(state): State<Arc<AppState<S>>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        cache_entries: state.repo.cache().len(),
    })
}
