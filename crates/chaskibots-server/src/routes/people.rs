use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chaskibots_core::airtable::record::Entity;
use chaskibots_core::models::User;
use chaskibots_core::TableStore;
use serde::Deserialize;

use super::{ok, AppResult, ListFilter};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub access_code: String,
}

pub async fn list_users<S: TableStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(filter): Query<ListFilter>,
) -> AppResult<Vec<Entity<User>>> {
    Ok(ok(state.repo.list_users(filter.course_id()).await?))
}

pub async fn create_user<S: TableStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(user): Json<User>,
) -> AppResult<Entity<User>> {
    Ok(ok(state.repo.create_user(user).await?))
}

pub async fn update_user<S: TableStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(record_id): Path<String>,
    Json(patch): Json<User>,
) -> AppResult<Entity<User>> {
    Ok(ok(state.repo.update_user(&record_id, patch).await?))
}

pub async fn login<S: TableStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Entity<User>> {
    Ok(ok(state.repo.login(&request.access_code).await?))
}
