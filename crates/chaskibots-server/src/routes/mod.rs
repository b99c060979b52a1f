//! HTTP handlers, grouped by resource.
//!
//! Handlers are generic over the `TableStore` so the same router runs
//! against Airtable in production and an in-memory store in tests.

pub mod assignments;
pub mod catalog;
pub mod health;
pub mod people;
pub mod tasks;

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chaskibots_core::airtable::record::Entity;
use chaskibots_core::repository::Resource;
use chaskibots_core::TableStore;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

pub type AppResult<T> = Result<Json<ApiResponse<T>>, AppError>;

/// Success envelope: `{ "success": true, "data": ... }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { success: true, data })
}

/// Optional list filters, all camelCase query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilter {
    pub level_id: Option<String>,
    pub school_id: Option<String>,
    pub course_id: Option<String>,
    pub teacher_id: Option<String>,
    pub student_id: Option<String>,
}

impl ListFilter {
    fn non_blank(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn level_id(&self) -> Option<&str> {
        Self::non_blank(&self.level_id)
    }

    pub fn school_id(&self) -> Option<&str> {
        Self::non_blank(&self.school_id)
    }

    pub fn course_id(&self) -> Option<&str> {
        Self::non_blank(&self.course_id)
    }

    pub fn teacher_id(&self) -> Option<&str> {
        Self::non_blank(&self.teacher_id)
    }

    pub fn student_id(&self) -> Option<&str> {
        Self::non_blank(&self.student_id)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deleted {
    pub record_id: String,
    pub deleted: bool,
}

pub async fn get_resource<S: TableStore, R: Resource>(
    State(state): State<Arc<AppState<S>>>,
    Path(record_id): Path<String>,
) -> AppResult<Entity<R>> {
    Ok(ok(state.repo.get::<R>(&record_id).await?))
}

pub async fn create_resource<S: TableStore, R: Resource>(
    State(state): State<Arc<AppState<S>>>,
    Json(fields): Json<R>,
) -> AppResult<Entity<R>> {
    Ok(ok(state.repo.create(&fields).await?))
}

pub async fn update_resource<S: TableStore, R: Resource>(
    State(state): State<Arc<AppState<S>>>,
    Path(record_id): Path<String>,
    Json(fields): Json<R>,
) -> AppResult<Entity<R>> {
    Ok(ok(state.repo.update(&record_id, &fields).await?))
}

pub async fn delete_resource<S: TableStore, R: Resource>(
    State(state): State<Arc<AppState<S>>>,
    Path(record_id): Path<String>,
) -> AppResult<Deleted> {
    state.repo.delete::<R>(&record_id).await?;
    Ok(ok(Deleted {
        record_id,
        deleted: true,
    }))
}
