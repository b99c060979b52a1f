use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chaskibots_core::airtable::record::Entity;
use chaskibots_core::models::TaskSubmission;
use chaskibots_core::repository::GradeTask;
use chaskibots_core::TableStore;

use super::{ok, AppResult, ListFilter};
use crate::state::AppState;

pub async fn list_tasks<S: TableStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(filter): Query<ListFilter>,
) -> AppResult<Vec<Entity<TaskSubmission>>> {
    Ok(ok(state.repo.list_tasks(filter.student_id()).await?))
}

pub async fn submit_task<S: TableStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(task): Json<TaskSubmission>,
) -> AppResult<Entity<TaskSubmission>> {
    Ok(ok(state.repo.submit_task(task).await?))
}

pub async fn grade_task<S: TableStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(record_id): Path<String>,
    Json(grade): Json<GradeTask>,
) -> AppResult<Entity<TaskSubmission>> {
    Ok(ok(state.repo.grade_task(&record_id, &grade).await?))
}
