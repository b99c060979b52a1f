use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chaskibots_core::airtable::record::Entity;
use chaskibots_core::models::TeacherCourse;
use chaskibots_core::repository::AssignTeacher;
use chaskibots_core::sync::{OrphanReport, SyncOutcome, SyncReport};
use chaskibots_core::TableStore;

use super::{ok, AppResult, Deleted, ListFilter};
use crate::error::AppError;
use crate::state::AppState;

pub async fn list_teacher_courses<S: TableStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(filter): Query<ListFilter>,
) -> AppResult<Vec<Entity<TeacherCourse>>> {
    Ok(ok(state.repo.list_teacher_courses(filter.teacher_id()).await?))
}

pub async fn assign_teacher<S: TableStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<AssignTeacher>,
) -> AppResult<Entity<TeacherCourse>> {
    Ok(ok(state.repo.assign_teacher(&request).await?))
}

pub async fn unassign_teacher<S: TableStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(record_id): Path<String>,
) -> AppResult<Deleted> {
    state.repo.unassign_teacher(&record_id).await?;
    Ok(ok(Deleted {
        record_id,
        deleted: true,
    }))
}

/// Dry run: report assignments whose level drifted from their course.
pub async fn sync_report<S: TableStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<SyncReport>, AppError> {
    Ok(Json(state.repo.teacher_course_sync_report().await?))
}

/// Write mode: correct every drifted assignment.
pub async fn sync_apply<S: TableStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<SyncOutcome>, AppError> {
    Ok(Json(state.repo.apply_teacher_course_sync().await?))
}

pub async fn orphans<S: TableStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<OrphanReport>, AppError> {
    Ok(Json(state.repo.orphan_assignments().await?))
}
