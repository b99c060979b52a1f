use std::sync::Arc;

use axum::extract::{Query, State};
use chaskibots_core::airtable::record::Entity;
use chaskibots_core::models::{Course, Kit, Lesson, Level, Program, School};
use chaskibots_core::TableStore;

use super::{ok, AppResult, ListFilter};
use crate::state::AppState;

pub async fn list_levels<S: TableStore>(
    State(state): State<Arc<AppState<S>>>,
) -> AppResult<Vec<Entity<Level>>> {
    Ok(ok(state.repo.list_levels().await?))
}

pub async fn list_programs<S: TableStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(filter): Query<ListFilter>,
) -> AppResult<Vec<Entity<Program>>> {
    Ok(ok(state.repo.list_programs(filter.level_id()).await?))
}

pub async fn list_courses<S: TableStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(filter): Query<ListFilter>,
) -> AppResult<Vec<Entity<Course>>> {
    Ok(ok(state.repo.list_courses(filter.school_id()).await?))
}

pub async fn list_schools<S: TableStore>(
    State(state): State<Arc<AppState<S>>>,
) -> AppResult<Vec<Entity<School>>> {
    Ok(ok(state.repo.list_schools().await?))
}

pub async fn list_kits<S: TableStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(filter): Query<ListFilter>,
) -> AppResult<Vec<Entity<Kit>>> {
    Ok(ok(state.repo.list_kits(filter.level_id()).await?))
}

pub async fn list_lessons<S: TableStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(filter): Query<ListFilter>,
) -> AppResult<Vec<Entity<Lesson>>> {
    Ok(ok(state.repo.list_lessons(filter.level_id()).await?))
}
