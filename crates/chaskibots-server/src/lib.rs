//! HTTP API for ChaskiBots EDU.
//!
//! Thin axum layer over `chaskibots_core::Repository`. Every list endpoint
//! answers from the shared cache when it can; mutations go straight to
//! Airtable and invalidate the affected cache prefix.

pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use chaskibots_core::models::{Course, Level, Program, School, TaskSubmission, TeacherCourse, User};
use chaskibots_core::{Config, TableStore};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use routes::{
    assignments, catalog, create_resource, delete_resource, get_resource, health, people, tasks,
    update_resource,
};
use state::AppState;

pub fn router<S: TableStore>(state: Arc<AppState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health::health::<S>))
        .route("/auth/login", post(people::login::<S>))
        // Catalog
        .route(
            "/levels",
            get(catalog::list_levels::<S>).post(create_resource::<S, Level>),
        )
        .route(
            "/levels/:id",
            get(get_resource::<S, Level>)
                .patch(update_resource::<S, Level>)
                .delete(delete_resource::<S, Level>),
        )
        .route(
            "/programs",
            get(catalog::list_programs::<S>).post(create_resource::<S, Program>),
        )
        .route(
            "/programs/:id",
            get(get_resource::<S, Program>)
                .patch(update_resource::<S, Program>)
                .delete(delete_resource::<S, Program>),
        )
        .route(
            "/courses",
            get(catalog::list_courses::<S>).post(create_resource::<S, Course>),
        )
        .route(
            "/courses/:id",
            get(get_resource::<S, Course>)
                .patch(update_resource::<S, Course>)
                .delete(delete_resource::<S, Course>),
        )
        .route(
            "/schools",
            get(catalog::list_schools::<S>).post(create_resource::<S, School>),
        )
        .route(
            "/schools/:id",
            get(get_resource::<S, School>)
                .patch(update_resource::<S, School>)
                .delete(delete_resource::<S, School>),
        )
        .route("/kits", get(catalog::list_kits::<S>))
        .route("/lessons", get(catalog::list_lessons::<S>))
        // People
        .route(
            "/users",
            get(people::list_users::<S>).post(people::create_user::<S>),
        )
        .route(
            "/users/:id",
            get(get_resource::<S, User>)
                .patch(people::update_user::<S>)
                .delete(delete_resource::<S, User>),
        )
        // Assignments
        .route(
            "/teacher-courses",
            get(assignments::list_teacher_courses::<S>).post(assignments::assign_teacher::<S>),
        )
        .route("/teacher-courses/orphans", get(assignments::orphans::<S>))
        .route(
            "/teacher-courses/:id",
            get(get_resource::<S, TeacherCourse>)
                .patch(update_resource::<S, TeacherCourse>)
                .delete(assignments::unassign_teacher::<S>),
        )
        .route(
            "/sync-teacher-courses",
            get(assignments::sync_report::<S>).post(assignments::sync_apply::<S>),
        )
        // Tasks
        .route(
            "/tasks",
            get(tasks::list_tasks::<S>).post(tasks::submit_task::<S>),
        )
        .route(
            "/tasks/:id",
            get(get_resource::<S, TaskSubmission>)
                .patch(tasks::grade_task::<S>)
                .delete(delete_resource::<S, TaskSubmission>),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(config: Config) -> Result<()> {
    info!("Initializing state...");
    let state = AppState::new(&config)?;
    let app = router(state);

    let address = format!("0.0.0.0:{}", config.port);
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "Failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chaskibots_core::config::{CacheTtls, TableNames};
    use chaskibots_core::testing::MemoryStore;
    use chaskibots_core::{Cache, Repository};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState<MemoryStore>> {
        AppState::with_repository(Repository::new(
            MemoryStore::new(),
            Arc::new(Cache::default()),
            TableNames::default(),
            CacheTtls::default(),
        ))
    }

    async fn send(
        state: &Arc<AppState<MemoryStore>>,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let state = test_state();
        let (status, body) = send(&state, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_sync_dry_run_then_apply() {
        let state = test_state();
        let store = state.repo.store();
        store.insert("programs", json!({"id": "p1", "name": "Robótica Básica", "levelId": "L1"}));
        store.insert("courses", json!({"id": "c1", "name": "Robótica I", "levelId": "L2"}));
        let drifted = store.insert(
            "teacher_courses",
            json!({"teacherId": "T1", "teacherName": "Ana", "courseId": "p1", "levelId": "L9"}),
        );
        store.insert(
            "teacher_courses",
            json!({"teacherId": "T2", "courseId": "c1", "levelId": "L2"}),
        );

        let (status, report) = send(&state, "GET", "/sync-teacher-courses", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["success"], true);
        assert_eq!(report["totalAssignments"], 2);
        assert_eq!(report["totalPrograms"], 1);
        assert_eq!(report["totalCourses"], 1);
        assert_eq!(report["inconsistencies"][0]["courseId"], "p1");
        assert_eq!(report["inconsistencies"][0]["currentLevelId"], "L9");
        assert_eq!(report["inconsistencies"][0]["correctLevelId"], "L1");
        assert_eq!(store.update_calls(), 0);

        let (status, outcome) = send(&state, "POST", "/sync-teacher-courses", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["stats"]["correctionsNeeded"], 1);
        assert_eq!(outcome["stats"]["corrected"], 1);
        assert_eq!(outcome["stats"]["errors"], 0);
        assert_eq!(
            store.fields("teacher_courses", &drifted).unwrap()["levelId"],
            "L1"
        );

        let (_, again) = send(&state, "GET", "/sync-teacher-courses", None).await;
        assert_eq!(again["inconsistencies"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_login() {
        let state = test_state();
        state.repo.store().insert(
            "users",
            json!({"id": "U1", "name": "Luis", "role": "student", "accessCode": "EST-ABC234"}),
        );

        let login = |code: &str| Some(json!({ "accessCode": code }));
        let (status, body) = send(&state, "POST", "/auth/login", login("est-abc234")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Luis");
        assert!(body["data"].get("accessCode").is_none());

        let (status, body) = send(&state, "POST", "/auth/login", login("EST-WRONG2")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Invalid access code");
    }

    #[tokio::test]
    async fn test_missing_record_is_404() {
        let state = test_state();
        let rename = Some(json!({"name": "X"}));
        let (status, body) = send(&state, "PATCH", "/levels/recMISSING", rename).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);

        let (status, _) = send(&state, "DELETE", "/schools/recMISSING", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&state, "GET", "/tasks/recMISSING", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_level_crud_and_filtered_lists() {
        let state = test_state();
        let level = Some(json!({"id": "L1", "name": "Nivel 1", "order": 1}));
        let (status, created) = send(&state, "POST", "/levels", level).await;
        assert_eq!(status, StatusCode::OK);
        let record_id = created["data"]["recordId"].as_str().unwrap().to_string();

        state.repo.store().insert("programs", json!({"id": "p1", "levelId": "L1"}));
        state.repo.store().insert("programs", json!({"id": "p2", "levelId": "L2"}));
        let (_, programs) = send(&state, "GET", "/programs?levelId=L1", None).await;
        assert_eq!(programs["data"].as_array().unwrap().len(), 1);
        assert_eq!(programs["data"][0]["id"], "p1");

        let uri = format!("/levels/{}", record_id);
        let (status, _) = send(&state, "PATCH", &uri, Some(json!({"name": "Nivel Uno"}))).await;
        assert_eq!(status, StatusCode::OK);
        let (_, levels) = send(&state, "GET", "/levels", None).await;
        assert_eq!(levels["data"][0]["name"], "Nivel Uno");

        let (status, fetched) = send(&state, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["data"]["id"], "L1");
        assert_eq!(fetched["data"]["name"], "Nivel Uno");

        let (status, deleted) = send(&state, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["data"]["deleted"], true);
        let (_, levels) = send(&state, "GET", "/levels", None).await;
        assert!(levels["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_task_grading_validation() {
        let state = test_state();
        let (status, task) = send(
            &state,
            "POST",
            "/tasks",
            Some(json!({
                "studentId": "U1",
                "lessonId": "LS1",
                "content": "Mi robot sigue la línea",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let record_id = task["data"]["recordId"].as_str().unwrap().to_string();

        let uri = format!("/tasks/{}", record_id);
        let (status, body) = send(&state, "PATCH", &uri, Some(json!({"grade": 25}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let grade = Some(json!({"grade": 18, "feedback": "Bien"}));
        let (status, body) = send(&state, "PATCH", &uri, grade).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "graded");
    }

    #[tokio::test]
    async fn test_orphans() {
        let state = test_state();
        state.repo.store().insert("courses", json!({"id": "c1", "levelId": "L1"}));
        let store = state.repo.store();
        store.insert("teacher_courses", json!({"teacherId": "T1", "courseId": "c1"}));
        store.insert("teacher_courses", json!({"teacherId": "T1", "courseId": "gone"}));

        let (status, body) = send(&state, "GET", "/teacher-courses/orphans", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["orphans"].as_array().unwrap().len(), 1);
        assert_eq!(body["orphans"][0]["courseId"], "gone");
    }

    #[tokio::test]
    async fn test_user_with_unlisted_role_is_still_served() {
        let state = test_state();
        let store = state.repo.store();
        store.insert("users", json!({"id": "U1", "name": "Luis", "role": "student"}));
        let rosa = store.insert(
            "users",
            json!({"id": "U2", "name": "Rosa", "role": "coordinador"}),
        );

        let (status, users) = send(&state, "GET", "/users", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(users["data"].as_array().unwrap().len(), 2);

        let (status, body) = send(&state, "GET", &format!("/users/{}", rosa), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Rosa");
        assert!(body["data"].get("role").is_none());
    }
}
