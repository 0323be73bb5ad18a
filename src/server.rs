//! HTTP server: login flow plus a read-only JSON view of the planner.

use std::sync::Arc;

use axum::extract::{FromRef, Path, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::auth;
use crate::config::{AuthConfig, Config};
use crate::error::Error;
use crate::storage::{PlannerStore, Storage};
use crate::task::TaskView;
use crate::week::{self, WeekInfo};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthConfig>,
    pub storage: Storage,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            auth: Arc::new(config.auth.clone()),
            storage: config.storage(),
        }
    }
}

impl FromRef<AppState> for Arc<AuthConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

#[derive(Debug, Serialize)]
pub struct WeekView {
    pub week: WeekInfo,
    pub tasks: Vec<TaskView>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(current_week))
        .route("/api/weeks/{key}", get(week_by_key))
        .route(auth::LOGIN_PATH, get(auth::login_page))
        .route(auth::LOGIN_API_PATH, post(auth::login))
        .layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth::require_auth,
        ))
        .with_state(state)
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let app = router(AppState::new(&config));

    tracing::info!(
        planner = %config.storage().planner_file().display(),
        "weekplan listening on http://{local_addr}"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

async fn current_week(State(state): State<AppState>) -> Response {
    let today = today();
    week_response(state.storage, WeekInfo::for_offset(today, 0)).await
}

async fn week_by_key(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    let date = match week::parse_date(&key) {
        Ok(date) => date,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, &err),
    };
    week_response(state.storage, WeekInfo::containing(date, today())).await
}

async fn week_response(storage: Storage, info: WeekInfo) -> Response {
    // The CLI may have written since the last request; read fresh.
    let loaded = tokio::task::spawn_blocking(move || -> crate::error::Result<WeekView> {
        let store = PlannerStore::read(storage)?;
        let tasks = store
            .tasks(&info.key)
            .iter()
            .cloned()
            .map(TaskView::from)
            .collect();
        Ok(WeekView { week: info, tasks })
    })
    .await;

    match loaded {
        Ok(Ok(view)) => Json(view).into_response(),
        Ok(Err(err)) => {
            tracing::error!(error = %err, "failed to read planner");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &err)
        }
        Err(err) => {
            tracing::error!(error = %err, "planner load task failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &Error::OperationFailed("could not load planner".to_string()),
            )
        }
    }
}

fn error_response(status: StatusCode, err: &Error) -> Response {
    (status, Json(serde_json::json!({"error": err.to_string()}))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use crate::task::Task;
    use axum::http::{header, Request};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn state(temp: &TempDir) -> AppState {
        let mut config = Config::default();
        config.storage.dir = temp.path().to_path_buf();
        AppState::new(&config)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .uri(uri)
            .header(header::COOKIE, "site-auth=authenticated")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn week_endpoint_normalises_to_monday() {
        let temp = TempDir::new().unwrap();
        let state = state(&temp);
        let mut store = PlannerStore::open(state.storage.clone()).unwrap();
        store.save_task("2024-01-01", Task::new("Plan", "").unwrap());

        let (status, json) = get_json(router(state), "/api/weeks/2024-01-03").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["week"]["key"], "2024-01-01");
        assert_eq!(json["week"]["range"], "Jan 1 – Jan 7");
        assert_eq!(json["tasks"][0]["title"], "Plan");
        assert_eq!(json["tasks"][0]["progress"]["total"], 0);
    }

    #[tokio::test]
    async fn bad_week_is_400() {
        let temp = TempDir::new().unwrap();
        let (status, json) = get_json(router(state(&temp)), "/api/weeks/soon").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("Invalid week"));
    }

    #[tokio::test]
    async fn corrupt_planner_is_500_and_left_in_place() {
        let temp = TempDir::new().unwrap();
        let state = state(&temp);
        let file = state.storage.planner_file();
        std::fs::write(&file, "{not json").unwrap();

        let (status, json) = get_json(router(state), "/api/weeks/2024-01-01").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().is_some());
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "{not json");
    }

    #[tokio::test]
    async fn root_serves_current_week() {
        let temp = TempDir::new().unwrap();
        let (status, json) = get_json(router(state(&temp)), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["week"]["is_current"], true);
        assert_eq!(json["week"]["key"], week::week_key(today()));
        assert!(json["tasks"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn api_requires_cookie() {
        let temp = TempDir::new().unwrap();
        let req = Request::builder()
            .uri("/api/weeks/2024-01-01")
            .body(Body::empty())
            .unwrap();
        let response = router(state(&temp)).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    }
}
