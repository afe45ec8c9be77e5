//! Read-only HTTP surface over the match store.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::{MatchError, MatchResult};
use crate::match_store::MatchStore;
use crate::query::{self, ListParams, MatchPage};

/// Shared by all handlers. Holds only the database location; every request
/// opens and drops its own store handle.
#[derive(Clone)]
pub struct AppState {
    db_path: Arc<PathBuf>,
}

impl AppState {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Arc::new(db_path.into()),
        }
    }

    async fn with_store<T, F>(&self, f: F) -> ApiResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&MatchStore) -> MatchResult<T> + Send + 'static,
    {
        let path = Arc::clone(&self.db_path);
        let joined = tokio::task::spawn_blocking(move || {
            let store = MatchStore::connect(&path)?;
            f(&store)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("store task failed: {e}")))?;
        Ok(joined?)
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<MatchError> for ApiError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::InvalidQuery(msg) => ApiError::Validation(msg),
            MatchError::Storage(e) => ApiError::Storage(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Validation(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", msg.clone())
            }
            ApiError::Storage(msg) => {
                tracing::error!("storage failure: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", msg.clone())
            }
            ApiError::Internal(msg) => {
                tracing::error!("internal failure: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/matches", get(list_matches))
        .route("/stats/wins-by-team", get(wins_by_team))
        .route("/stats/matches-by-venue", get(matches_by_venue))
        .with_state(state)
}

/// Router plus tracing and, when enabled, a permissive CORS layer.
pub fn app(state: AppState, enable_cors: bool) -> Router {
    let mut router = router(state).layer(TraceLayer::new_for_http());
    if enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }
    router
}

pub async fn run_server(config: &AppConfig) -> Result<()> {
    // Requests connect without creating the schema.
    MatchStore::open(&config.db_path)
        .with_context(|| format!("open match store {}", config.db_path.display()))?;

    let addr = config.bind_addr()?;
    let app = app(AppState::new(config.db_path.clone()), config.enable_cors);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(db = %config.db_path.display(), "match API listening on {}", addr);
    axum::serve(listener, app).await.context("serve http")?;
    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn list_matches(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<MatchPage>> {
    let Query(params) = params.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
    let req = params.validate()?;
    tracing::debug!(page = req.page, limit = req.limit, team = ?req.team, "list matches");
    let page = state
        .with_store(move |store| query::list_matches(store, &req))
        .await?;
    Ok(Json(page))
}

async fn wins_by_team(State(state): State<AppState>) -> ApiResult<Json<BTreeMap<String, u64>>> {
    let wins = state.with_store(query::wins_by_team).await?;
    Ok(Json(wins))
}

async fn matches_by_venue(
    State(state): State<AppState>,
) -> ApiResult<Json<BTreeMap<String, u64>>> {
    let venues = state.with_store(query::matches_by_venue).await?;
    Ok(Json(venues))
}
