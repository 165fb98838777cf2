use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::AppState;
use crate::db::{get_recent_videos, get_videos_for_movie};
use crate::sync::{SyncEngine, SyncReport};

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sync", any(run_sync))
        .route("/videos", get(list_videos))
        .route("/movies/:movie_id/videos", get(movie_videos))
        .route("/healthz", get(health))
}

#[derive(Debug, Serialize)]
struct SyncResponse {
    success: bool,
    #[serde(flatten)]
    report: SyncReport,
}

/// Run one reconciliation pass and return its summary.
async fn run_sync(State(state): State<AppState>, method: Method) -> Response {
    if method == Method::OPTIONS {
        // Pre-flight; the CORS layer has already attached its headers.
        return StatusCode::OK.into_response();
    }

    let engine = SyncEngine::new(&state.config, state.db.clone());

    match engine.run().await {
        Ok(report) => Json(SyncResponse {
            success: true,
            report,
        })
        .into_response(),
        Err(e) => {
            tracing::error!("Sync failed: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": format!("{e:#}") })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<i64>,
}

async fn list_videos(State(state): State<AppState>, Query(params): Query<ListParams>) -> Response {
    let limit = params.limit.unwrap_or(50).clamp(1, 500);

    match get_recent_videos(state.db.pool(), limit).await {
        Ok(videos) => Json(videos).into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch videos: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response()
        }
    }
}

async fn movie_videos(State(state): State<AppState>, Path(movie_id): Path<i64>) -> Response {
    match get_videos_for_movie(state.db.pool(), movie_id).await {
        Ok(videos) => Json(videos).into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch videos for movie: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response()
        }
    }
}

async fn health() -> &'static str {
    "OK"
}
