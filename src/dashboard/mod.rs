use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::db::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
}

/// Build the Axum router serving stored prediction tables as JSON.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/predictions", get(predictions_handler))
        .route("/api/runs", get(runs_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// GET /api/predictions
///
/// The latest table, with its status and headline so a consumer can tell
/// "no games today" from "no data available".
async fn predictions_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match state.db.latest_table() {
        Ok(Some(table)) => Ok(Json(table)),
        Ok(None) => Err((StatusCode::NOT_FOUND, "No prediction run yet".to_string())),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

#[derive(Debug, Deserialize)]
struct RunsQuery {
    limit: Option<i64>,
}

/// GET /api/runs?limit=20
async fn runs_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<RunsQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let limit = q.limit.unwrap_or(20).clamp(1, 200);
    state
        .db
        .list_runs(limit)
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
