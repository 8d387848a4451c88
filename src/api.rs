use std::sync::Arc;

use shuttle_axum::axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::engine::RateEngine;
use crate::store::RateRecord;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RateEngine>,
}

impl AppState {
    pub fn new(engine: RateEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/rates", get(list_rates))
        .route("/rates/refresh", post(refresh_rates))
        // Paths kept for existing clients.
        .route("/taux", get(list_rates))
        .route("/taux/refresh", post(refresh_rates))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
struct MessageOut {
    message: &'static str,
}

/// Generic 500; details go to the log, not the client.
fn failure(message: &'static str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(MessageOut { message }),
    )
        .into_response()
}

async fn list_rates(State(state): State<AppState>) -> Result<Json<Vec<RateRecord>>, Response> {
    match state.engine.latest().await {
        Ok(rows) => Ok(Json(rows)),
        Err(e) => {
            tracing::error!(target: "api", error = ?e, "listing rates failed");
            Err(failure("Failed to load rates."))
        }
    }
}

#[derive(serde::Serialize)]
struct FailedSource {
    source: String,
    reason: String,
}

#[derive(serde::Serialize)]
struct RefreshOut {
    message: &'static str,
    updated: Vec<String>,
    failed: Vec<FailedSource>,
}

async fn refresh_rates(State(state): State<AppState>) -> Response {
    let outcome = state.engine.refresh().await;

    if outcome.summary.has_store_errors() {
        return failure("Failed to update rates.");
    }

    // 200 means the cycle ran without a store fault; per-source misses are listed.
    let failed = outcome
        .summary
        .skipped
        .iter()
        .map(|(source, reason)| FailedSource {
            source: source.clone(),
            reason: reason.clone(),
        })
        .collect();

    Json(RefreshOut {
        message: "Rates updated.",
        updated: outcome.updated_sources(),
        failed,
    })
    .into_response()
}
