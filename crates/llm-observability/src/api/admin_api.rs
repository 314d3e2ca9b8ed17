//! Health endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::shared_state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: String,
    pub version: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        database: state.db.path().display().to_string(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
