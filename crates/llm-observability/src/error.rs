//! Error taxonomy for the dashboard.
//! Startup failures are fatal; per-request failures map onto HTTP statuses.

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("database not found: {}\nMake sure the llm database exists at this path.", .0.display())]
    DatabaseNotFound(PathBuf),
    #[error("invalid llm database: {}\nThis database does not contain llm tables. Make sure you're pointing to a valid llm logs.db file.", .0.display())]
    InvalidDatabase(PathBuf),
    #[error("{0} not found")]
    NotFound(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("query failed: {0}")]
    Query(#[from] rusqlite::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("background task failed: {0}")]
    Task(String),
}

pub type DashboardResult<T> = Result<T, DashboardError>;

impl DashboardError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
