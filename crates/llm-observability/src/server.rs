//! HTTP server: router assembly and startup.
//!
//! The log database is validated before the listener binds; a missing or
//! foreign database file stops the process with a descriptive error.

use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::{api, config::Config, log_db::LogDatabase, shared_state::AppState, views};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Run the dashboard until interrupted.
pub async fn run_server(cfg: Config) -> anyhow::Result<()> {
    crate::telemetry::init_tracing(cfg.debug);
    cfg.print_config();

    let db = LogDatabase::open(&cfg.db_path).map_err(|e| {
        error!("{}", e);
        e
    })?;

    let addr = cfg.bind_addr();
    let app = build_router(AppState::new(db, cfg));

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/responses", get(api::get_responses))
        .route("/responses/:id", get(api::get_response))
        .route("/responses/:id/attachments", get(api::get_response_attachments))
        .route("/conversations", get(api::get_conversations))
        .route("/conversations/:id", get(api::get_conversation))
        .route("/tools", get(api::get_tools))
        .route("/tools/:id/calls", get(api::get_tool_calls))
        .route("/tools/:id/results", get(api::get_tool_results))
        .route("/metrics/summary", get(api::summary))
        .route("/metrics/models", get(api::model_usage))
        .route("/metrics/tokens", get(api::tokens_over_time))
        .route("/metrics/responses-over-time", get(api::responses_over_time))
        .route("/metrics/latency", get(api::latency))
        .route("/search", get(api::search));

    Router::new()
        .route("/", get(views::dashboard))
        .route("/responses", get(views::response_list))
        .route("/responses/:id", get(views::response_detail))
        .route("/conversations", get(views::conversation_list))
        .route("/conversations/:id", get(views::conversation_detail))
        .route("/search", get(views::search_page))
        .route("/health", get(api::health))
        .nest("/api", api_routes)
        .fallback(views::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}
