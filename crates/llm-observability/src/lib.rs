// llm-observability/crates/llm-observability/src/lib.rs

pub mod api;
pub mod config;
pub mod error;
pub mod log_db;
pub mod server;
pub mod shared_state;
pub mod telemetry;
pub mod utils;
pub mod views;

#[cfg(test)]
pub(crate) mod test_support;

// Public API exports
pub use config::{Config, ConfigOverrides};
pub use error::{DashboardError, DashboardResult};
pub use log_db::LogDatabase;
pub use server::{build_router, run_server};
pub use shared_state::AppState;
