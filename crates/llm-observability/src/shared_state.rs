//! State shared by every request handler.
//!
//! Nothing here is mutated after startup; the database handle owns its own
//! connection pool, so handlers only need cheap `Arc` clones.

use std::sync::Arc;

use crate::config::Config;
use crate::error::{DashboardError, DashboardResult};
use crate::log_db::LogDatabase;

#[derive(Clone)]
pub struct AppState {
    /// Read-only log database with its connection pool
    pub db: Arc<LogDatabase>,

    /// Configuration (read-only after initialization)
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: LogDatabase, config: Config) -> Self {
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
        }
    }

    /// Run a database operation on the blocking pool.
    pub async fn with_db<T, F>(&self, op: F) -> DashboardResult<T>
    where
        F: FnOnce(&LogDatabase) -> DashboardResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| DashboardError::Task(e.to_string()))?
    }
}
