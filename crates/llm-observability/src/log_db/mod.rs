//! Log database module - read-only access to the SQLite store written by the llm CLI
pub mod schema;
pub mod filters;
pub mod response_store;
pub mod conversation_store;
pub mod tool_store;
pub mod metrics_store;
pub mod search_store;
pub use schema::*;
pub use filters::{DateRange, Pagination, ResponseFilter};
pub use response_store::ResponseStore;
pub use conversation_store::ConversationStore;
pub use tool_store::ToolStore;
pub use metrics_store::{Granularity, MetricsStore, LATENCY_BUCKETS};
pub use search_store::{IndexedSearch, SearchPage, SearchStore, SearchStrategy};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};
use crate::error::{DashboardError, DashboardResult};

pub type SqlitePool = Pool<SqliteConnectionManager>;
pub type PooledConn = PooledConnection<SqliteConnectionManager>;

const POOL_SIZE: u32 = 8;

fn read_only_flags() -> OpenFlags {
    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI
}

/// Fails with `DatabaseNotFound` if the file is absent and `InvalidDatabase`
/// if the llm migrations table is missing.
pub fn validate_database(db_path: &Path) -> DashboardResult<Connection> {
    if !db_path.exists() {
        return Err(DashboardError::DatabaseNotFound(db_path.to_path_buf()));
    }
    let conn = Connection::open_with_flags(db_path, read_only_flags())
        .map_err(|_| DashboardError::InvalidDatabase(db_path.to_path_buf()))?;
    let tables = TableSet::probe(&conn).map_err(|_| DashboardError::InvalidDatabase(db_path.to_path_buf()))?;
    if !tables.has(AvailableTable::Migrations) {
        return Err(DashboardError::InvalidDatabase(db_path.to_path_buf()));
    }
    Ok(conn)
}

/// Every store shares one pool of read-only connections.
pub(crate) fn checkout(pool: &SqlitePool) -> DashboardResult<(PooledConn, TableSet)> {
    let conn = pool.get()?;
    let tables = TableSet::probe(&conn)?;
    Ok((conn, tables))
}

pub struct LogDatabase {
    pub responses: ResponseStore,
    pub conversations: ConversationStore,
    pub tools: ToolStore,
    pub metrics: MetricsStore,
    pub search: SearchStore,
    path: PathBuf,
    pool: Arc<SqlitePool>,
}

impl LogDatabase {
    pub fn open(db_path: &Path) -> DashboardResult<Self> {
        info!("Opening llm log database at: {}", db_path.display());
        drop(validate_database(db_path)?);

        let manager = SqliteConnectionManager::file(db_path)
            .with_flags(read_only_flags())
            .with_init(|conn| conn.execute_batch("PRAGMA query_only = ON; PRAGMA busy_timeout = 5000;"));
        let pool = Pool::builder().max_size(POOL_SIZE).build(manager)?;
        let pool = Arc::new(pool);

        {
            let (_, tables) = checkout(&pool)?;
            debug!(
                "Optional tables present: {:?}",
                AvailableTable::ALL
                    .iter()
                    .filter(|t| tables.has(**t))
                    .map(|t| t.table_name())
                    .collect::<Vec<_>>()
            );
        }

        info!("Log database opened read-only");
        Ok(Self {
            responses: ResponseStore::new(Arc::clone(&pool)),
            conversations: ConversationStore::new(Arc::clone(&pool)),
            tools: ToolStore::new(Arc::clone(&pool)),
            metrics: MetricsStore::new(Arc::clone(&pool)),
            search: SearchStore::new(Arc::clone(&pool)),
            path: db_path.to_path_buf(),
            pool,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tables(&self) -> DashboardResult<TableSet> {
        let (_, tables) = checkout(&self.pool)?;
        Ok(tables)
    }
}
