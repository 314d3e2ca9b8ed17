use crate::error::DashboardResult;
use crate::log_db::filters::{PagedQuery, Pagination, WhereClause};
use crate::log_db::schema::*;
use crate::log_db::{checkout, SqlitePool};
use rusqlite::Row;
use std::sync::Arc;
use tracing::debug;

/// Which usage subqueries the tool listing can join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStatsShape {
    CallsAndResults,
    CallsOnly,
    ResultsOnly,
    DefinitionsOnly,
}

const CALLS_AND_RESULTS_SQL: &str = "
    SELECT t.id, t.name, t.description, t.input_schema, t.plugin,
           COALESCE(tc.call_count, 0) AS call_count,
           COALESCE(tr.result_count, 0),
           COALESCE(tr.error_count, 0)
    FROM tools t
    LEFT JOIN (SELECT tool_id, COUNT(*) AS call_count FROM tool_calls GROUP BY tool_id) tc ON t.id = tc.tool_id
    LEFT JOIN (
        SELECT tool_id,
               COUNT(*) AS result_count,
               SUM(CASE WHEN exception IS NOT NULL THEN 1 ELSE 0 END) AS error_count
        FROM tool_results GROUP BY tool_id
    ) tr ON t.id = tr.tool_id
    ORDER BY call_count DESC, t.id
    LIMIT :limit OFFSET :offset";

const CALLS_ONLY_SQL: &str = "
    SELECT t.id, t.name, t.description, t.input_schema, t.plugin,
           COALESCE(tc.call_count, 0) AS call_count, 0, 0
    FROM tools t
    LEFT JOIN (SELECT tool_id, COUNT(*) AS call_count FROM tool_calls GROUP BY tool_id) tc ON t.id = tc.tool_id
    ORDER BY call_count DESC, t.id
    LIMIT :limit OFFSET :offset";

const RESULTS_ONLY_SQL: &str = "
    SELECT t.id, t.name, t.description, t.input_schema, t.plugin,
           0,
           COALESCE(tr.result_count, 0),
           COALESCE(tr.error_count, 0)
    FROM tools t
    LEFT JOIN (
        SELECT tool_id,
               COUNT(*) AS result_count,
               SUM(CASE WHEN exception IS NOT NULL THEN 1 ELSE 0 END) AS error_count
        FROM tool_results GROUP BY tool_id
    ) tr ON t.id = tr.tool_id
    ORDER BY t.id
    LIMIT :limit OFFSET :offset";

const DEFINITIONS_ONLY_SQL: &str = "
    SELECT id, name, description, input_schema, plugin, 0, 0, 0
    FROM tools
    ORDER BY id
    LIMIT :limit OFFSET :offset";

impl ToolStatsShape {
    pub fn select(tables: &TableSet) -> Self {
        match (tables.has(AvailableTable::ToolCalls), tables.has(AvailableTable::ToolResults)) {
            (true, true) => Self::CallsAndResults,
            (true, false) => Self::CallsOnly,
            (false, true) => Self::ResultsOnly,
            (false, false) => Self::DefinitionsOnly,
        }
    }

    fn sql(self) -> &'static str {
        match self {
            Self::CallsAndResults => CALLS_AND_RESULTS_SQL,
            Self::CallsOnly => CALLS_ONLY_SQL,
            Self::ResultsOnly => RESULTS_ONLY_SQL,
            Self::DefinitionsOnly => DEFINITIONS_ONLY_SQL,
        }
    }
}

fn row_to_tool_definition(row: &Row<'_>) -> rusqlite::Result<ToolDefinition> {
    Ok(ToolDefinition {
        id: row.get(0)?,
        name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        description: row.get(2)?,
        input_schema: row.get(3)?,
        plugin: row.get(4)?,
        call_count: row.get(5)?,
        result_count: row.get(6)?,
        error_count: row.get(7)?,
    })
}

pub struct ToolStore {
    pool: Arc<SqlitePool>,
}

impl ToolStore {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    /// Tools with usage statistics, most called first.
    pub fn list(&self, page: &Pagination) -> DashboardResult<Page<ToolDefinition>> {
        let (conn, tables) = checkout(&self.pool)?;
        if !tables.has(AvailableTable::Tools) {
            return Ok(Page::empty(page.limit, page.offset));
        }

        let shape = ToolStatsShape::select(&tables);
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM tools", [], |row| row.get(0))?;
        let filter = WhereClause::new();
        let mut stmt = conn.prepare(shape.sql())?;
        let items = stmt
            .query_map(filter.params_with_page(page).as_slice(), row_to_tool_definition)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("Listed {} of {} tools ({:?})", items.len(), total, shape);
        Ok(Page { items, total, limit: page.limit, offset: page.offset })
    }

    /// Calls of one tool, newest response first.
    pub fn calls(&self, tool_id: i64, page: &Pagination) -> DashboardResult<Page<ToolCallDetail>> {
        let (conn, tables) = checkout(&self.pool)?;
        if !tables.has(AvailableTable::ToolCalls) {
            return Ok(Page::empty(page.limit, page.offset));
        }

        let mut filter = WhereClause::new();
        filter.and_cmp("tc.tool_id", "=", ":tool_id", tool_id);
        let query = PagedQuery {
            select: "tc.id, tc.response_id, tc.tool_id, tc.name, tc.arguments, tc.tool_call_id, r.datetime_utc",
            from: if tables.has(AvailableTable::Responses) {
                "tool_calls tc LEFT JOIN responses r ON tc.response_id = r.id"
            } else {
                "tool_calls tc LEFT JOIN (SELECT NULL AS id, NULL AS datetime_utc) r ON 0"
            },
            group_by: None,
            order_by: "r.datetime_utc DESC, tc.id DESC",
            filter: &filter,
        };
        Ok(query.fetch(&conn, page, |row| {
            Ok(ToolCallDetail {
                id: row.get(0)?,
                response_id: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                tool_id: row.get(2)?,
                name: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                arguments: row.get(4)?,
                tool_call_id: row.get(5)?,
                datetime_utc: row.get(6)?,
            })
        })?)
    }

    /// Results of one tool, newest response first, optionally only failures.
    pub fn results(
        &self,
        tool_id: i64,
        errors_only: bool,
        page: &Pagination,
    ) -> DashboardResult<Page<ToolResultDetail>> {
        let (conn, tables) = checkout(&self.pool)?;
        if !tables.has(AvailableTable::ToolResults) {
            return Ok(Page::empty(page.limit, page.offset));
        }

        let mut filter = WhereClause::new();
        filter.and_cmp("tr.tool_id", "=", ":tool_id", tool_id);
        if errors_only {
            filter.and_fixed("tr.exception IS NOT NULL");
        }
        let query = PagedQuery {
            select: "tr.id, tr.response_id, tr.tool_id, tr.name, tr.output, tr.exception, tr.tool_call_id, r.datetime_utc",
            from: if tables.has(AvailableTable::Responses) {
                "tool_results tr LEFT JOIN responses r ON tr.response_id = r.id"
            } else {
                "tool_results tr LEFT JOIN (SELECT NULL AS id, NULL AS datetime_utc) r ON 0"
            },
            group_by: None,
            order_by: "r.datetime_utc DESC, tr.id DESC",
            filter: &filter,
        };
        Ok(query.fetch(&conn, page, |row| {
            Ok(ToolResultDetail {
                id: row.get(0)?,
                response_id: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                tool_id: row.get(2)?,
                name: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                output: row.get(4)?,
                exception: row.get(5)?,
                tool_call_id: row.get(6)?,
                datetime_utc: row.get(7)?,
            })
        })?)
    }
}
