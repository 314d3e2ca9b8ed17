use crate::error::{DashboardError, DashboardResult};
use crate::log_db::filters::{PagedQuery, Pagination, ResponseFilter};
use crate::log_db::schema::*;
use crate::log_db::{checkout, SqlitePool};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::Arc;
use tracing::debug;

pub(crate) const RESPONSE_COLUMNS: &str =
    "id, model, prompt, response, conversation_id, duration_ms, datetime_utc, input_tokens, output_tokens";

pub(crate) fn row_to_response_summary(row: &Row<'_>) -> rusqlite::Result<ResponseSummary> {
    Ok(ResponseSummary {
        id: row.get(0)?,
        model: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        prompt: row.get(2)?,
        response: row.get(3)?,
        conversation_id: row.get(4)?,
        duration_ms: row.get(5)?,
        datetime_utc: row.get(6)?,
        input_tokens: row.get(7)?,
        output_tokens: row.get(8)?,
    })
}

pub struct ResponseStore {
    pool: Arc<SqlitePool>,
}

impl ResponseStore {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    /// Newest first.
    pub fn list(&self, filter: &ResponseFilter, page: &Pagination) -> DashboardResult<Page<ResponseSummary>> {
        let (conn, tables) = checkout(&self.pool)?;
        if !tables.has(AvailableTable::Responses) {
            return Ok(Page::empty(page.limit, page.offset));
        }

        let clause = filter.to_where();
        let query = PagedQuery {
            select: RESPONSE_COLUMNS,
            from: "responses",
            group_by: None,
            order_by: "datetime_utc DESC, id DESC",
            filter: &clause,
        };
        let result = query.fetch(&conn, page, row_to_response_summary)?;
        debug!("Listed {} of {} responses", result.items.len(), result.total);
        Ok(result)
    }

    pub fn recent(&self, limit: i64) -> DashboardResult<Vec<ResponseSummary>> {
        let page = Pagination { limit, offset: 0 };
        Ok(self.list(&ResponseFilter::default(), &page)?.items)
    }

    pub fn distinct_models(&self) -> DashboardResult<Vec<String>> {
        let (conn, tables) = checkout(&self.pool)?;
        if !tables.has(AvailableTable::Responses) {
            return Ok(Vec::new());
        }
        let mut stmt = conn.prepare(
            "SELECT DISTINCT model FROM responses WHERE model IS NOT NULL AND model != '' ORDER BY model",
        )?;
        let models = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(models)
    }

    pub fn get(&self, response_id: &str) -> DashboardResult<ResponseDetail> {
        let (conn, tables) = checkout(&self.pool)?;
        if !tables.has(AvailableTable::Responses) {
            return Err(DashboardError::NotFound("Response".into()));
        }

        let found = conn
            .query_row(
                &format!("SELECT {}, system FROM responses WHERE id = ?1", RESPONSE_COLUMNS),
                [response_id],
                |row| Ok((row_to_response_summary(row)?, row.get::<_, Option<String>>(9)?)),
            )
            .optional()?;
        let (summary, system) = found.ok_or_else(|| DashboardError::NotFound("Response".into()))?;

        let tool_calls = if tables.has(AvailableTable::ToolCalls) {
            Self::tool_calls_for(&conn, response_id)?
        } else {
            Vec::new()
        };
        let tool_results = if tables.has(AvailableTable::ToolResults) {
            Self::tool_results_for(&conn, response_id)?
        } else {
            Vec::new()
        };

        Ok(ResponseDetail { summary, system, tool_calls, tool_results })
    }

    /// Ordered by the link's `order`; empty when either table is missing.
    pub fn attachments(&self, response_id: &str) -> DashboardResult<Vec<AttachmentInfo>> {
        let (conn, tables) = checkout(&self.pool)?;
        if !tables.has_all(&[AvailableTable::PromptAttachments, AvailableTable::Attachments]) {
            return Ok(Vec::new());
        }
        let mut stmt = conn.prepare(
            "SELECT a.id, a.type, a.path, a.url, COALESCE(pa.\"order\", 0)
             FROM prompt_attachments pa
             JOIN attachments a ON a.id = pa.attachment_id
             WHERE pa.response_id = ?1
             ORDER BY pa.\"order\", a.id",
        )?;
        let attachments = stmt
            .query_map([response_id], |row| {
                Ok(AttachmentInfo {
                    id: row.get(0)?,
                    mime_type: row.get(1)?,
                    path: row.get(2)?,
                    url: row.get(3)?,
                    order: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(attachments)
    }

    /// The conversation a response belongs to, if it still exists.
    pub fn conversation_of(&self, response: &ResponseSummary) -> DashboardResult<Option<Conversation>> {
        let Some(conversation_id) = response.conversation_id.as_deref() else {
            return Ok(None);
        };
        let (conn, tables) = checkout(&self.pool)?;
        if !tables.has(AvailableTable::Conversations) {
            return Ok(None);
        }
        let conversation = conn
            .query_row(
                "SELECT id, name, model FROM conversations WHERE id = ?1",
                params![conversation_id],
                |row| Ok(Conversation { id: row.get(0)?, name: row.get(1)?, model: row.get(2)? }),
            )
            .optional()?;
        Ok(conversation)
    }

    fn tool_calls_for(conn: &Connection, response_id: &str) -> rusqlite::Result<Vec<ToolCall>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, arguments, tool_call_id FROM tool_calls WHERE response_id = ?1 ORDER BY id",
        )?;
        let calls = stmt
            .query_map([response_id], |row| {
                Ok(ToolCall {
                    id: row.get(0)?,
                    name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    arguments: row.get(2)?,
                    tool_call_id: row.get(3)?,
                })
            })?
            .collect();
        calls
    }

    fn tool_results_for(conn: &Connection, response_id: &str) -> rusqlite::Result<Vec<ToolResult>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, output, exception, tool_call_id FROM tool_results WHERE response_id = ?1 ORDER BY id",
        )?;
        let results = stmt
            .query_map([response_id], |row| {
                Ok(ToolResult {
                    id: row.get(0)?,
                    name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    output: row.get(2)?,
                    exception: row.get(3)?,
                    tool_call_id: row.get(4)?,
                })
            })?
            .collect();
        results
    }
}
