use crate::error::{DashboardError, DashboardResult};
use crate::log_db::filters::{PagedQuery, Pagination, WhereClause};
use crate::log_db::response_store::{row_to_response_summary, RESPONSE_COLUMNS};
use crate::log_db::schema::*;
use crate::log_db::{checkout, SqlitePool};
use rusqlite::{OptionalExtension, Row};
use std::sync::Arc;
use tracing::debug;

/// The listing joins `responses` for its statistics only when that table exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConversationListShape {
    WithResponses,
    ConversationsOnly,
}

impl ConversationListShape {
    fn select(tables: &TableSet) -> Self {
        if tables.has(AvailableTable::Responses) {
            Self::WithResponses
        } else {
            Self::ConversationsOnly
        }
    }

    fn query(self, filter: &WhereClause) -> PagedQuery<'_> {
        match self {
            Self::WithResponses => PagedQuery {
                select: "c.id, c.name, c.model,
                         COUNT(r.id),
                         MIN(r.datetime_utc),
                         MAX(r.datetime_utc) AS last_response,
                         COALESCE(SUM(r.input_tokens), 0),
                         COALESCE(SUM(r.output_tokens), 0)",
                from: "conversations c LEFT JOIN responses r ON c.id = r.conversation_id",
                group_by: Some("c.id"),
                order_by: "last_response DESC NULLS LAST, c.id",
                filter,
            },
            Self::ConversationsOnly => PagedQuery {
                select: "c.id, c.name, c.model, 0, NULL, NULL, 0, 0",
                from: "conversations c",
                group_by: None,
                order_by: "c.id",
                filter,
            },
        }
    }
}

fn row_to_conversation_summary(row: &Row<'_>) -> rusqlite::Result<ConversationSummary> {
    Ok(ConversationSummary {
        id: row.get(0)?,
        name: row.get(1)?,
        model: row.get(2)?,
        response_count: row.get(3)?,
        first_response: row.get(4)?,
        last_response: row.get(5)?,
        total_input_tokens: row.get(6)?,
        total_output_tokens: row.get(7)?,
    })
}

pub struct ConversationStore {
    pool: Arc<SqlitePool>,
}

impl ConversationStore {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    /// Most recently active first; conversations without responses last.
    pub fn list(&self, page: &Pagination) -> DashboardResult<Page<ConversationSummary>> {
        let (conn, tables) = checkout(&self.pool)?;
        if !tables.has(AvailableTable::Conversations) {
            return Ok(Page::empty(page.limit, page.offset));
        }

        let filter = WhereClause::new();
        let shape = ConversationListShape::select(&tables);
        let result = shape.query(&filter).fetch(&conn, page, row_to_conversation_summary)?;
        debug!("Listed {} of {} conversations ({:?})", result.items.len(), result.total, shape);
        Ok(result)
    }

    /// The conversation and its responses in ascending time order.
    pub fn get(&self, conversation_id: &str) -> DashboardResult<ConversationDetail> {
        let (conn, tables) = checkout(&self.pool)?;
        if !tables.has(AvailableTable::Conversations) {
            return Err(DashboardError::NotFound("Conversation".into()));
        }

        let conversation = conn
            .query_row(
                "SELECT id, name, model FROM conversations WHERE id = ?1",
                [conversation_id],
                |row| Ok(Conversation { id: row.get(0)?, name: row.get(1)?, model: row.get(2)? }),
            )
            .optional()?
            .ok_or_else(|| DashboardError::NotFound("Conversation".into()))?;

        let responses = if tables.has(AvailableTable::Responses) {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM responses WHERE conversation_id = ?1 ORDER BY datetime_utc, id",
                RESPONSE_COLUMNS
            ))?;
            let rows = stmt
                .query_map([conversation_id], row_to_response_summary)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        } else {
            Vec::new()
        };

        Ok(ConversationDetail { conversation, responses })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Fixture, Row as FixtureRow};

    fn seeded() -> Fixture {
        let fixture = Fixture::new();
        fixture.conversation("old", Some("Old chat"), Some("gpt-4o"));
        fixture.conversation("new", Some("New chat"), Some("claude-3"));
        fixture.conversation("empty", None, None);
        fixture.response(FixtureRow {
            conversation_id: Some("old"),
            input_tokens: Some(10),
            output_tokens: Some(20),
            ..FixtureRow::new("r1", "gpt-4o", "2024-01-01T00:00:00")
        });
        fixture.response(FixtureRow {
            conversation_id: Some("new"),
            input_tokens: Some(1),
            ..FixtureRow::new("r2", "claude-3", "2024-02-01T00:00:00")
        });
        fixture.response(FixtureRow {
            conversation_id: Some("new"),
            output_tokens: Some(4),
            ..FixtureRow::new("r3", "claude-3", "2024-02-02T00:00:00")
        });
        fixture
    }

    #[test]
    fn test_list_orders_by_last_response_nulls_last() {
        let fixture = seeded();
        let db = fixture.open();

        let page = db.conversations.list(&Pagination { limit: 50, offset: 0 }).unwrap();
        assert_eq!(page.total, 3);
        let ids: Vec<_> = page.items.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "empty"]);

        let newest = &page.items[0];
        assert_eq!(newest.response_count, 2);
        assert_eq!(newest.first_response.as_deref(), Some("2024-02-01T00:00:00"));
        assert_eq!(newest.last_response.as_deref(), Some("2024-02-02T00:00:00"));
        assert_eq!(newest.total_input_tokens, 1);
        assert_eq!(newest.total_output_tokens, 4);
        assert_eq!(page.items[2].response_count, 0);
    }

    #[test]
    fn test_list_pagination_window() {
        let fixture = seeded();
        let db = fixture.open();
        let page = db.conversations.list(&Pagination { limit: 1, offset: 1 }).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "old");
    }

    #[test]
    fn test_detail_lists_responses_in_time_order() {
        let fixture = seeded();
        let db = fixture.open();
        let detail = db.conversations.get("new").unwrap();
        assert_eq!(detail.conversation.name.as_deref(), Some("New chat"));
        let ids: Vec<_> = detail.responses.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r2", "r3"]);
    }

    #[test]
    fn test_detail_missing_is_not_found() {
        let fixture = seeded();
        let db = fixture.open();
        assert!(matches!(db.conversations.get("nope"), Err(DashboardError::NotFound(_))));
    }

    #[test]
    fn test_without_conversations_table() {
        let fixture = Fixture::bare();
        let db = fixture.open();
        let page = db.conversations.list(&Pagination { limit: 50, offset: 0 }).unwrap();
        assert_eq!(page.total, 0);
        assert!(matches!(db.conversations.get("any"), Err(DashboardError::NotFound(_))));
    }

    #[test]
    fn test_without_responses_table_uses_bare_shape() {
        let fixture = Fixture::with_schema(
            "CREATE TABLE _llm_migrations (name TEXT PRIMARY KEY, applied_at TEXT);
             CREATE TABLE conversations (id TEXT PRIMARY KEY, name TEXT, model TEXT);
             INSERT INTO conversations VALUES ('b', 'B', NULL), ('a', 'A', NULL);",
        );
        let db = fixture.open();
        let page = db.conversations.list(&Pagination { limit: 50, offset: 0 }).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].id, "a");
        assert!(db.conversations.get("a").unwrap().responses.is_empty());
    }
}
