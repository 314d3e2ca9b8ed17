//! Row shapes read from the llm log database, and the table probe
//! that decides which of its optional tables may be queried.
use std::collections::HashSet;

use rusqlite::Connection;
use serde::Serialize;

/// Tables the dashboard knows how to read. Everything except the migrations
/// marker is optional and may be absent from an older or partial database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AvailableTable {
    Migrations,
    Responses,
    Conversations,
    Tools,
    ToolCalls,
    ToolResults,
    PromptAttachments,
    Attachments,
    ResponsesFts,
}

impl AvailableTable {
    pub const ALL: [AvailableTable; 9] = [
        AvailableTable::Migrations,
        AvailableTable::Responses,
        AvailableTable::Conversations,
        AvailableTable::Tools,
        AvailableTable::ToolCalls,
        AvailableTable::ToolResults,
        AvailableTable::PromptAttachments,
        AvailableTable::Attachments,
        AvailableTable::ResponsesFts,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            AvailableTable::Migrations => "_llm_migrations",
            AvailableTable::Responses => "responses",
            AvailableTable::Conversations => "conversations",
            AvailableTable::Tools => "tools",
            AvailableTable::ToolCalls => "tool_calls",
            AvailableTable::ToolResults => "tool_results",
            AvailableTable::PromptAttachments => "prompt_attachments",
            AvailableTable::Attachments => "attachments",
            AvailableTable::ResponsesFts => "responses_fts",
        }
    }

    fn from_table_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.table_name() == name)
    }
}

/// The capability set for one connection at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSet {
    tables: HashSet<AvailableTable>,
}

impl TableSet {
    pub fn probe(conn: &Connection) -> rusqlite::Result<Self> {
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type IN ('table', 'view')")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut tables = HashSet::new();
        for name in names {
            if let Some(table) = AvailableTable::from_table_name(&name?) {
                tables.insert(table);
            }
        }
        Ok(Self { tables })
    }

    pub fn has(&self, table: AvailableTable) -> bool {
        self.tables.contains(&table)
    }

    pub fn has_all(&self, tables: &[AvailableTable]) -> bool {
        tables.iter().all(|t| self.has(*t))
    }
}

impl FromIterator<AvailableTable> for TableSet {
    fn from_iter<I: IntoIterator<Item = AvailableTable>>(iter: I) -> Self {
        Self { tables: iter.into_iter().collect() }
    }
}

/// One page of an ordered result set plus the size of the whole set.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T> Page<T> {
    pub fn empty(limit: i64, offset: i64) -> Self {
        Self { items: Vec::new(), total: 0, limit, offset }
    }
}

/// An unpaginated listing.
#[derive(Debug, Clone, Serialize)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total: i64,
}

impl<T> From<Vec<T>> for Listing<T> {
    fn from(items: Vec<T>) -> Self {
        let total = items.len() as i64;
        Self { items, total }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseSummary {
    pub id: String,
    pub model: String,
    pub prompt: Option<String>,
    pub response: Option<String>,
    pub conversation_id: Option<String>,
    pub duration_ms: Option<i64>,
    pub datetime_utc: Option<String>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseDetail {
    #[serde(flatten)]
    pub summary: ResponseSummary,
    pub system: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolCall {
    pub id: i64,
    pub name: String,
    pub arguments: Option<String>,
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub id: i64,
    pub name: String,
    pub output: Option<String>,
    pub exception: Option<String>,
    pub tool_call_id: Option<String>,
}

impl ToolResult {
    pub fn is_error(&self) -> bool {
        self.exception.is_some()
    }
}

/// Attachment metadata. The binary `content` column is never selected.
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
    pub path: Option<String>,
    pub url: Option<String>,
    pub order: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub id: String,
    pub name: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub id: String,
    pub name: Option<String>,
    pub model: Option<String>,
    pub response_count: i64,
    pub first_response: Option<String>,
    pub last_response: Option<String>,
    pub total_input_tokens: i64,
    pub total_output_tokens: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub responses: Vec<ResponseSummary>,
}

impl ConversationDetail {
    pub fn total_input_tokens(&self) -> i64 {
        self.responses.iter().filter_map(|r| r.input_tokens).sum()
    }

    pub fn total_output_tokens(&self) -> i64 {
        self.responses.iter().filter_map(|r| r.output_tokens).sum()
    }

    pub fn total_duration_ms(&self) -> i64 {
        self.responses.iter().filter_map(|r| r.duration_ms).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Option<String>,
    pub plugin: Option<String>,
    pub call_count: i64,
    pub result_count: i64,
    pub error_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolCallDetail {
    pub id: i64,
    pub response_id: String,
    pub tool_id: i64,
    pub name: String,
    pub arguments: Option<String>,
    pub tool_call_id: Option<String>,
    pub datetime_utc: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolResultDetail {
    pub id: i64,
    pub response_id: String,
    pub tool_id: i64,
    pub name: String,
    pub output: Option<String>,
    pub exception: Option<String>,
    pub tool_call_id: Option<String>,
    pub datetime_utc: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub total_responses: i64,
    pub total_conversations: i64,
    pub total_input_tokens: i64,
    pub total_output_tokens: i64,
    pub total_tokens: i64,
    pub avg_duration_ms: Option<f64>,
    pub avg_input_tokens: Option<f64>,
    pub avg_output_tokens: Option<f64>,
    pub total_tool_calls: i64,
    pub total_tool_errors: i64,
    pub unique_models: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelUsage {
    pub model: String,
    pub response_count: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub avg_duration_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSeriesPoint {
    pub date: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatencyBucket {
    pub range: &'static str,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub model: String,
    pub prompt: Option<String>,
    pub response: Option<String>,
    pub datetime_utc: Option<String>,
    pub conversation_id: Option<String>,
    pub prompt_snippet: Option<String>,
    pub response_snippet: Option<String>,
}
