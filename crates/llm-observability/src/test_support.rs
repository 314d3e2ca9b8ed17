//! Fixture log databases for tests. Written through a separate read-write
//! connection; the code under test only ever opens them read-only.

use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::{params, Connection};
use tempfile::TempDir;

use crate::log_db::LogDatabase;

pub const LLM_SCHEMA_SQL: &str = "
CREATE TABLE _llm_migrations (name TEXT PRIMARY KEY, applied_at TEXT);
CREATE TABLE conversations (id TEXT PRIMARY KEY, name TEXT, model TEXT);
CREATE TABLE responses (
    id TEXT PRIMARY KEY,
    model TEXT,
    prompt TEXT,
    system TEXT,
    prompt_json TEXT,
    options_json TEXT,
    response TEXT,
    response_json TEXT,
    conversation_id TEXT REFERENCES conversations(id),
    duration_ms INTEGER,
    datetime_utc TEXT,
    input_tokens INTEGER,
    output_tokens INTEGER,
    token_details TEXT
);
CREATE TABLE attachments (id TEXT PRIMARY KEY, type TEXT, path TEXT, url TEXT, content BLOB);
CREATE TABLE prompt_attachments (
    response_id TEXT REFERENCES responses(id),
    attachment_id TEXT REFERENCES attachments(id),
    \"order\" INTEGER,
    PRIMARY KEY (response_id, attachment_id)
);
CREATE TABLE tools (
    id INTEGER PRIMARY KEY,
    hash TEXT,
    name TEXT,
    description TEXT,
    input_schema TEXT,
    plugin TEXT
);
CREATE TABLE tool_calls (
    id INTEGER PRIMARY KEY,
    response_id TEXT REFERENCES responses(id),
    tool_id INTEGER REFERENCES tools(id),
    name TEXT,
    arguments TEXT,
    tool_call_id TEXT
);
CREATE TABLE tool_results (
    id INTEGER PRIMARY KEY,
    response_id TEXT REFERENCES responses(id),
    tool_id INTEGER REFERENCES tools(id),
    name TEXT,
    output TEXT,
    tool_call_id TEXT,
    exception TEXT
);
INSERT INTO _llm_migrations (name, applied_at) VALUES ('m001_initial', '2024-01-01 00:00:00');
";

pub const FTS_SQL: &str = "
CREATE VIRTUAL TABLE responses_fts USING fts5(prompt, response, content=[responses], content_rowid=[rowid]);
INSERT INTO responses_fts (responses_fts) VALUES ('rebuild');
";

/// A response row as the external llm CLI would have written it.
pub struct Row<'a> {
    pub id: &'a str,
    pub model: &'a str,
    pub prompt: Option<&'a str>,
    pub response: Option<&'a str>,
    pub conversation_id: Option<&'a str>,
    pub duration_ms: Option<i64>,
    pub datetime_utc: Option<&'a str>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
}

impl<'a> Row<'a> {
    pub fn new(id: &'a str, model: &'a str, datetime_utc: &'a str) -> Self {
        Self {
            id,
            model,
            prompt: Some("prompt"),
            response: Some("response"),
            conversation_id: None,
            duration_ms: None,
            datetime_utc: Some(datetime_utc),
            input_tokens: None,
            output_tokens: None,
        }
    }
}

pub struct Fixture {
    pub dir: TempDir,
    pub path: PathBuf,
    writer: Connection,
}

impl Fixture {
    /// Full llm schema, no rows, no full-text index.
    pub fn new() -> Self {
        Self::with_schema(LLM_SCHEMA_SQL)
    }

    /// Only the migrations marker: every optional table is missing.
    pub fn bare() -> Self {
        Self::with_schema(
            "CREATE TABLE _llm_migrations (name TEXT PRIMARY KEY, applied_at TEXT);
             INSERT INTO _llm_migrations (name, applied_at) VALUES ('m001_initial', '2024-01-01');",
        )
    }

    pub fn with_schema(sql: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("logs.db");
        let writer = Connection::open(&path).expect("open fixture db");
        writer.execute_batch(sql).expect("create fixture schema");
        Self { dir, path, writer }
    }

    pub fn exec(&self, sql: &str) {
        self.writer.execute_batch(sql).expect("fixture sql");
    }

    pub fn enable_fts(&self) {
        self.exec(FTS_SQL);
    }

    pub fn conversation(&self, id: &str, name: Option<&str>, model: Option<&str>) {
        self.writer
            .execute(
                "INSERT INTO conversations (id, name, model) VALUES (?1, ?2, ?3)",
                params![id, name, model],
            )
            .expect("insert conversation");
    }

    pub fn response(&self, row: Row<'_>) {
        self.writer
            .execute(
                "INSERT INTO responses
                 (id, model, prompt, system, response, conversation_id, duration_ms, datetime_utc, input_tokens, output_tokens)
                 VALUES (?1, ?2, ?3, NULL, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    row.id,
                    row.model,
                    row.prompt,
                    row.response,
                    row.conversation_id,
                    row.duration_ms,
                    row.datetime_utc,
                    row.input_tokens,
                    row.output_tokens,
                ],
            )
            .expect("insert response");
    }

    pub fn tool(&self, id: i64, name: &str) {
        self.writer
            .execute(
                "INSERT INTO tools (id, hash, name, description, input_schema, plugin)
                 VALUES (?1, ?2, ?3, ?4, '{}', NULL)",
                params![id, format!("hash-{}", id), name, format!("{} tool", name)],
            )
            .expect("insert tool");
    }

    pub fn tool_call(&self, id: i64, response_id: &str, tool_id: i64, name: &str) {
        self.writer
            .execute(
                "INSERT INTO tool_calls (id, response_id, tool_id, name, arguments, tool_call_id)
                 VALUES (?1, ?2, ?3, ?4, '{}', ?5)",
                params![id, response_id, tool_id, name, format!("call-{}", id)],
            )
            .expect("insert tool call");
    }

    pub fn tool_result(&self, id: i64, response_id: &str, tool_id: i64, name: &str, exception: Option<&str>) {
        self.writer
            .execute(
                "INSERT INTO tool_results (id, response_id, tool_id, name, output, tool_call_id, exception)
                 VALUES (?1, ?2, ?3, ?4, 'ok', ?5, ?6)",
                params![id, response_id, tool_id, name, format!("call-{}", id), exception],
            )
            .expect("insert tool result");
    }

    pub fn attachment(&self, response_id: &str, attachment_id: &str, order: i64) {
        self.writer
            .execute(
                "INSERT OR IGNORE INTO attachments (id, type, path, url, content)
                 VALUES (?1, 'image/png', ?2, NULL, ?3)",
                params![attachment_id, format!("/tmp/{}.png", attachment_id), vec![0_u8, 1, 2, 3]],
            )
            .expect("insert attachment");
        self.writer
            .execute(
                "INSERT INTO prompt_attachments (response_id, attachment_id, \"order\") VALUES (?1, ?2, ?3)",
                params![response_id, attachment_id, order],
            )
            .expect("insert prompt attachment");
    }

    pub fn open(&self) -> LogDatabase {
        LogDatabase::open(&self.path).expect("open log database")
    }

    pub fn open_shared(&self) -> Arc<LogDatabase> {
        Arc::new(self.open())
    }
}
