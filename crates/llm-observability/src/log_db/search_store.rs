//! Full-text search over prompts and responses.
//!
//! The FTS5 index is tried first when it exists. A missing index, or any
//! failure running the MATCH query, degrades to a LIKE scan that produces
//! the same result shape.

use std::sync::Arc;

use rusqlite::{Connection, Row};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{DashboardError, DashboardResult};
use crate::log_db::filters::{PagedQuery, Pagination, WhereClause};
use crate::log_db::schema::*;
use crate::log_db::{checkout, SqlitePool};
use crate::utils::{TextUtils, DEFAULT_SNIPPET_LENGTH};

const HIT_COLUMNS: &str = "r.id, r.model, r.prompt, r.response, r.datetime_utc, r.conversation_id";
const HIT_ORDER: &str = "r.datetime_utc DESC, r.id DESC";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    Fts,
    Like,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub query: String,
    pub strategy: SearchStrategy,
    pub items: Vec<SearchHit>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl SearchPage {
    fn from_page(query: &str, strategy: SearchStrategy, page: Page<SearchHit>) -> Self {
        Self {
            query: query.to_string(),
            strategy,
            items: page.items,
            total: page.total,
            limit: page.limit,
            offset: page.offset,
        }
    }
}

/// Outcome of the indexed attempt; the caller decides whether to fall back.
#[derive(Debug)]
pub enum IndexedSearch {
    IndexedHit(Page<SearchHit>),
    IndexedFailed(rusqlite::Error),
    NoIndex,
}

/// Wrap the query as one FTS5 phrase: inner quotes are doubled, so the
/// match is phrase containment rather than FTS query syntax.
pub fn fts_phrase(query: &str) -> String {
    format!("\"{}\"", query.replace('"', "\"\""))
}

/// `%query%` with `\`, `%` and `_` escaped for `LIKE ... ESCAPE '\'`.
pub fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn hit_mapper(query: &str) -> impl FnMut(&Row<'_>) -> rusqlite::Result<SearchHit> + '_ {
    move |row| {
        let prompt: Option<String> = row.get(2)?;
        let response: Option<String> = row.get(3)?;
        Ok(SearchHit {
            id: row.get(0)?,
            model: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            prompt_snippet: TextUtils::create_snippet(prompt.as_deref(), query, DEFAULT_SNIPPET_LENGTH),
            response_snippet: TextUtils::create_snippet(response.as_deref(), query, DEFAULT_SNIPPET_LENGTH),
            prompt,
            response,
            datetime_utc: row.get(4)?,
            conversation_id: row.get(5)?,
        })
    }
}

pub struct SearchStore {
    pool: Arc<SqlitePool>,
}

impl SearchStore {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    pub fn search(&self, query: &str, page: &Pagination) -> DashboardResult<SearchPage> {
        if query.is_empty() {
            return Err(DashboardError::InvalidParameter("q must not be empty".into()));
        }
        let (conn, tables) = checkout(&self.pool)?;
        if !tables.has(AvailableTable::Responses) {
            return Ok(SearchPage::from_page(query, SearchStrategy::Like, Page::empty(page.limit, page.offset)));
        }

        match Self::search_indexed(&conn, &tables, query, page) {
            IndexedSearch::IndexedHit(hits) => {
                debug!("FTS search for {:?} matched {} responses", query, hits.total);
                Ok(SearchPage::from_page(query, SearchStrategy::Fts, hits))
            }
            IndexedSearch::IndexedFailed(err) => {
                warn!("FTS search failed, falling back to LIKE: {}", err);
                let hits = Self::search_like(&conn, query, page)?;
                Ok(SearchPage::from_page(query, SearchStrategy::Like, hits))
            }
            IndexedSearch::NoIndex => {
                let hits = Self::search_like(&conn, query, page)?;
                debug!("LIKE search for {:?} matched {} responses", query, hits.total);
                Ok(SearchPage::from_page(query, SearchStrategy::Like, hits))
            }
        }
    }

    pub fn search_indexed(conn: &Connection, tables: &TableSet, query: &str, page: &Pagination) -> IndexedSearch {
        if !tables.has(AvailableTable::ResponsesFts) {
            return IndexedSearch::NoIndex;
        }
        let mut filter = WhereClause::new();
        filter.and_cmp("responses_fts", "MATCH", ":phrase", fts_phrase(query));
        let paged = PagedQuery {
            select: HIT_COLUMNS,
            from: "responses r JOIN responses_fts ON r.rowid = responses_fts.rowid",
            group_by: None,
            order_by: HIT_ORDER,
            filter: &filter,
        };
        match paged.fetch(conn, page, hit_mapper(query)) {
            Ok(hits) => IndexedSearch::IndexedHit(hits),
            Err(err) => IndexedSearch::IndexedFailed(err),
        }
    }

    pub fn search_like(conn: &Connection, query: &str, page: &Pagination) -> rusqlite::Result<Page<SearchHit>> {
        let mut filter = WhereClause::new();
        filter.and_fixed("(r.prompt LIKE :pattern ESCAPE '\\' OR r.response LIKE :pattern ESCAPE '\\')");
        filter.bind(":pattern", like_pattern(query));
        let paged = PagedQuery {
            select: HIT_COLUMNS,
            from: "responses r",
            group_by: None,
            order_by: HIT_ORDER,
            filter: &filter,
        };
        paged.fetch(conn, page, hit_mapper(query))
    }
}
