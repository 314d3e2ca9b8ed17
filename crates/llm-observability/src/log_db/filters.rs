//! Query building: caller filters become a list of ANDed predicates over
//! allow-listed columns plus named bound parameters. User-supplied values
//! only ever travel as parameters.

use rusqlite::{Connection, Row, ToSql};

use crate::error::{DashboardError, DashboardResult};
use crate::log_db::schema::Page;

pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_API_LIMIT: i64 = 500;
pub const MAX_VIEW_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    /// `limit` in `[1, max_limit]` (default 50), `offset >= 0` (default 0).
    pub fn new(limit: Option<i64>, offset: Option<i64>, max_limit: i64) -> DashboardResult<Self> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT.min(max_limit));
        let offset = offset.unwrap_or(0);
        if !(1..=max_limit).contains(&limit) {
            return Err(DashboardError::InvalidParameter(format!(
                "limit must be between 1 and {}",
                max_limit
            )));
        }
        if offset < 0 {
            return Err(DashboardError::InvalidParameter("offset must be >= 0".into()));
        }
        Ok(Self { limit, offset })
    }

    pub fn api(limit: Option<i64>, offset: Option<i64>) -> DashboardResult<Self> {
        Self::new(limit, offset, MAX_API_LIMIT)
    }

    /// Page numbers start at 1.
    pub fn from_page(page: Option<i64>, limit: Option<i64>) -> DashboardResult<Self> {
        let page = page.unwrap_or(1);
        if page < 1 {
            return Err(DashboardError::InvalidParameter("page must be >= 1".into()));
        }
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        let offset = (page - 1).checked_mul(limit).ok_or_else(|| {
            DashboardError::InvalidParameter("page is out of range".into())
        })?;
        Self::new(Some(limit), Some(offset), MAX_VIEW_LIMIT)
    }

    pub fn page_number(&self) -> i64 {
        self.offset / self.limit + 1
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            0
        } else {
            (total + self.limit - 1) / self.limit
        }
    }
}

/// Inclusive bounds, compared as strings against the stored datetime text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl DateRange {
    pub fn new(start: Option<String>, end: Option<String>) -> Self {
        Self {
            start: start.filter(|s| !s.is_empty()),
            end: end.filter(|s| !s.is_empty()),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn apply(&self, clause: &mut WhereClause, column: DatetimeColumn) {
        if let Some(start) = &self.start {
            clause.and_cmp(column.name(), ">=", ":start_date", start.clone());
        }
        if let Some(end) = &self.end {
            clause.and_cmp(column.name(), "<=", ":end_date", end.clone());
        }
    }
}

/// The two spellings of the response timestamp column the queries use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatetimeColumn {
    Bare,
    Aliased,
}

impl DatetimeColumn {
    fn name(self) -> &'static str {
        match self {
            DatetimeColumn::Bare => "datetime_utc",
            DatetimeColumn::Aliased => "r.datetime_utc",
        }
    }
}

/// Filters accepted by the response listing.
#[derive(Debug, Clone, Default)]
pub struct ResponseFilter {
    pub model: Option<String>,
    pub conversation_id: Option<String>,
    pub dates: DateRange,
}

impl ResponseFilter {
    pub fn to_where(&self) -> WhereClause {
        let mut clause = WhereClause::new();
        if let Some(model) = self.model.as_ref().filter(|m| !m.is_empty()) {
            clause.and_cmp("model", "=", ":model", model.clone());
        }
        if let Some(conversation_id) = self.conversation_id.as_ref().filter(|c| !c.is_empty()) {
            clause.and_cmp("conversation_id", "=", ":conversation_id", conversation_id.clone());
        }
        self.dates.apply(&mut clause, DatetimeColumn::Bare);
        clause
    }
}

#[derive(Default)]
pub struct WhereClause {
    predicates: Vec<String>,
    params: Vec<(&'static str, Box<dyn ToSql>)>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// `column op :param`; all three pieces are compile-time constants.
    pub fn and_cmp<V>(&mut self, column: &'static str, op: &'static str, param: &'static str, value: V)
    where
        V: ToSql + 'static,
    {
        self.predicates.push(format!("{} {} {}", column, op, param));
        self.params.push((param, Box::new(value)));
    }

    pub fn and_fixed(&mut self, predicate: &'static str) {
        self.predicates.push(predicate.to_string());
    }

    /// Bind a parameter referenced by a fixed predicate.
    pub fn bind<V>(&mut self, param: &'static str, value: V)
    where
        V: ToSql + 'static,
    {
        self.params.push((param, Box::new(value)));
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn sql(&self) -> String {
        if self.predicates.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.predicates.join(" AND "))
        }
    }

    pub fn params(&self) -> Vec<(&str, &dyn ToSql)> {
        self.params.iter().map(|(name, value)| (*name, value.as_ref())).collect()
    }

    pub fn params_with_page<'a>(&'a self, page: &'a Pagination) -> Vec<(&'a str, &'a dyn ToSql)> {
        let mut params = self.params();
        params.push((":limit", &page.limit as &dyn ToSql));
        params.push((":offset", &page.offset as &dyn ToSql));
        params
    }
}

/// A COUNT query and a LIMIT/OFFSET query generated from one shape, so the
/// total and the page always see the same predicate.
pub struct PagedQuery<'a> {
    pub select: &'static str,
    pub from: &'static str,
    pub group_by: Option<&'static str>,
    pub order_by: &'static str,
    pub filter: &'a WhereClause,
}

impl<'a> PagedQuery<'a> {
    pub fn count_sql(&self) -> String {
        match self.group_by {
            Some(group_by) => format!(
                "SELECT COUNT(*) FROM (SELECT 1 FROM {}{} GROUP BY {})",
                self.from,
                self.filter.sql(),
                group_by
            ),
            None => format!("SELECT COUNT(*) FROM {}{}", self.from, self.filter.sql()),
        }
    }

    pub fn page_sql(&self) -> String {
        let group_by = self
            .group_by
            .map(|g| format!(" GROUP BY {}", g))
            .unwrap_or_default();
        format!(
            "SELECT {} FROM {}{}{} ORDER BY {} LIMIT :limit OFFSET :offset",
            self.select,
            self.from,
            self.filter.sql(),
            group_by,
            self.order_by
        )
    }

    pub fn fetch<T, F>(&self, conn: &Connection, page: &Pagination, map_row: F) -> rusqlite::Result<Page<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let total: i64 = conn.query_row(&self.count_sql(), self.filter.params().as_slice(), |row| row.get(0))?;

        let mut stmt = conn.prepare(&self.page_sql())?;
        let items = stmt
            .query_map(self.filter.params_with_page(page).as_slice(), map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Page {
            items,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }
}
