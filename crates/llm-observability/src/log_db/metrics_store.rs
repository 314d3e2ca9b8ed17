//! Aggregate usage and latency metrics over the responses table.
//!
//! Every operation takes the same inclusive [`DateRange`] and applies it
//! before aggregating. Averages over zero rows come back as `None`, which
//! SQLite's `AVG` already gives us for an empty set.

use std::str::FromStr;
use std::sync::Arc;

use rusqlite::Connection;
use tracing::debug;

use crate::error::{DashboardError, DashboardResult};
use crate::log_db::filters::{DateRange, DatetimeColumn, WhereClause};
use crate::log_db::schema::*;
use crate::log_db::{checkout, SqlitePool};

pub const DEFAULT_MODEL_LIMIT: i64 = 20;
pub const MAX_MODEL_LIMIT: i64 = 100;

/// Time-series bucket width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    Hour,
    #[default]
    Day,
    Week,
    Month,
}

impl Granularity {
    /// `strftime` truncation for each bucket. Weeks are SQLite's `%W`:
    /// Monday-first, numbered 00-53 within the calendar year.
    pub fn strftime_format(self) -> &'static str {
        match self {
            Granularity::Hour => "%Y-%m-%d %H:00",
            Granularity::Day => "%Y-%m-%d",
            Granularity::Week => "%Y-%W",
            Granularity::Month => "%Y-%m",
        }
    }
}

impl FromStr for Granularity {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hour" => Ok(Granularity::Hour),
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            "month" => Ok(Granularity::Month),
            other => Err(DashboardError::InvalidParameter(format!(
                "granularity must be one of hour, day, week, month (got {:?})",
                other
            ))),
        }
    }
}

/// Half-open `[low, high)` bucket in milliseconds; the last one has no upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyRange {
    pub low: i64,
    pub high: Option<i64>,
    pub label: &'static str,
}

impl LatencyRange {
    pub fn contains(&self, duration_ms: i64) -> bool {
        duration_ms >= self.low && self.high.map_or(true, |high| duration_ms < high)
    }
}

pub const LATENCY_BUCKETS: [LatencyRange; 9] = [
    LatencyRange { low: 0, high: Some(100), label: "0-100ms" },
    LatencyRange { low: 100, high: Some(500), label: "100-500ms" },
    LatencyRange { low: 500, high: Some(1_000), label: "500ms-1s" },
    LatencyRange { low: 1_000, high: Some(2_000), label: "1-2s" },
    LatencyRange { low: 2_000, high: Some(5_000), label: "2-5s" },
    LatencyRange { low: 5_000, high: Some(10_000), label: "5-10s" },
    LatencyRange { low: 10_000, high: Some(30_000), label: "10-30s" },
    LatencyRange { low: 30_000, high: Some(60_000), label: "30-60s" },
    LatencyRange { low: 60_000, high: None, label: "60s+" },
];

/// Index into [`LATENCY_BUCKETS`]; negative durations have no bucket.
pub fn latency_bucket_index(duration_ms: i64) -> Option<usize> {
    LATENCY_BUCKETS.iter().position(|b| b.contains(duration_ms))
}

/// `CASE` expression mapping `duration_ms` to its bucket index, generated
/// from the constant boundaries above.
fn latency_case_sql() -> String {
    let mut sql = String::from("CASE");
    for (index, bucket) in LATENCY_BUCKETS.iter().enumerate() {
        match bucket.high {
            Some(high) => sql.push_str(&format!(
                " WHEN duration_ms >= {} AND duration_ms < {} THEN {}",
                bucket.low, high, index
            )),
            None => sql.push_str(&format!(" WHEN duration_ms >= {} THEN {}", bucket.low, index)),
        }
    }
    sql.push_str(" END");
    sql
}

fn date_filter(dates: &DateRange) -> WhereClause {
    let mut clause = WhereClause::new();
    dates.apply(&mut clause, DatetimeColumn::Bare);
    clause
}

pub struct MetricsStore {
    pool: Arc<SqlitePool>,
}

impl MetricsStore {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    pub fn summary(&self, dates: &DateRange) -> DashboardResult<MetricsSummary> {
        let (conn, tables) = checkout(&self.pool)?;
        if !tables.has(AvailableTable::Responses) {
            return Ok(MetricsSummary::default());
        }

        let clause = date_filter(dates);
        let sql = format!(
            "SELECT
                COUNT(*),
                COALESCE(SUM(input_tokens), 0),
                COALESCE(SUM(output_tokens), 0),
                AVG(duration_ms),
                AVG(input_tokens),
                AVG(output_tokens),
                COUNT(DISTINCT model)
             FROM responses{}",
            clause.sql()
        );
        let mut summary = conn.query_row(&sql, clause.params().as_slice(), |row| {
            let total_input_tokens: i64 = row.get(1)?;
            let total_output_tokens: i64 = row.get(2)?;
            Ok(MetricsSummary {
                total_responses: row.get(0)?,
                total_input_tokens,
                total_output_tokens,
                total_tokens: total_input_tokens + total_output_tokens,
                avg_duration_ms: row.get(3)?,
                avg_input_tokens: row.get(4)?,
                avg_output_tokens: row.get(5)?,
                unique_models: row.get(6)?,
                ..MetricsSummary::default()
            })
        })?;

        if tables.has(AvailableTable::Conversations) {
            summary.total_conversations = Self::count_scoped(
                &conn,
                dates,
                "SELECT COUNT(*) FROM conversations",
                "SELECT COUNT(DISTINCT c.id) FROM conversations c JOIN responses r ON r.conversation_id = c.id",
                None,
            )?;
        }
        if tables.has(AvailableTable::ToolCalls) {
            summary.total_tool_calls = Self::count_scoped(
                &conn,
                dates,
                "SELECT COUNT(*) FROM tool_calls",
                "SELECT COUNT(*) FROM tool_calls tc JOIN responses r ON r.id = tc.response_id",
                None,
            )?;
        }
        if tables.has(AvailableTable::ToolResults) {
            summary.total_tool_errors = Self::count_scoped(
                &conn,
                dates,
                "SELECT COUNT(*) FROM tool_results WHERE exception IS NOT NULL",
                "SELECT COUNT(*) FROM tool_results tr JOIN responses r ON r.id = tr.response_id",
                Some("tr.exception IS NOT NULL"),
            )?;
        }

        debug!("Summary metrics: {:?}", summary);
        Ok(summary)
    }

    /// Without bounds the whole table is counted; with bounds only rows tied
    /// to a response inside the range.
    fn count_scoped(
        conn: &Connection,
        dates: &DateRange,
        unbounded_sql: &'static str,
        scoped_sql: &'static str,
        scoped_predicate: Option<&'static str>,
    ) -> rusqlite::Result<i64> {
        if dates.is_unbounded() {
            return conn.query_row(unbounded_sql, [], |row| row.get(0));
        }
        let mut clause = WhereClause::new();
        if let Some(predicate) = scoped_predicate {
            clause.and_fixed(predicate);
        }
        dates.apply(&mut clause, DatetimeColumn::Aliased);
        let sql = format!("{}{}", scoped_sql, clause.sql());
        conn.query_row(&sql, clause.params().as_slice(), |row| row.get(0))
    }

    /// Ordered by response count, largest first.
    pub fn model_usage(&self, dates: &DateRange, limit: i64) -> DashboardResult<Vec<ModelUsage>> {
        if !(1..=MAX_MODEL_LIMIT).contains(&limit) {
            return Err(DashboardError::InvalidParameter(format!(
                "limit must be between 1 and {}",
                MAX_MODEL_LIMIT
            )));
        }
        let (conn, tables) = checkout(&self.pool)?;
        if !tables.has(AvailableTable::Responses) {
            return Ok(Vec::new());
        }

        let mut clause = date_filter(dates);
        clause.bind(":limit", limit);
        let sql = format!(
            "SELECT
                model,
                COUNT(*) AS response_count,
                COALESCE(SUM(input_tokens), 0),
                COALESCE(SUM(output_tokens), 0),
                AVG(duration_ms)
             FROM responses{}
             GROUP BY model
             ORDER BY response_count DESC, model
             LIMIT :limit",
            clause.sql()
        );
        let mut stmt = conn.prepare(&sql)?;
        let usage = stmt
            .query_map(clause.params().as_slice(), |row| {
                Ok(ModelUsage {
                    model: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    response_count: row.get(1)?,
                    input_tokens: row.get(2)?,
                    output_tokens: row.get(3)?,
                    avg_duration_ms: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(usage)
    }

    /// Input plus output tokens per bucket.
    pub fn tokens_over_time(&self, dates: &DateRange, granularity: Granularity) -> DashboardResult<Vec<TimeSeriesPoint>> {
        self.series(
            dates,
            granularity,
            "COALESCE(SUM(input_tokens), 0) + COALESCE(SUM(output_tokens), 0)",
        )
    }

    pub fn responses_over_time(&self, dates: &DateRange, granularity: Granularity) -> DashboardResult<Vec<TimeSeriesPoint>> {
        self.series(dates, granularity, "COUNT(*)")
    }

    fn series(
        &self,
        dates: &DateRange,
        granularity: Granularity,
        value_sql: &'static str,
    ) -> DashboardResult<Vec<TimeSeriesPoint>> {
        let (conn, tables) = checkout(&self.pool)?;
        if !tables.has(AvailableTable::Responses) {
            return Ok(Vec::new());
        }

        let mut clause = date_filter(dates);
        clause.and_fixed("datetime_utc IS NOT NULL");
        let sql = format!(
            "SELECT strftime('{}', datetime_utc) AS bucket, {}
             FROM responses{}
             GROUP BY bucket
             ORDER BY bucket",
            granularity.strftime_format(),
            value_sql,
            clause.sql()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(clause.params().as_slice(), |row| {
                Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        // Unparseable timestamps truncate to NULL and are dropped.
        Ok(rows
            .into_iter()
            .filter_map(|(bucket, value)| bucket.map(|date| TimeSeriesPoint { date, value }))
            .collect())
    }

    /// All nine buckets, always, in ascending order.
    pub fn latency_histogram(&self, dates: &DateRange) -> DashboardResult<Vec<LatencyBucket>> {
        let mut counts = [0_i64; LATENCY_BUCKETS.len()];

        let (conn, tables) = checkout(&self.pool)?;
        if tables.has(AvailableTable::Responses) {
            let mut clause = date_filter(dates);
            clause.and_fixed("duration_ms IS NOT NULL");
            let sql = format!(
                "SELECT {} AS bucket, COUNT(*) FROM responses{} GROUP BY bucket",
                latency_case_sql(),
                clause.sql()
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(clause.params().as_slice(), |row| {
                    Ok((row.get::<_, Option<i64>>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for (bucket, count) in rows {
                if let Some(slot) = bucket.and_then(|b| usize::try_from(b).ok()).and_then(|b| counts.get_mut(b)) {
                    *slot = count;
                }
            }
        }

        Ok(LATENCY_BUCKETS
            .iter()
            .zip(counts)
            .map(|(bucket, count)| LatencyBucket { range: bucket.label, count })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Fixture, Row as FixtureRow};

    fn seeded() -> Fixture {
        let fixture = Fixture::new();
        fixture.conversation("c1", None, None);
        fixture.conversation("c2", None, None);
        fixture.response(FixtureRow {
            conversation_id: Some("c1"),
            input_tokens: Some(100),
            output_tokens: Some(50),
            duration_ms: Some(99),
            ..FixtureRow::new("r1", "gpt-4o", "2024-01-01T10:15:00")
        });
        fixture.response(FixtureRow {
            conversation_id: Some("c1"),
            input_tokens: Some(10),
            output_tokens: None,
            duration_ms: Some(100),
            ..FixtureRow::new("r2", "gpt-4o", "2024-01-01T11:00:00")
        });
        fixture.response(FixtureRow {
            conversation_id: Some("c2"),
            input_tokens: None,
            output_tokens: Some(5),
            duration_ms: Some(60_000),
            ..FixtureRow::new("r3", "claude-3", "2024-02-03T09:00:00")
        });
        fixture.response(FixtureRow {
            duration_ms: None,
            datetime_utc: None,
            ..FixtureRow::new("r4", "claude-3", "")
        });
        fixture.tool(1, "search");
        fixture.tool_call(1, "r1", 1, "search");
        fixture.tool_call(2, "r3", 1, "search");
        fixture.tool_result(1, "r1", 1, "search", None);
        fixture.tool_result(2, "r3", 1, "search", Some("timeout"));
        fixture
    }

    #[test]
    fn test_bucket_boundaries_are_half_open() {
        assert_eq!(latency_bucket_index(0), Some(0));
        assert_eq!(latency_bucket_index(99), Some(0));
        assert_eq!(latency_bucket_index(100), Some(1));
        assert_eq!(latency_bucket_index(59_999), Some(7));
        assert_eq!(latency_bucket_index(60_000), Some(8));
        assert_eq!(latency_bucket_index(i64::MAX), Some(8));
        assert_eq!(latency_bucket_index(-1), None);
    }

    #[test]
    fn test_granularity_parsing() {
        assert_eq!("week".parse::<Granularity>().unwrap(), Granularity::Week);
        assert!("year".parse::<Granularity>().is_err());
        assert_eq!(Granularity::default().strftime_format(), "%Y-%m-%d");
    }

    #[test]
    fn test_summary_totals() {
        let fixture = seeded();
        let db = fixture.open();
        let summary = db.metrics.summary(&DateRange::default()).unwrap();

        assert_eq!(summary.total_responses, 4);
        assert_eq!(summary.total_conversations, 2);
        assert_eq!(summary.total_input_tokens, 110);
        assert_eq!(summary.total_output_tokens, 55);
        assert_eq!(summary.total_tokens, 165);
        assert_eq!(summary.unique_models, 2);
        assert_eq!(summary.total_tool_calls, 2);
        assert_eq!(summary.total_tool_errors, 1);
        let avg = summary.avg_duration_ms.unwrap();
        assert!((avg - (99.0 + 100.0 + 60_000.0) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_respects_date_range() {
        let fixture = seeded();
        let db = fixture.open();
        let january = DateRange::new(Some("2024-01-01".into()), Some("2024-01-31T23:59:59".into()));
        let summary = db.metrics.summary(&january).unwrap();

        assert_eq!(summary.total_responses, 2);
        assert_eq!(summary.total_tokens, 160);
        assert_eq!(summary.total_conversations, 1);
        assert_eq!(summary.total_tool_calls, 1);
        assert_eq!(summary.total_tool_errors, 0);
    }

    #[test]
    fn test_averages_over_no_rows_are_none() {
        let fixture = seeded();
        let db = fixture.open();
        let nothing = DateRange::new(Some("2030-01-01".into()), None);
        let summary = db.metrics.summary(&nothing).unwrap();

        assert_eq!(summary.total_responses, 0);
        assert_eq!(summary.avg_duration_ms, None);
        assert_eq!(summary.avg_input_tokens, None);
        assert_eq!(summary.avg_output_tokens, None);
    }

    #[test]
    fn test_summary_without_responses_table() {
        let fixture = Fixture::bare();
        let db = fixture.open();
        assert_eq!(db.metrics.summary(&DateRange::default()).unwrap(), MetricsSummary::default());
    }

    #[test]
    fn test_model_usage() {
        let fixture = seeded();
        let db = fixture.open();
        let usage = db.metrics.model_usage(&DateRange::default(), 20).unwrap();

        assert_eq!(usage.len(), 2);
        let gpt = usage.iter().find(|u| u.model == "gpt-4o").unwrap();
        assert_eq!(gpt.response_count, 2);
        assert_eq!(gpt.input_tokens, 110);
        assert_eq!(gpt.output_tokens, 50);
        assert_eq!(gpt.avg_duration_ms, Some(99.5));

        let capped = db.metrics.model_usage(&DateRange::default(), 1).unwrap();
        assert_eq!(capped.len(), 1);
        assert!(db.metrics.model_usage(&DateRange::default(), 0).is_err());
    }

    #[test]
    fn test_series_buckets() {
        let fixture = seeded();
        let db = fixture.open();

        let daily = db.metrics.responses_over_time(&DateRange::default(), Granularity::Day).unwrap();
        assert_eq!(
            daily,
            vec![
                TimeSeriesPoint { date: "2024-01-01".into(), value: 2 },
                TimeSeriesPoint { date: "2024-02-03".into(), value: 1 },
            ]
        );

        let hourly = db.metrics.tokens_over_time(&DateRange::default(), Granularity::Hour).unwrap();
        assert_eq!(hourly[0], TimeSeriesPoint { date: "2024-01-01 10:00".into(), value: 150 });
        assert_eq!(hourly[1], TimeSeriesPoint { date: "2024-01-01 11:00".into(), value: 10 });

        let monthly = db.metrics.tokens_over_time(&DateRange::default(), Granularity::Month).unwrap();
        let keys: Vec<_> = monthly.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(keys, vec!["2024-01", "2024-02"]);

        let weekly = db.metrics.responses_over_time(&DateRange::default(), Granularity::Week).unwrap();
        // 2024-01-01 is a Monday, so it opens week 01.
        assert_eq!(weekly[0].date, "2024-01");
    }

    #[test]
    fn test_latency_histogram_counts_every_duration_once() {
        let fixture = seeded();
        let db = fixture.open();
        let histogram = db.metrics.latency_histogram(&DateRange::default()).unwrap();

        assert_eq!(histogram.len(), 9);
        assert_eq!(histogram[0], LatencyBucket { range: "0-100ms", count: 1 });
        assert_eq!(histogram[1], LatencyBucket { range: "100-500ms", count: 1 });
        assert_eq!(histogram[8], LatencyBucket { range: "60s+", count: 1 });
        let total: i64 = histogram.iter().map(|b| b.count).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_latency_histogram_without_responses_has_all_buckets() {
        let fixture = Fixture::bare();
        let db = fixture.open();
        let histogram = db.metrics.latency_histogram(&DateRange::default()).unwrap();
        assert_eq!(histogram.len(), 9);
        assert!(histogram.iter().all(|b| b.count == 0));
    }

    #[test]
    fn test_round_trip_tokens_reach_summary_and_models() {
        let fixture = Fixture::new();
        fixture.response(FixtureRow {
            input_tokens: Some(100),
            output_tokens: Some(50),
            ..FixtureRow::new("only", "mistral", "2024-05-05T05:05:05")
        });
        let db = fixture.open();

        assert_eq!(db.metrics.summary(&DateRange::default()).unwrap().total_tokens, 150);
        let usage = db.metrics.model_usage(&DateRange::default(), 20).unwrap();
        assert_eq!(usage[0].model, "mistral");
        assert_eq!(usage[0].input_tokens + usage[0].output_tokens, 150);
    }
}
