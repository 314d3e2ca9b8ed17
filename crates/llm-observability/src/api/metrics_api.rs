//! API endpoints for aggregate usage and latency metrics

use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::info;

use super::ApiQuery;
use crate::error::DashboardResult;
use crate::log_db::metrics_store::DEFAULT_MODEL_LIMIT;
use crate::log_db::{DateRange, Granularity, LatencyBucket, MetricsSummary, ModelUsage, TimeSeriesPoint};
use crate::shared_state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl DateRangeQuery {
    fn dates(self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ModelUsageQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SeriesQuery {
    pub granularity: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl SeriesQuery {
    fn parse(self) -> DashboardResult<(DateRange, Granularity)> {
        let granularity = match self.granularity.as_deref() {
            None | Some("") => Granularity::default(),
            Some(raw) => raw.parse()?,
        };
        Ok((DateRange::new(self.start_date, self.end_date), granularity))
    }
}

pub async fn summary(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DateRangeQuery>,
) -> DashboardResult<Json<MetricsSummary>> {
    let dates = query.dates();
    info!("Metrics summary for {:?}", dates);
    let summary = state.with_db(move |db| db.metrics.summary(&dates)).await?;
    Ok(Json(summary))
}

pub async fn model_usage(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ModelUsageQuery>,
) -> DashboardResult<Json<Vec<ModelUsage>>> {
    let dates = DateRange::new(query.start_date, query.end_date);
    let limit = query.limit.unwrap_or(DEFAULT_MODEL_LIMIT);
    let usage = state.with_db(move |db| db.metrics.model_usage(&dates, limit)).await?;
    Ok(Json(usage))
}

pub async fn tokens_over_time(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SeriesQuery>,
) -> DashboardResult<Json<Vec<TimeSeriesPoint>>> {
    let (dates, granularity) = query.parse()?;
    info!("Token series by {:?}", granularity);
    let series = state.with_db(move |db| db.metrics.tokens_over_time(&dates, granularity)).await?;
    Ok(Json(series))
}

pub async fn responses_over_time(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SeriesQuery>,
) -> DashboardResult<Json<Vec<TimeSeriesPoint>>> {
    let (dates, granularity) = query.parse()?;
    let series = state.with_db(move |db| db.metrics.responses_over_time(&dates, granularity)).await?;
    Ok(Json(series))
}

pub async fn latency(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DateRangeQuery>,
) -> DashboardResult<Json<Vec<LatencyBucket>>> {
    let dates = query.dates();
    let histogram = state.with_db(move |db| db.metrics.latency_histogram(&dates)).await?;
    Ok(Json(histogram))
}
