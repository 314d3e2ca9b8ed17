//! API endpoints for individual model responses

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use tracing::{debug, info};

use super::ApiQuery;
use crate::error::DashboardResult;
use crate::log_db::{
    AttachmentInfo, DateRange, Listing, Page, Pagination, ResponseDetail, ResponseFilter, ResponseSummary,
};
use crate::shared_state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ResponsesQuery {
    pub model: Option<String>,
    pub conversation_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Paginated responses, newest first
pub async fn get_responses(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ResponsesQuery>,
) -> DashboardResult<Json<Page<ResponseSummary>>> {
    let page = Pagination::api(query.limit, query.offset)?;
    let filter = ResponseFilter {
        model: query.model,
        conversation_id: query.conversation_id,
        dates: DateRange::new(query.start_date, query.end_date),
    };
    debug!("Listing responses: {:?} {:?}", filter, page);
    let responses = state.with_db(move |db| db.responses.list(&filter, &page)).await?;
    Ok(Json(responses))
}

pub async fn get_response(
    State(state): State<AppState>,
    Path(response_id): Path<String>,
) -> DashboardResult<Json<ResponseDetail>> {
    info!("Fetching response {}", response_id);
    let detail = state.with_db(move |db| db.responses.get(&response_id)).await?;
    Ok(Json(detail))
}

pub async fn get_response_attachments(
    State(state): State<AppState>,
    Path(response_id): Path<String>,
) -> DashboardResult<Json<Listing<AttachmentInfo>>> {
    let attachments = state.with_db(move |db| db.responses.attachments(&response_id)).await?;
    Ok(Json(attachments.into()))
}
