//! API endpoints for tool definitions and their invocations

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::conversation_api::PageQuery;
use super::ApiQuery;
use crate::error::DashboardResult;
use crate::log_db::{Page, Pagination, ToolCallDetail, ToolDefinition, ToolResultDetail};
use crate::shared_state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ToolResultsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub errors_only: bool,
}

/// Tools ordered by how often they were called
pub async fn get_tools(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> DashboardResult<Json<Page<ToolDefinition>>> {
    let page = Pagination::api(query.limit, query.offset)?;
    let tools = state.with_db(move |db| db.tools.list(&page)).await?;
    Ok(Json(tools))
}

pub async fn get_tool_calls(
    State(state): State<AppState>,
    Path(tool_id): Path<i64>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> DashboardResult<Json<Page<ToolCallDetail>>> {
    let page = Pagination::api(query.limit, query.offset)?;
    info!("Listing calls for tool {}", tool_id);
    let calls = state.with_db(move |db| db.tools.calls(tool_id, &page)).await?;
    Ok(Json(calls))
}

pub async fn get_tool_results(
    State(state): State<AppState>,
    Path(tool_id): Path<i64>,
    ApiQuery(query): ApiQuery<ToolResultsQuery>,
) -> DashboardResult<Json<Page<ToolResultDetail>>> {
    let page = Pagination::api(query.limit, query.offset)?;
    let errors_only = query.errors_only;
    info!("Listing results for tool {} (errors_only={})", tool_id, errors_only);
    let results = state.with_db(move |db| db.tools.results(tool_id, errors_only, &page)).await?;
    Ok(Json(results))
}
