//! API endpoints for conversations

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::ApiQuery;
use crate::error::DashboardResult;
use crate::log_db::{ConversationDetail, ConversationSummary, Page, Pagination};
use crate::shared_state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Conversations with response counts and token totals, most recently active first
pub async fn get_conversations(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> DashboardResult<Json<Page<ConversationSummary>>> {
    let page = Pagination::api(query.limit, query.offset)?;
    let conversations = state.with_db(move |db| db.conversations.list(&page)).await?;
    Ok(Json(conversations))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> DashboardResult<Json<ConversationDetail>> {
    info!("Fetching conversation {}", conversation_id);
    let detail = state.with_db(move |db| db.conversations.get(&conversation_id)).await?;
    Ok(Json(detail))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::test_helpers::{get_json, router_for};
    use crate::test_support::{Fixture, Row};

    #[tokio::test]
    async fn test_conversation_listing_and_detail() {
        let fixture = Fixture::new();
        fixture.conversation("c1", Some("Planning"), Some("gpt-4o"));
        fixture.response(Row {
            conversation_id: Some("c1"),
            output_tokens: Some(7),
            ..Row::new("r2", "gpt-4o", "2024-01-02T00:00:00")
        });
        fixture.response(Row {
            conversation_id: Some("c1"),
            output_tokens: Some(3),
            ..Row::new("r1", "gpt-4o", "2024-01-01T00:00:00")
        });
        let router = router_for(&fixture);

        let (status, body) = get_json(&router, "/api/conversations").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["items"][0]["response_count"], 2);
        assert_eq!(body["items"][0]["total_output_tokens"], 10);

        let (status, body) = get_json(&router, "/api/conversations/c1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Planning");
        assert_eq!(body["responses"][0]["id"], "r1");
        assert_eq!(body["responses"][1]["id"], "r2");
    }

    #[tokio::test]
    async fn test_missing_conversation_is_404() {
        let fixture = Fixture::new();
        let router = router_for(&fixture);
        let (status, body) = get_json(&router, "/api/conversations/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Conversation not found");
    }
}
