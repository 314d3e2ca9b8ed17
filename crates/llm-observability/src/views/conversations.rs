//! Conversation list and conversation transcript pages.

use std::fmt::Write;

use axum::extract::{Path, State};
use serde::Deserialize;

use super::layout::{self, duration, esc, esc_opt, tokens, Nav};
use super::{ViewQuery, ViewResult};
use crate::log_db::{ConversationDetail, ConversationSummary, Page, Pagination};
use crate::shared_state::AppState;
use crate::utils::TextUtils;

#[derive(Debug, Default, Deserialize)]
pub struct ConversationListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn conversation_list(
    State(state): State<AppState>,
    ViewQuery(query): ViewQuery<ConversationListQuery>,
) -> ViewResult {
    let page = Pagination::from_page(query.page, query.limit)?;
    let conversations = state.with_db(move |db| db.conversations.list(&page)).await?;
    Ok(layout::page("Conversations", Nav::Conversations, &render_list(&conversations, &page)))
}

fn render_list(conversations: &Page<ConversationSummary>, page: &Pagination) -> String {
    let mut html = String::from("<h1>Conversations</h1>");
    if conversations.items.is_empty() {
        html.push_str("<p class=\"muted\">No conversations found.</p>");
        return html;
    }

    html.push_str(
        "<table><tr><th>Name</th><th>Model</th><th>Responses</th><th>First</th><th>Last</th><th>Tokens in / out</th></tr>",
    );
    for conversation in &conversations.items {
        let _ = write!(
            html,
            "<tr><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{} / {}</td></tr>",
            layout::record_href("/conversations", &conversation.id),
            esc(conversation.name.as_deref().unwrap_or(&conversation.id)),
            esc_opt(conversation.model.as_deref()),
            TextUtils::format_count(conversation.response_count),
            esc_opt(conversation.first_response.as_deref()),
            esc_opt(conversation.last_response.as_deref()),
            TextUtils::format_count(conversation.total_input_tokens),
            TextUtils::format_count(conversation.total_output_tokens),
        );
    }
    html.push_str("</table>");
    html.push_str(&layout::pagination("/conversations", &[], page, conversations.total));
    html
}

pub async fn conversation_detail(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> ViewResult {
    let detail = state.with_db(move |db| db.conversations.get(&conversation_id)).await?;
    let title = detail.conversation.name.clone().unwrap_or_else(|| detail.conversation.id.clone());
    Ok(layout::page(&title, Nav::Conversations, &render_detail(&detail)))
}

fn render_detail(detail: &ConversationDetail) -> String {
    let conversation = &detail.conversation;
    let mut html = String::new();
    let _ = write!(
        html,
        "<h1>{}</h1><p class=\"muted\">{}</p>",
        esc(conversation.name.as_deref().unwrap_or("Untitled conversation")),
        esc(&conversation.id)
    );

    html.push_str("<div class=\"cards\">");
    let cards = [
        ("Responses", TextUtils::format_count(detail.responses.len() as i64)),
        ("Input tokens", TextUtils::format_count(detail.total_input_tokens())),
        ("Output tokens", TextUtils::format_count(detail.total_output_tokens())),
        ("Total duration", duration(Some(detail.total_duration_ms()))),
    ];
    for (label, value) in cards {
        let _ = write!(
            html,
            "<div class=\"card\"><div class=\"label\">{}</div><div class=\"value\">{}</div></div>",
            label, value
        );
    }
    html.push_str("</div>");

    if detail.responses.is_empty() {
        html.push_str("<p class=\"muted\">This conversation has no responses.</p>");
        return html;
    }
    for response in &detail.responses {
        let _ = write!(
            html,
            "<section><h3><a href=\"{}\">{}</a> <span class=\"muted\">{} &middot; {} &middot; {} in / {} out</span></h3>",
            layout::record_href("/responses", &response.id),
            esc_opt(response.datetime_utc.as_deref()),
            esc(&response.model),
            duration(response.duration_ms),
            tokens(response.input_tokens),
            tokens(response.output_tokens),
        );
        let _ = write!(
            html,
            "<pre>{}</pre><pre>{}</pre></section>",
            esc_opt(response.prompt.as_deref()),
            esc_opt(response.response.as_deref())
        );
    }
    html
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::test_helpers::{get, router_for};
    use crate::test_support::{Fixture, Row};

    fn seeded() -> Fixture {
        let fixture = Fixture::new();
        fixture.conversation("c1", Some("Refactor"), Some("gpt-4o"));
        fixture.conversation("c2", None, None);
        fixture.response(Row {
            conversation_id: Some("c1"),
            input_tokens: Some(1_000),
            output_tokens: Some(2_000),
            duration_ms: Some(400),
            prompt: Some("first question"),
            ..Row::new("r1", "gpt-4o", "2024-01-01T00:00:00")
        });
        fixture.response(Row {
            conversation_id: Some("c1"),
            input_tokens: Some(500),
            duration_ms: Some(800),
            prompt: Some("second question"),
            ..Row::new("r2", "gpt-4o", "2024-01-01T00:05:00")
        });
        fixture
    }

    #[tokio::test]
    async fn test_list_shows_counts() {
        let fixture = seeded();
        let router = router_for(&fixture);

        let (status, body) = get(&router, "/conversations").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("href=\"/conversations/c1\">Refactor</a>"));
        assert!(body.contains("href=\"/conversations/c2\">c2</a>"));
        assert!(body.contains("1,500 / 2,000"));
    }

    #[tokio::test]
    async fn test_detail_totals_and_order() {
        let fixture = seeded();
        let router = router_for(&fixture);

        let (status, body) = get(&router, "/conversations/c1").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("1.20s"));
        assert!(body.contains("1,500"));
        let first = body.find("first question").unwrap();
        let second = body.find("second question").unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_missing_conversation_is_html_404() {
        let fixture = seeded();
        let router = router_for(&fixture);

        let (status, body) = get(&router, "/conversations/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Conversation not found"));
    }
}
