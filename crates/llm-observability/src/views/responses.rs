//! Response browser and single-response page.

use std::fmt::Write;

use axum::extract::{Path, State};
use serde::Deserialize;

use super::layout::{self, duration, esc, esc_opt, tokens, Nav};
use super::{ViewQuery, ViewResult};
use crate::log_db::{
    AttachmentInfo, Conversation, Page, Pagination, ResponseDetail, ResponseFilter, ResponseSummary,
};
use crate::shared_state::AppState;
use crate::utils::TextUtils;

const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ResponseListQuery {
    pub model: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn response_list(
    State(state): State<AppState>,
    ViewQuery(query): ViewQuery<ResponseListQuery>,
) -> ViewResult {
    let page = Pagination::from_page(query.page, query.limit)?;
    let model = query.model.filter(|m| !m.is_empty());
    let filter = ResponseFilter { model: model.clone(), ..Default::default() };

    let (responses, models) = state.with_db(move |db| {
        Ok((db.responses.list(&filter, &page)?, db.responses.distinct_models()?))
    })
    .await?;

    let body = render_list(&responses, &models, model.as_deref(), &page);
    Ok(layout::page("Responses", Nav::Responses, &body))
}

fn render_list(
    responses: &Page<ResponseSummary>,
    models: &[String],
    selected: Option<&str>,
    page: &Pagination,
) -> String {
    let mut html = String::from("<h1>Responses</h1>");
    html.push_str("<form class=\"inline\" method=\"get\" action=\"/responses\"><select name=\"model\">");
    html.push_str("<option value=\"\">All models</option>");
    for model in models {
        let marker = if Some(model.as_str()) == selected { " selected" } else { "" };
        let _ = write!(html, "<option value=\"{0}\"{1}>{0}</option>", esc(model), marker);
    }
    html.push_str("</select><button type=\"submit\">Filter</button></form>");

    if responses.items.is_empty() {
        html.push_str("<p class=\"muted\">No responses found.</p>");
        return html;
    }

    html.push_str(
        "<table><tr><th>Time</th><th>Model</th><th>Prompt</th><th>Input</th><th>Output</th><th>Duration</th></tr>",
    );
    for response in &responses.items {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td><td>{}</td></tr>",
            esc_opt(response.datetime_utc.as_deref()),
            esc(&response.model),
            layout::record_href("/responses", &response.id),
            esc(&TextUtils::preview(response.prompt.as_deref(), PREVIEW_CHARS)),
            tokens(response.input_tokens),
            tokens(response.output_tokens),
            duration(response.duration_ms),
        );
    }
    html.push_str("</table>");
    html.push_str(&layout::pagination(
        "/responses",
        &[("model", selected.unwrap_or_default())],
        page,
        responses.total,
    ));
    html
}

struct ResponsePage {
    detail: ResponseDetail,
    attachments: Vec<AttachmentInfo>,
    conversation: Option<Conversation>,
}

pub async fn response_detail(State(state): State<AppState>, Path(response_id): Path<String>) -> ViewResult {
    let data = state.with_db(move |db| {
        let detail = db.responses.get(&response_id)?;
        let attachments = db.responses.attachments(&response_id)?;
        let conversation = db.responses.conversation_of(&detail.summary)?;
        Ok(ResponsePage { detail, attachments, conversation })
    })
    .await?;

    let title = format!("Response {}", data.detail.summary.id);
    Ok(layout::page(&title, Nav::Responses, &render_detail(&data)))
}

fn render_detail(data: &ResponsePage) -> String {
    let response = &data.detail.summary;
    let mut html = String::new();
    let _ = write!(html, "<h1>Response <code>{}</code></h1>", esc(&response.id));

    html.push_str("<table>");
    let _ = write!(html, "<tr><th>Model</th><td>{}</td></tr>", esc(&response.model));
    let _ = write!(html, "<tr><th>Time</th><td>{}</td></tr>", esc_opt(response.datetime_utc.as_deref()));
    let _ = write!(html, "<tr><th>Duration</th><td>{}</td></tr>", duration(response.duration_ms));
    let _ = write!(
        html,
        "<tr><th>Tokens</th><td>{} in / {} out</td></tr>",
        tokens(response.input_tokens),
        tokens(response.output_tokens)
    );
    match &data.conversation {
        Some(conversation) => {
            let _ = write!(
                html,
                "<tr><th>Conversation</th><td><a href=\"{}\">{}</a></td></tr>",
                layout::record_href("/conversations", &conversation.id),
                esc(conversation.name.as_deref().unwrap_or(&conversation.id))
            );
        }
        None => {
            if let Some(conversation_id) = &response.conversation_id {
                let _ = write!(html, "<tr><th>Conversation</th><td>{}</td></tr>", esc(conversation_id));
            }
        }
    }
    html.push_str("</table>");

    if let Some(system) = data.detail.system.as_deref().filter(|s| !s.is_empty()) {
        let _ = write!(html, "<h2>System</h2><pre>{}</pre>", esc(system));
    }
    let _ = write!(html, "<h2>Prompt</h2><pre>{}</pre>", esc_opt(response.prompt.as_deref()));
    let _ = write!(html, "<h2>Response</h2><pre>{}</pre>", esc_opt(response.response.as_deref()));

    if !data.detail.tool_calls.is_empty() {
        html.push_str("<h2>Tool calls</h2><table><tr><th>Tool</th><th>Call id</th><th>Arguments</th></tr>");
        for call in &data.detail.tool_calls {
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{}</td><td><pre>{}</pre></td></tr>",
                esc(&call.name),
                esc_opt(call.tool_call_id.as_deref()),
                esc_opt(call.arguments.as_deref())
            );
        }
        html.push_str("</table>");
    }

    if !data.detail.tool_results.is_empty() {
        html.push_str("<h2>Tool results</h2><table><tr><th>Tool</th><th>Call id</th><th>Output</th></tr>");
        for result in &data.detail.tool_results {
            let (class, body) = match &result.exception {
                Some(exception) => (" class=\"tool-error\"", esc(exception)),
                None => ("", esc_opt(result.output.as_deref())),
            };
            let _ = write!(
                html,
                "<tr{}><td>{}</td><td>{}</td><td><pre>{}</pre></td></tr>",
                class,
                esc(&result.name),
                esc_opt(result.tool_call_id.as_deref()),
                body
            );
        }
        html.push_str("</table>");
    }

    if !data.attachments.is_empty() {
        html.push_str("<h2>Attachments</h2><table><tr><th>#</th><th>Type</th><th>Source</th></tr>");
        for attachment in &data.attachments {
            let source = attachment.path.as_deref().or(attachment.url.as_deref());
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                attachment.order,
                esc_opt(attachment.mime_type.as_deref()),
                esc_opt(source)
            );
        }
        html.push_str("</table>");
    }
    html
}
