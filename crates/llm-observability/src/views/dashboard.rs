//! Landing page: headline numbers, the latest responses and the busiest models.

use std::fmt::Write;

use axum::extract::State;

use super::layout::{self, duration, esc, esc_opt, tokens, Nav};
use super::ViewResult;
use crate::log_db::{DateRange, MetricsSummary, ModelUsage, ResponseSummary};
use crate::shared_state::AppState;
use crate::utils::TextUtils;

const RECENT_RESPONSES: i64 = 10;
const TOP_MODELS: i64 = 10;
const PREVIEW_CHARS: usize = 80;

struct DashboardData {
    summary: MetricsSummary,
    recent: Vec<ResponseSummary>,
    models: Vec<ModelUsage>,
}

pub async fn dashboard(State(state): State<AppState>) -> ViewResult {
    let data = state.with_db(|db| {
        let everything = DateRange::default();
        Ok(DashboardData {
            summary: db.metrics.summary(&everything)?,
            recent: db.responses.recent(RECENT_RESPONSES)?,
            models: db.metrics.model_usage(&everything, TOP_MODELS)?,
        })
    })
    .await?;

    Ok(layout::page("Dashboard", Nav::Dashboard, &render(&data)))
}

fn render(data: &DashboardData) -> String {
    let summary = &data.summary;
    let mut html = String::from("<h1>Dashboard</h1><div class=\"cards\">");
    let cards = [
        ("Responses", TextUtils::format_count(summary.total_responses)),
        ("Conversations", TextUtils::format_count(summary.total_conversations)),
        ("Total tokens", TextUtils::format_count(summary.total_tokens)),
        ("Avg duration", TextUtils::format_duration(summary.avg_duration_ms)),
        ("Models", TextUtils::format_count(summary.unique_models)),
        ("Tool calls", TextUtils::format_count(summary.total_tool_calls)),
        ("Tool errors", TextUtils::format_count(summary.total_tool_errors)),
    ];
    for (label, value) in cards {
        let _ = write!(
            html,
            "<div class=\"card\"><div class=\"label\">{}</div><div class=\"value\">{}</div></div>",
            label, value
        );
    }
    html.push_str("</div>");

    html.push_str("<h2>Recent responses</h2>");
    if data.recent.is_empty() {
        html.push_str("<p class=\"muted\">No responses logged yet.</p>");
    } else {
        html.push_str("<table><tr><th>Time</th><th>Model</th><th>Prompt</th><th>Tokens</th><th>Duration</th></tr>");
        for response in &data.recent {
            let total_tokens = match (response.input_tokens, response.output_tokens) {
                (None, None) => None,
                (input, output) => Some(input.unwrap_or(0) + output.unwrap_or(0)),
            };
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{}</td><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td></tr>",
                esc_opt(response.datetime_utc.as_deref()),
                esc(&response.model),
                layout::record_href("/responses", &response.id),
                esc(&TextUtils::preview(response.prompt.as_deref(), PREVIEW_CHARS)),
                tokens(total_tokens),
                duration(response.duration_ms),
            );
        }
        html.push_str("</table>");
    }

    html.push_str("<h2>Models</h2>");
    if data.models.is_empty() {
        html.push_str("<p class=\"muted\">No model usage recorded.</p>");
    } else {
        html.push_str("<table><tr><th>Model</th><th>Responses</th><th>Input tokens</th><th>Output tokens</th><th>Avg duration</th></tr>");
        for model in &data.models {
            let _ = write!(
                html,
                "<tr><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                layout::href("/responses", &[("model", &model.model)]),
                esc(&model.model),
                TextUtils::format_count(model.response_count),
                TextUtils::format_count(model.input_tokens),
                TextUtils::format_count(model.output_tokens),
                TextUtils::format_duration(model.avg_duration_ms),
            );
        }
        html.push_str("</table>");
    }
    html
}
