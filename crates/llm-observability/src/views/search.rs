//! Search page over prompts and responses.

use std::fmt::Write;

use axum::extract::State;
use serde::Deserialize;

use super::layout::{self, esc, esc_opt, Nav};
use super::{ViewQuery, ViewResult};
use crate::log_db::{Pagination, SearchPage, SearchStrategy};
use crate::shared_state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchPageQuery {
    pub q: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn search_page(
    State(state): State<AppState>,
    ViewQuery(query): ViewQuery<SearchPageQuery>,
) -> ViewResult {
    let page = Pagination::from_page(query.page, query.limit)?;
    let q = query.q.unwrap_or_default();

    let results = if q.is_empty() {
        None
    } else {
        let q = q.clone();
        Some(state.with_db(move |db| db.search.search(&q, &page)).await?)
    };

    Ok(layout::page("Search", Nav::Search, &render(&q, results.as_ref(), &page)))
}

fn render(q: &str, results: Option<&SearchPage>, page: &Pagination) -> String {
    let mut html = String::from("<h1>Search</h1>");
    let _ = write!(
        html,
        "<form class=\"inline\" method=\"get\" action=\"/search\">\
         <input type=\"search\" name=\"q\" value=\"{}\" placeholder=\"Search prompts and responses\" autofocus>\
         <button type=\"submit\">Search</button></form>",
        esc(q)
    );

    let Some(results) = results else {
        return html;
    };

    let strategy = match results.strategy {
        SearchStrategy::Fts => "full-text index",
        SearchStrategy::Like => "substring match",
    };
    let _ = write!(
        html,
        "<p class=\"muted\">{} result{} for &quot;{}&quot; ({})</p>",
        results.total,
        if results.total == 1 { "" } else { "s" },
        esc(q),
        strategy
    );

    for hit in &results.items {
        let _ = write!(
            html,
            "<section><h3><a href=\"{}\">{}</a> <span class=\"muted\">{}</span></h3>",
            layout::record_href("/responses", &hit.id),
            esc_opt(hit.datetime_utc.as_deref()),
            esc(&hit.model)
        );
        if let Some(snippet) = &hit.prompt_snippet {
            let _ = write!(html, "<p><strong>Prompt:</strong> {}</p>", esc(snippet));
        }
        if let Some(snippet) = &hit.response_snippet {
            let _ = write!(html, "<p><strong>Response:</strong> {}</p>", esc(snippet));
        }
        html.push_str("</section>");
    }
    html.push_str(&layout::pagination("/search", &[("q", q)], page, results.total));
    html
}
