//! Page shell, navigation and pagination controls shared by every view.

use std::borrow::Cow;
use std::fmt::Write;

use axum::response::Html;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::log_db::Pagination;
use crate::utils::TextUtils;

/// Characters that cannot appear raw inside one path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const STYLE: &str = r#"
:root { --bg:#0f1115; --panel:#171a21; --border:#262b36; --text:#e6e8ee; --muted:#8a93a6; --accent:#6aa9ff; --danger:#ff6b6b; }
* { box-sizing: border-box; }
body { margin:0; font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", sans-serif; background:var(--bg); color:var(--text); font-size:14px; }
a { color:var(--accent); text-decoration:none; }
a:hover { text-decoration:underline; }
header { display:flex; gap:24px; align-items:center; padding:12px 24px; border-bottom:1px solid var(--border); background:var(--panel); }
header .brand { font-weight:600; }
header nav a { color:var(--muted); margin-right:16px; }
header nav a.active { color:var(--text); }
main { padding:24px; max-width:1200px; margin:0 auto; }
.cards { display:grid; grid-template-columns:repeat(auto-fill, minmax(180px, 1fr)); gap:12px; margin-bottom:24px; }
.card { background:var(--panel); border:1px solid var(--border); border-radius:6px; padding:12px 16px; }
.card .label { color:var(--muted); font-size:12px; text-transform:uppercase; }
.card .value { font-size:22px; margin-top:4px; }
table { width:100%; border-collapse:collapse; margin-bottom:24px; }
th, td { text-align:left; padding:8px; border-bottom:1px solid var(--border); vertical-align:top; }
th { color:var(--muted); font-weight:500; }
pre { white-space:pre-wrap; word-break:break-word; background:var(--panel); border:1px solid var(--border); border-radius:6px; padding:12px; }
.muted { color:var(--muted); }
.error, .tool-error { color:var(--danger); }
.pagination { display:flex; gap:16px; align-items:center; }
form.inline { display:flex; gap:8px; margin-bottom:16px; }
input, select, button { background:var(--panel); color:var(--text); border:1px solid var(--border); border-radius:4px; padding:6px 8px; }
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    Dashboard,
    Responses,
    Conversations,
    Search,
    None,
}

const NAV_LINKS: [(Nav, &str, &str); 4] = [
    (Nav::Dashboard, "/", "Dashboard"),
    (Nav::Responses, "/responses", "Responses"),
    (Nav::Conversations, "/conversations", "Conversations"),
    (Nav::Search, "/search", "Search"),
];

pub fn esc(text: &str) -> Cow<'_, str> {
    TextUtils::escape_html(text)
}

/// Escaped text, or a dash for missing values.
pub fn esc_opt(text: Option<&str>) -> Cow<'_, str> {
    match text {
        Some(t) if !t.is_empty() => esc(t),
        _ => Cow::Borrowed("-"),
    }
}

pub fn tokens(value: Option<i64>) -> String {
    value.map(TextUtils::format_count).unwrap_or_else(|| "-".into())
}

pub fn duration(duration_ms: Option<i64>) -> String {
    TextUtils::format_duration(duration_ms.map(|ms| ms as f64))
}

/// Full HTML document around an already-escaped body.
pub fn page(title: &str, active: Nav, body: &str) -> Html<String> {
    let mut html = String::with_capacity(body.len() + STYLE.len() + 1024);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">");
    let _ = write!(html, "<title>{} - LLM Observability</title>", esc(title));
    let _ = write!(html, "<style>{}</style></head><body>", STYLE);
    html.push_str("<header><span class=\"brand\">LLM Observability</span><nav>");
    for (nav, href, label) in NAV_LINKS {
        let class = if nav == active { " class=\"active\"" } else { "" };
        let _ = write!(html, "<a href=\"{}\"{}>{}</a>", href, class, label);
    }
    html.push_str("</nav></header><main>");
    html.push_str(body);
    html.push_str("</main></body></html>");
    Html(html)
}

/// `path?query`, form-encoded and escaped for an attribute value. Empty
/// values are left out.
pub fn href(path: &str, params: &[(&str, &str)]) -> String {
    let params: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    if params.is_empty() {
        return esc(path).into_owned();
    }
    let query = serde_urlencoded::to_string(&params).unwrap_or_default();
    format!("{}?{}", esc(path), esc(&query))
}

/// Link to a record page, e.g. `/responses/<id>`, with the id encoded as one segment.
pub fn record_href(base: &str, id: &str) -> String {
    let segment = utf8_percent_encode(id, PATH_SEGMENT).to_string();
    format!("{}/{}", esc(base), esc(&segment))
}

/// Previous/next links preserving the page's filters; empty for a single page.
pub fn pagination(path: &str, filters: &[(&str, &str)], page: &Pagination, total: i64) -> String {
    let total_pages = page.total_pages(total);
    if total_pages <= 1 {
        return String::new();
    }
    let current = page.page_number();
    let limit = page.limit.to_string();
    let link = |target: i64| {
        let target = target.to_string();
        let mut params = filters.to_vec();
        params.push(("page", &target));
        params.push(("limit", &limit));
        href(path, &params)
    };

    let mut html = String::from("<div class=\"pagination\">");
    if current > 1 {
        let _ = write!(html, "<a href=\"{}\">&larr; Previous</a>", link(current - 1));
    }
    let _ = write!(
        html,
        "<span class=\"muted\">Page {} of {} ({} total)</span>",
        current,
        total_pages,
        TextUtils::format_count(total)
    );
    if current < total_pages {
        let _ = write!(html, "<a href=\"{}\">Next &rarr;</a>", link(current + 1));
    }
    html.push_str("</div>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_marks_active_nav_and_escapes_title() {
        let Html(html) = page("<b>", Nav::Search, "<p>body</p>");
        assert!(html.contains("<title>&lt;b&gt; - LLM Observability</title>"));
        assert!(html.contains("<a href=\"/search\" class=\"active\">Search</a>"));
        assert!(html.contains("<p>body</p>"));
    }

    #[test]
    fn test_single_page_has_no_controls() {
        let page = Pagination { limit: 50, offset: 0 };
        assert_eq!(pagination("/responses", &[], &page, 50), "");
    }

    #[test]
    fn test_pagination_links_keep_filters() {
        let page = Pagination { limit: 10, offset: 10 };
        let html = pagination("/responses", &[("model", "gpt 4&o")], &page, 25);
        assert!(html.contains("Page 2 of 3 (25 total)"));
        assert!(html.contains("href=\"/responses?model=gpt+4%26o&amp;page=1&amp;limit=10\""));
        assert!(html.contains("href=\"/responses?model=gpt+4%26o&amp;page=3&amp;limit=10\""));
    }

    #[test]
    fn test_href_skips_empty_params() {
        assert_eq!(href("/search", &[("q", "")]), "/search");
        assert_eq!(href("/search", &[("q", "a b"), ("page", "2")]), "/search?q=a+b&amp;page=2");
    }

    #[test]
    fn test_record_href_keeps_id_in_one_segment() {
        assert_eq!(record_href("/responses", "01hx"), "/responses/01hx");
        assert_eq!(record_href("/responses", "a/b?c#d"), "/responses/a%2Fb%3Fc%23d");
        assert_eq!(record_href("/conversations", "x y&z"), "/conversations/x%20y&amp;z");
    }

    #[test]
    fn test_missing_values_render_as_dash() {
        assert_eq!(esc_opt(None), "-");
        assert_eq!(esc_opt(Some("")), "-");
        assert_eq!(tokens(Some(1200)), "1,200");
        assert_eq!(duration(None), "-");
    }
}
