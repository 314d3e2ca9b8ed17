//! Search API endpoint - phrase search when the FTS index exists, substring
//! match otherwise. Callers see which strategy answered in `strategy`.

use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::info;

use super::ApiQuery;
use crate::error::{DashboardError, DashboardResult};
use crate::log_db::{Pagination, SearchPage};
use crate::shared_state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn search(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> DashboardResult<Json<SearchPage>> {
    if query.q.is_empty() {
        return Err(DashboardError::InvalidParameter("q must not be empty".into()));
    }
    let page = Pagination::api(query.limit, query.offset)?;
    info!("Search request: q={:?}, limit={}, offset={}", query.q, page.limit, page.offset);

    let q = query.q;
    let results = state.with_db(move |db| db.search.search(&q, &page)).await?;
    Ok(Json(results))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::test_helpers::{get_json, router_for};
    use crate::test_support::{Fixture, Row};

    fn seeded() -> Fixture {
        let fixture = Fixture::new();
        fixture.response(Row {
            prompt: Some("Explain borrow checking"),
            response: Some("The borrow checker enforces aliasing rules."),
            ..Row::new("r1", "gpt-4o", "2024-01-01T00:00:00")
        });
        fixture
    }

    #[tokio::test]
    async fn test_search_like_envelope() {
        let fixture = seeded();
        let router = router_for(&fixture);

        let (status, body) = get_json(&router, "/api/search?q=borrow%20checker").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query"], "borrow checker");
        assert_eq!(body["strategy"], "like");
        assert_eq!(body["total"], 1);
        assert_eq!(body["limit"], 50);
        assert_eq!(body["offset"], 0);
        assert_eq!(body["items"][0]["response_snippet"], "The borrow checker enforces aliasing rules.");
    }

    #[tokio::test]
    async fn test_search_uses_index_when_present() {
        let fixture = seeded();
        fixture.enable_fts();
        let router = router_for(&fixture);

        let (status, body) = get_json(&router, "/api/search?q=aliasing").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["strategy"], "fts");
        assert_eq!(body["total"], 1);
    }

    #[tokio::test]
    async fn test_search_requires_query() {
        let fixture = seeded();
        let router = router_for(&fixture);

        let (status, _) = get_json(&router, "/api/search").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = get_json(&router, "/api/search?q=").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
