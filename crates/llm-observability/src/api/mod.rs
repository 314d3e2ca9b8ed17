//! API module - JSON endpoints over the log database

pub mod admin_api;
pub mod conversation_api;
pub mod metrics_api;
pub mod responses_api;
pub mod search_api;
pub mod tools_api;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::DashboardError;

pub use admin_api::health;
pub use conversation_api::{get_conversation, get_conversations};
pub use metrics_api::{latency, model_usage, responses_over_time, summary, tokens_over_time};
pub use responses_api::{get_response, get_response_attachments, get_responses};
pub use search_api::search;
pub use tools_api::{get_tool_calls, get_tool_results, get_tools};

/// Query-string extractor whose rejections are `InvalidParameter` errors,
/// so malformed numbers come back as the usual JSON 400 body.
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = DashboardError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::try_from_uri(&parts.uri)
            .map_err(|rejection| DashboardError::InvalidParameter(rejection.body_text()))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::{Config, DEFAULT_HOST, DEFAULT_PORT};
    use crate::server::build_router;
    use crate::shared_state::AppState;
    use crate::test_support::Fixture;

    pub fn router_for(fixture: &Fixture) -> Router {
        let config = Config {
            db_path: fixture.path.clone(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            debug: false,
        };
        build_router(AppState::new(fixture.open(), config))
    }

    pub async fn get(router: &Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    pub async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
        let (status, body) = get(router, uri).await;
        (status, serde_json::from_str(&body).unwrap_or(Value::Null))
    }
}
