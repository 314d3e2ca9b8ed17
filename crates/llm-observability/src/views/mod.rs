//! Server-rendered HTML pages over the same stores the JSON API uses.

pub mod conversations;
pub mod dashboard;
pub mod layout;
pub mod responses;
pub mod search;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{request::Parts, StatusCode},
    response::{Html, IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use tracing::error;

use crate::error::DashboardError;
use layout::{esc, Nav};

pub use conversations::{conversation_detail, conversation_list};
pub use dashboard::dashboard;
pub use responses::{response_detail, response_list};
pub use search::search_page;

pub type ViewResult = Result<Html<String>, ViewError>;

/// A request failure rendered as an HTML page instead of a JSON body.
#[derive(Debug)]
pub struct ViewError(pub DashboardError);

impl From<DashboardError> for ViewError {
    fn from(err: DashboardError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ViewError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        let (title, message) = match status {
            StatusCode::NOT_FOUND => ("Not found", self.0.to_string()),
            StatusCode::BAD_REQUEST => ("Bad request", self.0.to_string()),
            _ => {
                error!("Page render failed: {}", self.0);
                ("Error", "The log database could not be read.".to_string())
            }
        };
        let body = format!(
            r#"<section class="error"><h1>{}</h1><p>{}</p><p><a href="/">Back to dashboard</a></p></section>"#,
            esc(title),
            esc(&message)
        );
        (status, layout::page(title, Nav::None, &body)).into_response()
    }
}

/// Query-string extractor for pages; bad input renders the HTML 400 page.
pub struct ViewQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ViewQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ViewError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::try_from_uri(&parts.uri)
            .map_err(|rejection| DashboardError::InvalidParameter(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Router fallback: any unknown path gets the HTML 404 page.
pub async fn not_found() -> ViewError {
    ViewError(DashboardError::NotFound("Page".into()))
}
