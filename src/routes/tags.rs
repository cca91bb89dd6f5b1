//! Tag listing and search
//!
//! - GET /tags       - every tag, sorted by name
//! - GET /search?q=  - full-text search over published content

use bytes::Bytes;
use hyper::{Request, StatusCode};

use super::content::{list_published, ListQuery};
use super::response::{json_response, parse_query, HttpResponse};
use super::views::TagView;
use crate::server::AppState;
use crate::types::{LecternError, Result};

/// GET /tags
pub async fn handle_list_tags(state: &AppState) -> Result<HttpResponse> {
    let tags = state.store.list_tags().await?;
    let views: Vec<TagView> = tags.iter().map(TagView::from).collect();
    Ok(json_response(StatusCode::OK, &views))
}

/// GET /search
pub async fn handle_search(req: Request<Bytes>, state: &AppState) -> Result<HttpResponse> {
    let query: ListQuery = parse_query(&req)?;

    if query.q.as_deref().map(str::trim).unwrap_or_default().is_empty() {
        return Err(LecternError::BadRequest(
            "Query parameter 'q' is required".into(),
        ));
    }

    list_published(state, query).await
}
