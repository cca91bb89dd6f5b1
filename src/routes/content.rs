//! Content routes
//!
//! - GET    /content         - published content, newest first (tag/q/limit/offset)
//! - GET    /content/{slug}  - one item; drafts only for their author or an admin
//! - POST   /content         - create (admin, contributor)
//! - PUT    /content/{id}    - partial update (admin, or the authoring contributor)
//! - DELETE /content/{id}    - delete (admin, or the authoring contributor)
//!
//! Content the caller may not touch is reported as not found.

use bson::oid::ObjectId;
use bytes::Bytes;
use hyper::{Method, Request, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::info;

use super::response::{
    json_response, method_not_allowed, no_content, page_size, parse_json_body, parse_query,
    HttpResponse,
};
use super::views::{ContentView, ListResponse};
use crate::auth::{AccessPolicy, AuthContext, Role, CONTENT_WRITERS};
use crate::db::schemas::{slugify, ContentDoc, ContentStatus, TagDoc};
use crate::server::AppState;
use crate::store::ContentQuery;
use crate::types::{LecternError, Result};

const TITLE_MAX: usize = 200;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub tag: Option<String>,
    pub q: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateContentRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: ContentStatus,
}

/// Every field optional; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct UpdateContentRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub slug: Option<String>,
    /// Empty string clears the excerpt
    pub excerpt: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<ContentStatus>,
}

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > TITLE_MAX {
        return Err(LecternError::BadRequest(format!(
            "Title must be 1-{} characters",
            TITLE_MAX
        )));
    }
    Ok(title.to_string())
}

fn derive_slug(requested: Option<&str>, title: &str) -> Result<String> {
    let slug = slugify(requested.unwrap_or(title));
    if slug.is_empty() {
        return Err(LecternError::BadRequest(
            "Slug must contain at least one letter or digit".into(),
        ));
    }
    Ok(slug)
}

fn normalize_excerpt(excerpt: Option<String>) -> Option<String> {
    excerpt
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
}

/// Turn display names into tags, dropping blanks and duplicate slugs
fn parse_tags(names: &[String]) -> Vec<TagDoc> {
    let mut by_slug = BTreeMap::new();
    for tag in names.iter().filter_map(|name| TagDoc::from_name(name)) {
        by_slug.entry(tag.slug.clone()).or_insert(tag);
    }
    by_slug.into_values().collect()
}

/// Resolve tag names, upsert them, and return their slugs
async fn store_tags(state: &AppState, names: &[String]) -> Result<Vec<String>> {
    let tags = parse_tags(names);
    if !tags.is_empty() {
        state.store.upsert_tags(&tags).await?;
    }
    Ok(tags.into_iter().map(|t| t.slug).collect())
}

/// Whether the caller may modify the content
fn can_manage(ctx: &AuthContext, content: &ContentDoc) -> bool {
    ctx.role() == Role::Admin || content.author_id.to_hex() == ctx.user_id()
}

/// Whether the caller may read the content
fn can_view(ctx: Option<&AuthContext>, content: &ContentDoc) -> bool {
    content.is_published() || ctx.is_some_and(|ctx| can_manage(ctx, content))
}

fn not_found() -> LecternError {
    LecternError::NotFound("Content not found".into())
}

/// Published listing shared by `/content` and `/search`
pub(crate) async fn list_published(
    state: &AppState,
    query: ListQuery,
) -> Result<HttpResponse> {
    let limit = page_size(query.limit);
    let offset = query.offset.unwrap_or(0);

    let items = state
        .store
        .list_published(&ContentQuery {
            tag: query.tag.as_deref().map(slugify).filter(|t| !t.is_empty()),
            text: query
                .q
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty()),
            limit,
            offset,
        })
        .await?;

    Ok(json_response(
        StatusCode::OK,
        &ListResponse {
            items: items.iter().map(ContentView::from).collect(),
            limit,
            offset,
        },
    ))
}

async fn handle_list(req: Request<Bytes>, state: &AppState) -> Result<HttpResponse> {
    let query: ListQuery = parse_query(&req)?;
    list_published(state, query).await
}

async fn handle_get(mut req: Request<Bytes>, state: &AppState, slug: &str) -> Result<HttpResponse> {
    let ctx = state.gate.resolve(&mut req, AccessPolicy::Optional).await?;

    let content = state
        .store
        .find_content_by_slug(slug)
        .await?
        .filter(|content| can_view(ctx.as_ref(), content))
        .ok_or_else(not_found)?;

    Ok(json_response(StatusCode::OK, &ContentView::from(&content)))
}

async fn handle_create(mut req: Request<Bytes>, state: &AppState) -> Result<HttpResponse> {
    let ctx = state
        .gate
        .require(&mut req, AccessPolicy::Roles(CONTENT_WRITERS))
        .await?;
    let body: CreateContentRequest = parse_json_body(&req)?;

    let title = validate_title(&body.title)?;
    let slug = derive_slug(body.slug.as_deref(), &title)?;
    let author_id = ObjectId::parse_str(ctx.user_id())
        .map_err(|e| LecternError::Internal(format!("Principal id is not an ObjectId: {}", e)))?;

    let mut content = ContentDoc {
        slug,
        title,
        body: body.body,
        excerpt: normalize_excerpt(body.excerpt),
        author_id,
        author_username: ctx.principal.username.clone(),
        tags: store_tags(state, &body.tags).await?,
        ..Default::default()
    };
    content.set_status(body.status);

    let content = state.store.insert_content(content).await?;

    info!(
        content_id = %content.id_hex(),
        slug = %content.slug,
        user_id = %ctx.user_id(),
        "Created content"
    );

    Ok(json_response(StatusCode::CREATED, &ContentView::from(&content)))
}

async fn handle_update(mut req: Request<Bytes>, state: &AppState, id: &str) -> Result<HttpResponse> {
    let ctx = state
        .gate
        .require(&mut req, AccessPolicy::Roles(CONTENT_WRITERS))
        .await?;
    let body: UpdateContentRequest = parse_json_body(&req)?;

    let mut content = state
        .store
        .get_content(id)
        .await?
        .filter(|content| can_manage(&ctx, content))
        .ok_or_else(not_found)?;

    if let Some(title) = body.title {
        content.title = validate_title(&title)?;
    }
    if let Some(slug) = body.slug {
        content.slug = derive_slug(Some(&slug), &content.title)?;
    }
    if let Some(text) = body.body {
        content.body = text;
    }
    if body.excerpt.is_some() {
        content.excerpt = normalize_excerpt(body.excerpt);
    }
    if let Some(tags) = body.tags {
        content.tags = store_tags(state, &tags).await?;
    }
    if let Some(status) = body.status {
        content.set_status(status);
    }

    if !state.store.replace_content(content.clone()).await? {
        return Err(not_found());
    }

    info!(content_id = %id, user_id = %ctx.user_id(), "Updated content");

    // Re-read to report the stored timestamps
    let content = state.store.get_content(id).await?.unwrap_or(content);
    Ok(json_response(StatusCode::OK, &ContentView::from(&content)))
}

async fn handle_delete(mut req: Request<Bytes>, state: &AppState, id: &str) -> Result<HttpResponse> {
    let ctx = state
        .gate
        .require(&mut req, AccessPolicy::Roles(CONTENT_WRITERS))
        .await?;

    let content = state
        .store
        .get_content(id)
        .await?
        .filter(|content| can_manage(&ctx, content))
        .ok_or_else(not_found)?;

    if !state.store.delete_content(&content.id_hex()).await? {
        return Err(not_found());
    }

    info!(content_id = %id, user_id = %ctx.user_id(), "Deleted content");
    Ok(no_content())
}

/// Handle `/content` and `/content/{key}`
pub async fn handle_content_request(
    req: Request<Bytes>,
    state: &AppState,
    path: &str,
) -> Option<Result<HttpResponse>> {
    let rest = path.strip_prefix("/content")?;
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    let method = req.method().clone();

    let result = match (method, segments.as_slice()) {
        (Method::GET, []) => handle_list(req, state).await,
        (Method::POST, []) => handle_create(req, state).await,
        (Method::GET, [slug]) => handle_get(req, state, slug).await,
        (Method::PUT, [id]) => handle_update(req, state, id).await,
        (Method::DELETE, [id]) => handle_delete(req, state, id).await,
        (_, []) | (_, [_]) => Ok(method_not_allowed()),
        _ => return None,
    };

    Some(result)
}
