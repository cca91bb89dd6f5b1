//! API key management
//!
//! - POST   /api-keys      - create a key; the raw value is returned once
//! - GET    /api-keys      - list the caller's keys
//! - DELETE /api-keys/{id} - revoke one of the caller's keys

use bytes::Bytes;
use hyper::{Method, Request, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::response::{
    json_response, method_not_allowed, no_content, parse_json_body, HttpResponse,
};
use super::views::ApiKeyView;
use crate::auth::{generate_api_key, AccessPolicy};
use crate::db::schemas::ApiKeyDoc;
use crate::server::AppState;
use crate::types::{LecternError, Result};

const NAME_MAX: usize = 64;

#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedApiKeyResponse {
    pub id: String,
    pub name: String,
    /// Raw key; not retrievable again
    pub key: String,
    pub created_at: Option<String>,
}

async fn handle_create(mut req: Request<Bytes>, state: &AppState) -> Result<HttpResponse> {
    let ctx = state.gate.require(&mut req, AccessPolicy::Required).await?;
    let body: CreateApiKeyRequest = parse_json_body(&req)?;

    let name = body.name.trim();
    if name.is_empty() || name.chars().count() > NAME_MAX {
        return Err(LecternError::BadRequest(format!(
            "Key name must be 1-{} characters",
            NAME_MAX
        )));
    }

    let owner_id = bson::oid::ObjectId::parse_str(ctx.user_id())
        .map_err(|e| LecternError::Internal(format!("Principal id is not an ObjectId: {}", e)))?;

    let generated = generate_api_key();
    let stored = state
        .store
        .insert_api_key(ApiKeyDoc::new(generated.digest, name.to_string(), owner_id))
        .await?;

    info!(key_id = %stored.id_hex(), user_id = %ctx.user_id(), "Created API key");

    Ok(json_response(
        StatusCode::CREATED,
        &CreatedApiKeyResponse {
            id: stored.id_hex(),
            name: stored.name.clone(),
            key: generated.raw,
            created_at: stored.metadata.created_at_rfc3339(),
        },
    ))
}

async fn handle_list(mut req: Request<Bytes>, state: &AppState) -> Result<HttpResponse> {
    let ctx = state.gate.require(&mut req, AccessPolicy::Required).await?;

    let keys = state.store.list_api_keys(ctx.user_id()).await?;
    let views: Vec<ApiKeyView> = keys.iter().map(ApiKeyView::from).collect();

    Ok(json_response(StatusCode::OK, &views))
}

/// Another user's key is reported exactly like a missing one
async fn handle_delete(
    mut req: Request<Bytes>,
    state: &AppState,
    key_id: &str,
) -> Result<HttpResponse> {
    let ctx = state.gate.require(&mut req, AccessPolicy::Required).await?;

    if !state.store.delete_api_key(key_id, ctx.user_id()).await? {
        return Err(LecternError::NotFound("API key not found".into()));
    }

    info!(key_id = %key_id, user_id = %ctx.user_id(), "Revoked API key");
    Ok(no_content())
}

/// Handle `/api-keys` and `/api-keys/{id}`
pub async fn handle_api_keys_request(
    req: Request<Bytes>,
    state: &AppState,
    path: &str,
) -> Option<Result<HttpResponse>> {
    let rest = path.strip_prefix("/api-keys")?;
    let method = req.method().clone();

    let result = match (method, rest.trim_end_matches('/')) {
        (Method::POST, "") => handle_create(req, state).await,
        (Method::GET, "") => handle_list(req, state).await,
        (_, "") => Ok(method_not_allowed()),
        (method, id) => match id.strip_prefix('/').filter(|id| !id.contains('/')) {
            Some(id) if method == Method::DELETE => handle_delete(req, state, id).await,
            Some(_) => Ok(method_not_allowed()),
            None => return None,
        },
    };

    Some(result)
}
