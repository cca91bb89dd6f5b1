//! Account routes
//!
//! - POST /auth/register - create an account and sign in
//! - POST /auth/login    - exchange username/email + password for a token
//! - GET  /auth/me       - the resolved principal
//! - POST /auth/refresh  - re-issue a bearer token

use bytes::Bytes;
use hyper::{header::AUTHORIZATION, Method, Request, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::response::{json_response, method_not_allowed, parse_json_body, HttpResponse};
use super::views::UserView;
use crate::auth::{
    extract_bearer_token, hash_password, validate_password, verify_password_or_dummy,
    AccessPolicy, Principal, Role,
};
use crate::db::schemas::UserDoc;
use crate::server::AppState;
use crate::types::{LecternError, Result};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    /// Unix seconds
    pub expires_at: u64,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub auth_type: &'static str,
}

// =============================================================================
// Validation
// =============================================================================

/// Case-fold and check a username
fn normalize_username(raw: &str) -> Result<String> {
    let username = raw.trim().to_lowercase();
    let len = username.chars().count();

    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(LecternError::BadRequest(format!(
            "Username must be {}-{} characters",
            USERNAME_MIN, USERNAME_MAX
        )));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        return Err(LecternError::BadRequest(
            "Username may only contain a-z, 0-9, '_' and '-'".into(),
        ));
    }

    Ok(username)
}

fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(LecternError::BadRequest("Invalid email address".into())),
    }
}

fn invalid_credentials() -> LecternError {
    LecternError::Unauthorized("invalid credentials".into())
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /auth/register
///
/// The first account ever created becomes the admin; everyone after is a viewer.
async fn handle_register(req: Request<Bytes>, state: &AppState) -> Result<HttpResponse> {
    let body: RegisterRequest = parse_json_body(&req)?;

    let username = normalize_username(&body.username)?;
    let email = normalize_email(&body.email)?;
    validate_password(&body.password)?;

    let role = if state.store.count_users().await? == 0 {
        Role::Admin
    } else {
        Role::Viewer
    };

    let password_hash = hash_password(&body.password)?;
    let user = state
        .store
        .create_user(UserDoc::new(username, email, password_hash, role))
        .await?;

    info!(user_id = %user.id_hex(), username = %user.username, role = %user.role, "Registered user");

    auth_response(state, &user.to_principal(), StatusCode::CREATED, UserView::from(&user))
}

/// POST /auth/login
async fn handle_login(req: Request<Bytes>, state: &AppState) -> Result<HttpResponse> {
    let body: LoginRequest = parse_json_body(&req)?;

    if body.identifier.trim().is_empty() || body.password.is_empty() {
        return Err(LecternError::BadRequest(
            "Missing required fields: identifier, password".into(),
        ));
    }

    let user = state.store.find_user_by_identifier(&body.identifier).await?;
    let stored_hash = user.as_ref().map(|u| u.password_hash.as_str());
    let verified = verify_password_or_dummy(&body.password, stored_hash)?;

    let Some(user) = user else {
        warn!("Login failed - user not found: {}", body.identifier);
        return Err(invalid_credentials());
    };

    if !verified {
        warn!("Login failed - wrong password for {}", user.username);
        return Err(invalid_credentials());
    }

    info!(user_id = %user.id_hex(), "User logged in");
    auth_response(state, &user.to_principal(), StatusCode::OK, UserView::from(&user))
}

/// GET /auth/me
async fn handle_me(mut req: Request<Bytes>, state: &AppState) -> Result<HttpResponse> {
    let ctx = state.gate.require(&mut req, AccessPolicy::Required).await?;

    Ok(json_response(
        StatusCode::OK,
        &MeResponse {
            id: ctx.principal.id,
            username: ctx.principal.username,
            email: ctx.principal.email,
            role: ctx.principal.role,
            auth_type: ctx.method.as_str(),
        },
    ))
}

/// POST /auth/refresh
///
/// Bearer tokens only. The new token carries the principal's current role.
async fn handle_refresh(mut req: Request<Bytes>, state: &AppState) -> Result<HttpResponse> {
    let has_bearer = extract_bearer_token(
        req.headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok()),
    )
    .is_some();
    if !has_bearer {
        return Err(LecternError::Unauthorized("authentication required".into()));
    }

    let ctx = state.gate.require(&mut req, AccessPolicy::Required).await?;

    let user = state
        .store
        .get_user(ctx.user_id())
        .await?
        .ok_or_else(invalid_credentials)?;

    auth_response(state, &ctx.principal, StatusCode::OK, UserView::from(&user))
}

fn auth_response(
    state: &AppState,
    principal: &Principal,
    status: StatusCode,
    user: UserView,
) -> Result<HttpResponse> {
    let issued = state.gate.codec().issue(principal)?;

    Ok(json_response(
        status,
        &AuthResponse {
            token: issued.token,
            expires_at: issued.expires_at,
            user,
        },
    ))
}

// =============================================================================
// Router
// =============================================================================

/// Handle `/auth/*`. Returns None if the path is not an auth route.
pub async fn handle_auth_request(
    req: Request<Bytes>,
    state: &AppState,
    path: &str,
) -> Option<Result<HttpResponse>> {
    let method = req.method().clone();

    let result = match (method, path) {
        (Method::POST, "/auth/register") => handle_register(req, state).await,
        (Method::POST, "/auth/login") => handle_login(req, state).await,
        (Method::GET, "/auth/me") => handle_me(req, state).await,
        (Method::POST, "/auth/refresh") => handle_refresh(req, state).await,

        (_, "/auth/register") | (_, "/auth/login") | (_, "/auth/me") | (_, "/auth/refresh") => {
            Ok(method_not_allowed())
        }

        _ => return None,
    };

    Some(result)
}
