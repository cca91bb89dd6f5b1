//! Admin user management
//!
//! - GET /admin/users           - list all accounts
//! - PUT /admin/users/{id}/role - change an account's role
//!
//! All endpoints require the admin role. Role changes take effect on the
//! target's next request since principals are re-fetched every time.

use bson::oid::ObjectId;
use bytes::Bytes;
use hyper::{Method, Request, StatusCode};
use serde::Deserialize;
use tracing::info;

use super::response::{json_response, method_not_allowed, parse_json_body, HttpResponse};
use super::views::UserView;
use crate::auth::{AccessPolicy, Role, ADMINS_ONLY};
use crate::server::AppState;
use crate::types::{LecternError, Result};

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

fn user_not_found() -> LecternError {
    LecternError::NotFound("User not found".into())
}

async fn handle_list_users(mut req: Request<Bytes>, state: &AppState) -> Result<HttpResponse> {
    state
        .gate
        .require(&mut req, AccessPolicy::Roles(ADMINS_ONLY))
        .await?;

    let users = state.store.list_users().await?;
    let views: Vec<UserView> = users.iter().map(UserView::from).collect();

    Ok(json_response(StatusCode::OK, &views))
}

async fn handle_update_role(
    mut req: Request<Bytes>,
    state: &AppState,
    user_id: &str,
) -> Result<HttpResponse> {
    let ctx = state
        .gate
        .require(&mut req, AccessPolicy::Roles(ADMINS_ONLY))
        .await?;
    let body: UpdateRoleRequest = parse_json_body(&req)?;

    let role = Role::parse(&body.role).ok_or_else(|| {
        LecternError::BadRequest(format!(
            "Invalid role '{}'. Must be one of: admin, contributor, viewer",
            body.role
        ))
    })?;

    // Compare parsed ids; hex case must not matter
    let target = ObjectId::parse_str(user_id).map_err(|_| user_not_found())?;
    let is_self = ObjectId::parse_str(ctx.user_id()).is_ok_and(|own| own == target);

    // Keeps at least the acting admin in place
    if is_self && role != Role::Admin {
        return Err(LecternError::BadRequest(
            "Admins cannot demote themselves".into(),
        ));
    }

    let target = target.to_hex();
    let user = state
        .store
        .set_user_role(&target, role)
        .await?
        .ok_or_else(user_not_found)?;

    info!(
        admin_id = %ctx.user_id(),
        user_id = %target,
        role = %role,
        "Updated user role"
    );

    Ok(json_response(StatusCode::OK, &UserView::from(&user)))
}

/// Handle `/admin/users/*`. Returns None if the path is not an admin user route.
pub async fn handle_admin_users_request(
    req: Request<Bytes>,
    state: &AppState,
    path: &str,
) -> Option<Result<HttpResponse>> {
    let rest = path.strip_prefix("/admin/users")?;
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    let method = req.method().clone();

    let result = match (method, segments.as_slice()) {
        (Method::GET, []) => handle_list_users(req, state).await,
        (Method::PUT, [id, "role"]) => handle_update_role(req, state, id).await,
        (_, []) | (_, [_, "role"]) => Ok(method_not_allowed()),
        _ => return None,
    };

    Some(result)
}
