//! Request-time authentication gate
//!
//! Resolves the credential on an inbound request into an [`AuthContext`]:
//!
//! 1. A context already in the request extensions is reused as-is
//! 2. `Authorization: Bearer <token>` is verified and the user re-fetched
//! 3. Otherwise `X-API-Key` is hashed and looked up with its owner
//! 4. Otherwise the request carries no credential
//!
//! A present bearer token always wins; the API key is never consulted
//! alongside it. Role checks run after resolution and only for
//! [`AccessPolicy::Roles`].

use hyper::{header::AUTHORIZATION, Request, StatusCode};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::api_key::{extract_api_key, hash_api_key, API_KEY_HEADER};
use super::jwt::{extract_bearer_token, TokenCodec, TokenError};
use super::roles::allow;
use super::{AuthContext, AuthMethod, Role};
use crate::store::CredentialStore;

/// What a route requires of the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Resolve a bearer token if one is present; never reject
    Optional,
    /// Any authenticated principal
    Required,
    /// An authenticated principal holding one of these roles
    Roles(&'static [Role]),
}

/// Why a credential did not resolve; only ever logged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFailure {
    Missing,
    Token(TokenError),
    /// Token verified but its user no longer exists
    StaleToken,
    UnknownApiKey,
}

impl fmt::Display for CredentialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "authentication required"),
            Self::Token(TokenError::Invalid) => write!(f, "invalid token"),
            Self::Token(TokenError::Expired) => write!(f, "expired token"),
            Self::StaleToken => write!(f, "stale token: user deleted"),
            Self::UnknownApiKey => write!(f, "invalid api key"),
        }
    }
}

/// Terminal rejection from the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthRejection {
    #[error("unauthenticated: {0}")]
    Unauthenticated(CredentialFailure),

    #[error("insufficient permissions")]
    Forbidden,

    /// The credential store could not answer
    #[error("credential store failure")]
    Internal,
}

impl AuthRejection {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Response body text. Bad, expired and stale credentials all read the same.
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::Unauthenticated(CredentialFailure::Missing) => "authentication required",
            Self::Unauthenticated(_) => "invalid credentials",
            Self::Forbidden => "insufficient permissions",
            Self::Internal => "Internal server error",
        }
    }
}

/// Resolves principals for requests
#[derive(Clone)]
pub struct AuthGate {
    codec: Arc<TokenCodec>,
    store: Arc<dyn CredentialStore>,
}

impl AuthGate {
    pub fn new(codec: Arc<TokenCodec>, store: Arc<dyn CredentialStore>) -> Self {
        Self { codec, store }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Resolve the caller under `policy`.
    ///
    /// `Ok(None)` only happens for [`AccessPolicy::Optional`]. A resolved
    /// context is attached to the request extensions.
    pub async fn resolve<B>(
        &self,
        req: &mut Request<B>,
        policy: AccessPolicy,
    ) -> Result<Option<AuthContext>, AuthRejection> {
        if let Some(ctx) = req.extensions().get::<AuthContext>() {
            let ctx = ctx.clone();
            return match policy {
                AccessPolicy::Optional => Ok(Some(ctx)),
                _ => check_roles(ctx, policy).map(Some),
            };
        }

        let ctx = match policy {
            AccessPolicy::Optional => match self.resolve_optional(req).await {
                Some(ctx) => ctx,
                None => return Ok(None),
            },
            _ => self.resolve_required(req).await?,
        };

        req.extensions_mut().insert(ctx.clone());
        check_roles(ctx, policy).map(Some)
    }

    /// Resolve under a policy that cannot yield "no principal"
    pub async fn require<B>(
        &self,
        req: &mut Request<B>,
        policy: AccessPolicy,
    ) -> Result<AuthContext, AuthRejection> {
        match self.resolve(req, policy).await? {
            Some(ctx) => Ok(ctx),
            None => Err(AuthRejection::Unauthenticated(CredentialFailure::Missing)),
        }
    }

    async fn resolve_required<B>(&self, req: &Request<B>) -> Result<AuthContext, AuthRejection> {
        let path = req.uri().path();

        if let Some(token) = extract_bearer_token(header(req, AUTHORIZATION.as_str())) {
            return self.resolve_token(token).await.inspect_err(|rejection| {
                log_rejection(rejection, AuthMethod::Token, path);
            });
        }

        if let Some(raw_key) = extract_api_key(header(req, API_KEY_HEADER)) {
            return self.resolve_api_key(raw_key).await.inspect_err(|rejection| {
                log_rejection(rejection, AuthMethod::ApiKey, path);
            });
        }

        let rejection = AuthRejection::Unauthenticated(CredentialFailure::Missing);
        debug!(path = %path, "{}", CredentialFailure::Missing);
        Err(rejection)
    }

    /// Bearer token only; every failure collapses to "no principal"
    async fn resolve_optional<B>(&self, req: &Request<B>) -> Option<AuthContext> {
        let token = extract_bearer_token(header(req, AUTHORIZATION.as_str()))?;

        match self.resolve_token(token).await {
            Ok(ctx) => Some(ctx),
            Err(AuthRejection::Internal) => {
                warn!(path = %req.uri().path(), "Optional auth skipped: credential store unavailable");
                None
            }
            Err(rejection) => {
                debug!(path = %req.uri().path(), reason = %rejection, "Optional auth ignored credential");
                None
            }
        }
    }

    async fn resolve_token(&self, token: &str) -> Result<AuthContext, AuthRejection> {
        let claims = self
            .codec
            .verify(token)
            .map_err(|e| AuthRejection::Unauthenticated(CredentialFailure::Token(e)))?;

        match self.store.find_user_by_id(&claims.user_id).await {
            Ok(Some(principal)) => Ok(AuthContext::new(principal, AuthMethod::Token)),
            Ok(None) => Err(AuthRejection::Unauthenticated(CredentialFailure::StaleToken)),
            Err(e) => {
                error!(credential = "token", user_id = %claims.user_id, "Credential store error: {}", e);
                Err(AuthRejection::Internal)
            }
        }
    }

    async fn resolve_api_key(&self, raw_key: &str) -> Result<AuthContext, AuthRejection> {
        let digest = hash_api_key(raw_key);

        let record = match self.store.find_api_key_by_hash(&digest).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                return Err(AuthRejection::Unauthenticated(
                    CredentialFailure::UnknownApiKey,
                ))
            }
            Err(e) => {
                error!(credential = "apikey", "Credential store error: {}", e);
                return Err(AuthRejection::Internal);
            }
        };

        // Best-effort; a failed touch never fails the request
        let store = Arc::clone(&self.store);
        let key_id = record.key_id.clone();
        tokio::spawn(async move {
            if let Err(e) = store.touch_api_key_last_used(&key_id).await {
                warn!(key_id = %key_id, "Failed to record API key use: {}", e);
            }
        });

        debug!(key_id = %record.key_id, key_name = %record.name, "Authenticated by API key");
        Ok(AuthContext::new(record.owner, AuthMethod::ApiKey))
    }
}

fn header<'a, B>(req: &'a Request<B>, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

fn check_roles(ctx: AuthContext, policy: AccessPolicy) -> Result<AuthContext, AuthRejection> {
    match policy {
        AccessPolicy::Roles(roles) if !allow(&ctx.principal, roles) => {
            warn!(
                user_id = %ctx.user_id(),
                role = %ctx.role(),
                "Rejected request: insufficient permissions"
            );
            Err(AuthRejection::Forbidden)
        }
        _ => Ok(ctx),
    }
}

fn log_rejection(rejection: &AuthRejection, method: AuthMethod, path: &str) {
    if let AuthRejection::Unauthenticated(reason) = rejection {
        warn!(credential = method.as_str(), path = %path, "Rejected request: {}", reason);
    }
}
