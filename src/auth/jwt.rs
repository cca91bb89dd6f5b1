//! Bearer token issuing and verification
//!
//! Tokens are HS256-signed JWTs carrying the user id, username and role.
//! Nothing is stored server-side: a token is valid exactly when its
//! signature checks out and its `exp` has not passed.
//!
//! Security notes:
//! - The signing secret must be at least 32 characters
//! - Outside dev mode a missing secret is a startup error
//! - The dev-mode fallback secret is public; never run it in production

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::warn;

use crate::auth::{Principal, Role};
use crate::config::Args;
use crate::types::LecternError;

/// Default token lifetime: 7 days
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Longest accepted token lifetime: 365 days
pub const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Minimum accepted secret length
const MIN_SECRET_LEN: usize = 32;

const DEV_SECRET: &str = "lectern-dev-mode-secret-not-for-production-use";

/// Payload stored in the token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    #[serde(rename = "sub")]
    pub user_id: String,
    pub username: String,
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Why a token was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,
    #[error("token expired")]
    Expired,
}

/// A freshly signed token and its expiry
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: u64,
}

/// Signs and verifies bearer tokens
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenCodec {
    /// Create a codec from an explicit secret.
    ///
    /// Returns an error if the secret is empty or too short.
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, LecternError> {
        if secret.is_empty() {
            return Err(LecternError::Config(
                "JWT_SECRET is required in production mode".into(),
            ));
        }

        if secret.len() < MIN_SECRET_LEN {
            return Err(LecternError::Config(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }

        Ok(Self::from_secret(secret, ttl))
    }

    /// Codec signed with the public development secret
    pub fn new_dev(ttl: Duration) -> Self {
        Self::from_secret(DEV_SECRET, ttl)
    }

    /// Build the codec from process configuration.
    ///
    /// A configured secret always wins. Without one, dev mode falls back to the
    /// development secret (logged as a security risk) and production fails.
    pub fn from_args(args: &Args) -> Result<Self, LecternError> {
        let ttl = Duration::from_secs(args.jwt_ttl_seconds);
        match args.jwt_secret.as_deref() {
            Some(secret) => Self::new(secret, ttl),
            None if args.dev_mode => {
                warn!("SECURITY RISK: JWT_SECRET unset, signing tokens with the public dev secret");
                Ok(Self::new_dev(ttl))
            }
            None => Err(LecternError::Config(
                "JWT_SECRET is required in production mode".into(),
            )),
        }
    }

    fn from_secret(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Issue a token for the principal using the configured lifetime
    pub fn issue(&self, principal: &Principal) -> Result<IssuedToken, LecternError> {
        self.issue_at(principal, self.ttl, unix_now()?)
    }

    /// Issue a token as if it had been signed at `issued_at` (Unix seconds)
    pub fn issue_at(
        &self,
        principal: &Principal,
        ttl: Duration,
        issued_at: u64,
    ) -> Result<IssuedToken, LecternError> {
        let exp = issued_at.checked_add(ttl.as_secs()).ok_or_else(|| {
            LecternError::Config(format!("Token lifetime of {}s is out of range", ttl.as_secs()))
        })?;

        let claims = Claims {
            user_id: principal.id.clone(),
            username: principal.username.clone(),
            role: principal.role,
            iat: issued_at,
            exp,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| LecternError::Internal(format!("Failed to generate token: {}", e)))?;

        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }

    /// Verify signature and expiry and return the claims
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

fn unix_now() -> Result<u64, LecternError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| LecternError::Internal(format!("System time error: {}", e)))
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn extract_bearer_token(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?.trim();
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
