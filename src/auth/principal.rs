//! The authenticated identity attached to a request

use serde::{Deserialize, Serialize};

use super::Role;

/// Authenticated identity resolved for a request.
///
/// Always re-fetched from the credential store; never cached across requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
}

/// Which credential resolved the principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthMethod {
    #[serde(rename = "token")]
    Token,
    #[serde(rename = "apikey")]
    ApiKey,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Token => "token",
            AuthMethod::ApiKey => "apikey",
        }
    }
}

/// Principal plus the credential type that produced it.
///
/// Stored in the request extensions once resolved, so a second pass through
/// the gate short-circuits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub principal: Principal,
    pub method: AuthMethod,
}

impl AuthContext {
    pub fn new(principal: Principal, method: AuthMethod) -> Self {
        Self { principal, method }
    }

    pub fn user_id(&self) -> &str {
        &self.principal.id
    }

    pub fn role(&self) -> Role {
        self.principal.role
    }
}
