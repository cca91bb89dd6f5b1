//! Roles and the role guard
//!
//! Every principal carries exactly one role. Routes declare the set of roles
//! they accept and the guard checks membership after authentication.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Principal;

/// Fixed set of account roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including user administration
    Admin,
    /// Can create and manage their own content
    Contributor,
    /// Read-only account
    #[default]
    Viewer,
}

/// Roles allowed to write content
pub const CONTENT_WRITERS: &[Role] = &[Role::Admin, Role::Contributor];

/// Roles allowed to administer users
pub const ADMINS_ONLY: &[Role] = &[Role::Admin];

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Contributor => "contributor",
            Role::Viewer => "viewer",
        }
    }

    /// Parse a role name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "contributor" => Some(Role::Contributor),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Check whether a principal's role is in the allowed set.
///
/// Pure check with no I/O. Only meaningful for an already-authenticated
/// principal; a missing principal is handled by the gate as "authentication
/// required" before this is ever called.
pub fn allow(principal: &Principal, allowed_roles: &[Role]) -> bool {
    allowed_roles.contains(&principal.role)
}
