//! Authentication and authorization for Lectern
//!
//! Provides:
//! - Bearer token issuing and verification (JWT)
//! - API key generation and hashing
//! - Password hashing with Argon2
//! - Roles and the role guard
//! - The request-time auth gate tying them together

pub mod api_key;
pub mod gate;
pub mod jwt;
pub mod password;
mod principal;
pub mod roles;

pub use api_key::{generate_api_key, hash_api_key, GeneratedApiKey, API_KEY_HEADER};
pub use gate::{AccessPolicy, AuthGate, AuthRejection, CredentialFailure};
pub use jwt::{extract_bearer_token, Claims, IssuedToken, TokenCodec, TokenError};
pub use password::{
    hash_password, validate_password, verify_password, verify_password_or_dummy,
};
pub use principal::{AuthContext, AuthMethod, Principal};
pub use roles::{allow, Role, ADMINS_ONLY, CONTENT_WRITERS};
