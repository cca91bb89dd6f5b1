//! Lectern - content-management REST backend
//!
//! Accounts, articles, tags, full-text search, API keys and a sitemap,
//! served over hyper and stored in MongoDB.
//!
//! ## Authentication
//!
//! Requests authenticate with either `Authorization: Bearer <token>` or
//! `X-API-Key: <key>`. The [`auth::AuthGate`] resolves the credential to a
//! principal whose role is then checked against the route's
//! [`auth::AccessPolicy`].

pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{route, run, AppState};
pub use types::{LecternError, Result};
