//! Database schemas for Lectern
//!
//! Defines MongoDB document structures for users, API keys, content and tags.

mod api_key;
mod content;
mod metadata;
mod tag;
mod user;

pub use api_key::{ApiKeyDoc, API_KEY_COLLECTION};
pub use content::{ContentDoc, ContentStatus, CONTENT_COLLECTION};
pub use metadata::Metadata;
pub use tag::{slugify, TagDoc, TAG_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};
