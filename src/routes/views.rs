//! JSON views of stored documents
//!
//! Documents never go on the wire directly: password hashes and key digests
//! stay server-side, ids are hex strings, timestamps are RFC 3339.

use bson::DateTime;
use serde::Serialize;

use crate::auth::Role;
use crate::db::schemas::{ApiKeyDoc, ContentDoc, ContentStatus, TagDoc, UserDoc};

fn rfc3339(dt: Option<DateTime>) -> Option<String> {
    dt.map(|dt| dt.to_chrono().to_rfc3339())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl From<&UserDoc> for UserView {
    fn from(user: &UserDoc) -> Self {
        Self {
            id: user.id_hex(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            created_at: user.metadata.created_at_rfc3339(),
        }
    }
}

/// Listed API key; the raw key is only ever in the creation response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyView {
    pub id: String,
    pub name: String,
    pub created_at: Option<String>,
    pub last_used_at: Option<String>,
}

impl From<&ApiKeyDoc> for ApiKeyView {
    fn from(key: &ApiKeyDoc) -> Self {
        Self {
            id: key.id_hex(),
            name: key.name.clone(),
            created_at: key.metadata.created_at_rfc3339(),
            last_used_at: rfc3339(key.last_used_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentView {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub excerpt: Option<String>,
    pub author_id: String,
    pub author_username: String,
    pub tags: Vec<String>,
    pub status: ContentStatus,
    pub published_at: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<&ContentDoc> for ContentView {
    fn from(content: &ContentDoc) -> Self {
        Self {
            id: content.id_hex(),
            slug: content.slug.clone(),
            title: content.title.clone(),
            body: content.body.clone(),
            excerpt: content.excerpt.clone(),
            author_id: content.author_id.to_hex(),
            author_username: content.author_username.clone(),
            tags: content.tags.clone(),
            status: content.status,
            published_at: rfc3339(content.published_at),
            created_at: content.metadata.created_at_rfc3339(),
            updated_at: content.metadata.updated_at_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TagView {
    pub name: String,
    pub slug: String,
}

impl From<&TagDoc> for TagView {
    fn from(tag: &TagDoc) -> Self {
        Self {
            name: tag.name.clone(),
            slug: tag.slug.clone(),
        }
    }
}

/// Paged list wrapper
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub limit: u32,
    pub offset: u32,
}
