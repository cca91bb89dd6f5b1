//! Persistence boundary
//!
//! Routes and the auth gate talk to storage only through these traits.
//! Lookups return `Ok(None)` for "not found"; `Err` is reserved for a
//! store that could not answer, or for a unique-key collision on write.
//! Adapters translate their own error encodings into [`StoreError`].

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use async_trait::async_trait;

use crate::auth::{Principal, Role};
use crate::db::schemas::{ApiKeyDoc, ContentDoc, TagDoc, UserDoc};

/// Failure talking to the store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A unique field already holds this value
    #[error("duplicate {0}")]
    Duplicate(String),

    /// The store is unreachable or returned an unexpected failure
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// API key joined with its owner, as needed by the auth gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyOwner {
    pub key_id: String,
    pub name: String,
    pub owner: Principal,
}

/// Filters for listing published content
#[derive(Debug, Clone, Default)]
pub struct ContentQuery {
    /// Only content carrying this tag slug
    pub tag: Option<String>,
    /// Full-text search terms
    pub text: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

/// Lookups the auth gate performs on every authenticated request
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<Principal>, StoreError>;

    async fn find_api_key_by_hash(&self, digest: &str) -> Result<Option<ApiKeyOwner>, StoreError>;

    /// Record `last_used_at = now`. Idempotent, last write wins.
    async fn touch_api_key_last_used(&self, key_id: &str) -> Result<(), StoreError>;
}

/// Account storage
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn count_users(&self) -> Result<u64, StoreError>;

    /// Insert and return the stored account with its id.
    /// Fails with `Duplicate` on a taken username or email.
    async fn create_user(&self, user: UserDoc) -> Result<UserDoc, StoreError>;

    async fn get_user(&self, id: &str) -> Result<Option<UserDoc>, StoreError>;

    /// Look up by username or email
    async fn find_user_by_identifier(&self, identifier: &str)
        -> Result<Option<UserDoc>, StoreError>;

    async fn list_users(&self) -> Result<Vec<UserDoc>, StoreError>;

    async fn set_user_role(&self, id: &str, role: Role) -> Result<Option<UserDoc>, StoreError>;
}

/// API key lifecycle storage
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    /// Fails with `Duplicate` if the digest is already stored
    async fn insert_api_key(&self, key: ApiKeyDoc) -> Result<ApiKeyDoc, StoreError>;

    async fn list_api_keys(&self, owner_id: &str) -> Result<Vec<ApiKeyDoc>, StoreError>;

    /// Delete only if both id and owner match. `Ok(false)` when nothing matched.
    async fn delete_api_key(&self, key_id: &str, owner_id: &str) -> Result<bool, StoreError>;
}

/// Content and tag storage
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fails with `Duplicate` on a taken slug
    async fn insert_content(&self, content: ContentDoc) -> Result<ContentDoc, StoreError>;

    async fn get_content(&self, id: &str) -> Result<Option<ContentDoc>, StoreError>;

    async fn find_content_by_slug(&self, slug: &str) -> Result<Option<ContentDoc>, StoreError>;

    /// Replace by id. `Ok(false)` when the id is unknown.
    async fn replace_content(&self, content: ContentDoc) -> Result<bool, StoreError>;

    async fn delete_content(&self, id: &str) -> Result<bool, StoreError>;

    /// Published content, newest first
    async fn list_published(&self, query: &ContentQuery) -> Result<Vec<ContentDoc>, StoreError>;

    /// Create any tags whose slug is not yet known; existing tags keep their name
    async fn upsert_tags(&self, tags: &[TagDoc]) -> Result<(), StoreError>;

    /// All tags sorted by name
    async fn list_tags(&self) -> Result<Vec<TagDoc>, StoreError>;
}

/// Everything the HTTP layer needs from a backend
pub trait Store: CredentialStore + UserStore + ApiKeyStore + ContentStore {
    /// Backend name for health reporting
    fn backend(&self) -> &'static str;
}
