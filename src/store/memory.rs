//! In-process store backed by concurrent maps
//!
//! Mirrors the MongoDB adapter's semantics: unique usernames, emails, key
//! digests and content slugs; soft-deleted API keys; hard-deleted content.
//! Used by the integration tests and by `MEMORY_STORE` dev runs.

use async_trait::async_trait;
use bson::{oid::ObjectId, DateTime};
use dashmap::{mapref::entry::Entry, DashMap};
use std::cmp::Reverse;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{
    ApiKeyOwner, ApiKeyStore, ContentQuery, ContentStore, CredentialStore, Store, StoreError,
    UserStore,
};
use crate::auth::{Principal, Role};
use crate::db::schemas::{ApiKeyDoc, ContentDoc, Metadata, TagDoc, UserDoc};

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<ObjectId, UserDoc>,
    usernames: DashMap<String, ObjectId>,
    emails: DashMap<String, ObjectId>,

    api_keys: DashMap<ObjectId, ApiKeyDoc>,
    key_hashes: DashMap<String, ObjectId>,

    content: DashMap<ObjectId, ContentDoc>,
    slugs: DashMap<String, ObjectId>,

    tags: DashMap<String, TagDoc>,

    unavailable: AtomicBool,
    fail_touches: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `Unavailable`, as if the database were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make only `touch_api_key_last_used` fail
    pub fn set_fail_touches(&self, fail: bool) {
        self.fail_touches.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store marked unavailable".into()))
        } else {
            Ok(())
        }
    }
}

/// Claim a unique value for `id`; fails if another document holds it
fn claim(
    index: &DashMap<String, ObjectId>,
    value: &str,
    id: ObjectId,
    field: &str,
) -> Result<(), StoreError> {
    match index.entry(value.to_string()) {
        Entry::Occupied(existing) if *existing.get() != id => {
            Err(StoreError::Duplicate(field.to_string()))
        }
        Entry::Occupied(_) => Ok(()),
        Entry::Vacant(slot) => {
            slot.insert(id);
            Ok(())
        }
    }
}

fn parse_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

fn stamp(metadata: &mut Metadata) {
    let now = DateTime::now();
    metadata.is_deleted = false;
    metadata.created_at = Some(now);
    metadata.updated_at = Some(now);
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<Principal>, StoreError> {
        Ok(self.get_user(id).await?.map(|user| user.to_principal()))
    }

    async fn find_api_key_by_hash(&self, digest: &str) -> Result<Option<ApiKeyOwner>, StoreError> {
        self.check()?;

        let Some(key_id) = self.key_hashes.get(digest).map(|id| *id) else {
            return Ok(None);
        };
        let Some(key) = self
            .api_keys
            .get(&key_id)
            .filter(|k| !k.metadata.is_deleted)
            .map(|k| k.value().clone())
        else {
            return Ok(None);
        };
        let Some(owner) = self
            .users
            .get(&key.owner_id)
            .filter(|u| !u.metadata.is_deleted)
            .map(|u| u.to_principal())
        else {
            return Ok(None);
        };

        Ok(Some(ApiKeyOwner {
            key_id: key.id_hex(),
            name: key.name,
            owner,
        }))
    }

    async fn touch_api_key_last_used(&self, key_id: &str) -> Result<(), StoreError> {
        self.check()?;
        if self.fail_touches.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("touch rejected".into()));
        }

        if let Some(mut key) = parse_id(key_id).and_then(|id| self.api_keys.get_mut(&id)) {
            key.last_used_at = Some(DateTime::now());
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn count_users(&self) -> Result<u64, StoreError> {
        self.check()?;
        Ok(self.users.iter().filter(|u| !u.metadata.is_deleted).count() as u64)
    }

    async fn create_user(&self, mut user: UserDoc) -> Result<UserDoc, StoreError> {
        self.check()?;

        let id = ObjectId::new();
        claim(&self.usernames, &user.username, id, "username")?;
        if let Err(e) = claim(&self.emails, &user.email, id, "email") {
            self.usernames.remove(&user.username);
            return Err(e);
        }

        user._id = Some(id);
        stamp(&mut user.metadata);
        self.users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserDoc>, StoreError> {
        self.check()?;
        Ok(parse_id(id)
            .and_then(|id| self.users.get(&id).map(|u| u.value().clone()))
            .filter(|u| !u.metadata.is_deleted))
    }

    async fn find_user_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<UserDoc>, StoreError> {
        self.check()?;

        let needle = identifier.trim().to_lowercase();
        let id = self
            .usernames
            .get(&needle)
            .or_else(|| self.emails.get(&needle))
            .map(|id| *id);

        Ok(id
            .and_then(|id| self.users.get(&id).map(|u| u.value().clone()))
            .filter(|u| !u.metadata.is_deleted))
    }

    async fn list_users(&self) -> Result<Vec<UserDoc>, StoreError> {
        self.check()?;

        let mut users: Vec<UserDoc> = self
            .users
            .iter()
            .filter(|u| !u.metadata.is_deleted)
            .map(|u| u.value().clone())
            .collect();
        users.sort_by_key(|u| u._id);
        Ok(users)
    }

    async fn set_user_role(&self, id: &str, role: Role) -> Result<Option<UserDoc>, StoreError> {
        self.check()?;

        let Some(mut user) = parse_id(id).and_then(|id| self.users.get_mut(&id)) else {
            return Ok(None);
        };
        if user.metadata.is_deleted {
            return Ok(None);
        }
        user.role = role;
        user.metadata.touch();
        Ok(Some(user.value().clone()))
    }
}

#[async_trait]
impl ApiKeyStore for MemoryStore {
    async fn insert_api_key(&self, mut key: ApiKeyDoc) -> Result<ApiKeyDoc, StoreError> {
        self.check()?;

        let id = ObjectId::new();
        claim(&self.key_hashes, &key.key_hash, id, "key_hash")?;

        key._id = Some(id);
        stamp(&mut key.metadata);
        self.api_keys.insert(id, key.clone());
        Ok(key)
    }

    async fn list_api_keys(&self, owner_id: &str) -> Result<Vec<ApiKeyDoc>, StoreError> {
        self.check()?;

        let Some(owner) = parse_id(owner_id) else {
            return Ok(Vec::new());
        };
        let mut keys: Vec<ApiKeyDoc> = self
            .api_keys
            .iter()
            .filter(|k| k.owner_id == owner && !k.metadata.is_deleted)
            .map(|k| k.value().clone())
            .collect();
        keys.sort_by_key(|k| k._id);
        Ok(keys)
    }

    async fn delete_api_key(&self, key_id: &str, owner_id: &str) -> Result<bool, StoreError> {
        self.check()?;

        let (Some(key_id), Some(owner)) = (parse_id(key_id), parse_id(owner_id)) else {
            return Ok(false);
        };
        match self.api_keys.get_mut(&key_id) {
            Some(mut key) if key.owner_id == owner && !key.metadata.is_deleted => {
                let now = DateTime::now();
                key.metadata.is_deleted = true;
                key.metadata.deleted_at = Some(now);
                key.metadata.updated_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn insert_content(&self, mut content: ContentDoc) -> Result<ContentDoc, StoreError> {
        self.check()?;

        let id = ObjectId::new();
        claim(&self.slugs, &content.slug, id, "slug")?;

        content._id = Some(id);
        stamp(&mut content.metadata);
        self.content.insert(id, content.clone());
        Ok(content)
    }

    async fn get_content(&self, id: &str) -> Result<Option<ContentDoc>, StoreError> {
        self.check()?;
        Ok(parse_id(id).and_then(|id| self.content.get(&id).map(|c| c.value().clone())))
    }

    async fn find_content_by_slug(&self, slug: &str) -> Result<Option<ContentDoc>, StoreError> {
        self.check()?;
        Ok(self
            .slugs
            .get(slug)
            .map(|id| *id)
            .and_then(|id| self.content.get(&id).map(|c| c.value().clone())))
    }

    async fn replace_content(&self, mut content: ContentDoc) -> Result<bool, StoreError> {
        self.check()?;

        let Some(id) = content._id else {
            return Ok(false);
        };
        let Some(previous_slug) = self.content.get(&id).map(|c| c.slug.clone()) else {
            return Ok(false);
        };

        if previous_slug != content.slug {
            claim(&self.slugs, &content.slug, id, "slug")?;
            self.slugs.remove(&previous_slug);
        }

        content.metadata.touch();
        self.content.insert(id, content);
        Ok(true)
    }

    async fn delete_content(&self, id: &str) -> Result<bool, StoreError> {
        self.check()?;

        match parse_id(id).and_then(|id| self.content.remove(&id)) {
            Some((_, removed)) => {
                self.slugs.remove(&removed.slug);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_published(&self, query: &ContentQuery) -> Result<Vec<ContentDoc>, StoreError> {
        self.check()?;

        let mut items: Vec<ContentDoc> = self
            .content
            .iter()
            .filter(|c| c.is_published())
            .filter(|c| query.tag.as_ref().is_none_or(|tag| c.tags.contains(tag)))
            .filter(|c| query.text.as_deref().is_none_or(|text| c.matches_text(text)))
            .map(|c| c.value().clone())
            .collect();

        items.sort_by_key(|c| Reverse((c.published_at, c._id)));

        Ok(items
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect())
    }

    async fn upsert_tags(&self, tags: &[TagDoc]) -> Result<(), StoreError> {
        self.check()?;

        for tag in tags {
            self.tags.entry(tag.slug.clone()).or_insert_with(|| {
                let mut tag = tag.clone();
                tag._id = Some(ObjectId::new());
                stamp(&mut tag.metadata);
                tag
            });
        }
        Ok(())
    }

    async fn list_tags(&self) -> Result<Vec<TagDoc>, StoreError> {
        self.check()?;

        let mut tags: Vec<TagDoc> = self.tags.iter().map(|t| t.value().clone()).collect();
        tags.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(tags)
    }
}

impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::ContentStatus;

    fn user(name: &str) -> UserDoc {
        UserDoc::new(
            name.to_string(),
            format!("{name}@example.com"),
            "hash".into(),
            Role::Viewer,
        )
    }

    #[tokio::test]
    async fn test_unique_username_and_email() {
        let store = MemoryStore::new();
        store.create_user(user("alice")).await.unwrap();

        let err = store.create_user(user("alice")).await.unwrap_err();
        assert_eq!(err, StoreError::Duplicate("username".into()));

        let mut other = user("bob");
        other.email = "alice@example.com".into();
        let err = store.create_user(other).await.unwrap_err();
        assert_eq!(err, StoreError::Duplicate("email".into()));

        // The failed insert must not have reserved "bob"
        store.create_user(user("bob")).await.unwrap();
        assert_eq!(store.count_users().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_find_by_identifier() {
        let store = MemoryStore::new();
        let alice = store.create_user(user("alice")).await.unwrap();

        let by_name = store.find_user_by_identifier("Alice").await.unwrap().unwrap();
        let by_email = store
            .find_user_by_identifier("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_name._id, alice._id);
        assert_eq!(by_email._id, alice._id);
        assert!(store.find_user_by_identifier("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_key_hash_collision_fails() {
        let store = MemoryStore::new();
        let owner = store.create_user(user("alice")).await.unwrap()._id.unwrap();

        store
            .insert_api_key(ApiKeyDoc::new("digest".into(), "ci".into(), owner))
            .await
            .unwrap();
        let err = store
            .insert_api_key(ApiKeyDoc::new("digest".into(), "other".into(), owner))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Duplicate("key_hash".into()));
    }

    #[tokio::test]
    async fn test_api_key_lookup_and_delete() {
        let store = MemoryStore::new();
        let alice = store.create_user(user("alice")).await.unwrap();
        let bob = store.create_user(user("bob")).await.unwrap();

        let key = store
            .insert_api_key(ApiKeyDoc::new("digest".into(), "ci".into(), alice._id.unwrap()))
            .await
            .unwrap();

        let found = store.find_api_key_by_hash("digest").await.unwrap().unwrap();
        assert_eq!(found.owner.id, alice.id_hex());
        assert_eq!(found.key_id, key.id_hex());

        // Wrong owner leaves the key in place
        assert!(!store.delete_api_key(&key.id_hex(), &bob.id_hex()).await.unwrap());
        assert!(store.find_api_key_by_hash("digest").await.unwrap().is_some());

        assert!(store.delete_api_key(&key.id_hex(), &alice.id_hex()).await.unwrap());
        assert!(store.find_api_key_by_hash("digest").await.unwrap().is_none());
        assert!(store.list_api_keys(&alice.id_hex()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_touch_sets_last_used() {
        let store = MemoryStore::new();
        let owner = store.create_user(user("alice")).await.unwrap()._id.unwrap();
        let key = store
            .insert_api_key(ApiKeyDoc::new("digest".into(), "ci".into(), owner))
            .await
            .unwrap();
        assert!(key.last_used_at.is_none());

        store.touch_api_key_last_used(&key.id_hex()).await.unwrap();
        let keys = store.list_api_keys(&owner.to_hex()).await.unwrap();
        assert!(keys[0].last_used_at.is_some());
    }

    #[tokio::test]
    async fn test_unparsable_ids_are_not_found() {
        let store = MemoryStore::new();
        assert!(store.find_user_by_id("not-an-id").await.unwrap().is_none());
        assert!(store.get_content("???").await.unwrap().is_none());
        assert!(!store.delete_api_key("x", "y").await.unwrap());
    }

    #[tokio::test]
    async fn test_unavailable_store_errors() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.find_user_by_id("65f000000000000000000001").await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_unavailable(false);
        assert!(store.count_users().await.is_ok());
    }

    #[tokio::test]
    async fn test_list_published_filters_and_orders() {
        let store = MemoryStore::new();
        let author = ObjectId::new();

        for (slug, tag, publish) in [
            ("first", "rust", true),
            ("second", "go", true),
            ("third", "rust", true),
            ("draft", "rust", false),
        ] {
            let mut content = ContentDoc {
                slug: slug.into(),
                title: slug.into(),
                author_id: author,
                tags: vec![tag.into()],
                ..Default::default()
            };
            if publish {
                content.set_status(ContentStatus::Published);
            }
            store.insert_content(content).await.unwrap();
        }

        let all = store
            .list_published(&ContentQuery { limit: 10, ..Default::default() })
            .await
            .unwrap();
        let slugs: Vec<&str> = all.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(slugs, vec!["third", "second", "first"]);

        let rust = store
            .list_published(&ContentQuery {
                tag: Some("rust".into()),
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(rust.len(), 2);

        let paged = store
            .list_published(&ContentQuery { limit: 1, offset: 1, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(paged[0].slug, "second");
    }

    #[tokio::test]
    async fn test_slug_rename_releases_old_slug() {
        let store = MemoryStore::new();
        let mut content = store
            .insert_content(ContentDoc {
                slug: "old".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        content.slug = "new".into();
        assert!(store.replace_content(content).await.unwrap());
        assert!(store.find_content_by_slug("old").await.unwrap().is_none());
        assert!(store.find_content_by_slug("new").await.unwrap().is_some());

        store
            .insert_content(ContentDoc {
                slug: "old".into(),
                ..Default::default()
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upsert_tags_keeps_first_name() {
        let store = MemoryStore::new();
        store
            .upsert_tags(&[TagDoc::from_name("Web Dev").unwrap()])
            .await
            .unwrap();
        store
            .upsert_tags(&[
                TagDoc::from_name("web dev").unwrap(),
                TagDoc::from_name("Async").unwrap(),
            ])
            .await
            .unwrap();

        let tags = store.list_tags().await.unwrap();
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Async", "Web Dev"]);
    }
}
