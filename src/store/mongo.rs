//! MongoDB-backed store

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::{Collation, CollationStrength, FindOptions};
use tracing::debug;

use super::{
    ApiKeyOwner, ApiKeyStore, ContentQuery, ContentStore, CredentialStore, Store, StoreError,
    UserStore,
};
use crate::auth::{Principal, Role};
use crate::db::schemas::{
    ApiKeyDoc, ContentDoc, Metadata, TagDoc, UserDoc, API_KEY_COLLECTION, CONTENT_COLLECTION,
    TAG_COLLECTION, USER_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};

/// Store over the four lectern collections
#[derive(Clone)]
pub struct MongoStore {
    users: MongoCollection<UserDoc>,
    api_keys: MongoCollection<ApiKeyDoc>,
    content: MongoCollection<ContentDoc>,
    tags: MongoCollection<TagDoc>,
}

impl MongoStore {
    /// Connect, ping and make sure every collection has its indexes
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let client = MongoClient::new(uri, db_name).await?;

        Ok(Self {
            users: client.collection(USER_COLLECTION).await?,
            api_keys: client.collection(API_KEY_COLLECTION).await?,
            content: client.collection(CONTENT_COLLECTION).await?,
            tags: client.collection(TAG_COLLECTION).await?,
        })
    }
}

fn parse_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

fn fresh_metadata(metadata: &mut Metadata) {
    *metadata = Metadata::new();
}

#[async_trait]
impl CredentialStore for MongoStore {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<Principal>, StoreError> {
        Ok(self.get_user(id).await?.map(|user| user.to_principal()))
    }

    async fn find_api_key_by_hash(&self, digest: &str) -> Result<Option<ApiKeyOwner>, StoreError> {
        let Some(key) = self.api_keys.find_one(doc! { "key_hash": digest }).await? else {
            return Ok(None);
        };

        let Some(owner) = self.users.find_one(doc! { "_id": key.owner_id }).await? else {
            debug!(key_id = %key.id_hex(), "API key owner no longer exists");
            return Ok(None);
        };

        Ok(Some(ApiKeyOwner {
            key_id: key.id_hex(),
            name: key.name,
            owner: owner.to_principal(),
        }))
    }

    async fn touch_api_key_last_used(&self, key_id: &str) -> Result<(), StoreError> {
        let Some(id) = parse_id(key_id) else {
            return Ok(());
        };

        self.api_keys
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "last_used_at": DateTime::now() } },
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn count_users(&self) -> Result<u64, StoreError> {
        self.users.count(doc! {}).await
    }

    async fn create_user(&self, mut user: UserDoc) -> Result<UserDoc, StoreError> {
        fresh_metadata(&mut user.metadata);
        let id = self.users.insert_one(user.clone()).await?;
        user._id = Some(id);
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserDoc>, StoreError> {
        match parse_id(id) {
            Some(id) => self.users.find_one(doc! { "_id": id }).await,
            None => Ok(None),
        }
    }

    async fn find_user_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<UserDoc>, StoreError> {
        let needle = identifier.trim().to_lowercase();
        self.users
            .find_one(doc! { "$or": [ { "username": needle.as_str() }, { "email": needle.as_str() } ] })
            .await
    }

    async fn list_users(&self) -> Result<Vec<UserDoc>, StoreError> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        self.users.find_many(doc! {}, Some(options)).await
    }

    async fn set_user_role(&self, id: &str, role: Role) -> Result<Option<UserDoc>, StoreError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };

        self.users
            .update_and_fetch(
                doc! { "_id": id },
                doc! { "$set": {
                    "role": role.as_str(),
                    "metadata.updated_at": DateTime::now(),
                } },
            )
            .await
    }
}

#[async_trait]
impl ApiKeyStore for MongoStore {
    async fn insert_api_key(&self, mut key: ApiKeyDoc) -> Result<ApiKeyDoc, StoreError> {
        fresh_metadata(&mut key.metadata);
        let id = self.api_keys.insert_one(key.clone()).await?;
        key._id = Some(id);
        Ok(key)
    }

    async fn list_api_keys(&self, owner_id: &str) -> Result<Vec<ApiKeyDoc>, StoreError> {
        let Some(owner) = parse_id(owner_id) else {
            return Ok(Vec::new());
        };

        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        self.api_keys
            .find_many(doc! { "owner_id": owner }, Some(options))
            .await
    }

    async fn delete_api_key(&self, key_id: &str, owner_id: &str) -> Result<bool, StoreError> {
        let (Some(key_id), Some(owner)) = (parse_id(key_id), parse_id(owner_id)) else {
            return Ok(false);
        };

        self.api_keys
            .soft_delete(doc! { "_id": key_id, "owner_id": owner })
            .await
    }
}

#[async_trait]
impl ContentStore for MongoStore {
    async fn insert_content(&self, mut content: ContentDoc) -> Result<ContentDoc, StoreError> {
        fresh_metadata(&mut content.metadata);
        let id = self.content.insert_one(content.clone()).await?;
        content._id = Some(id);
        Ok(content)
    }

    async fn get_content(&self, id: &str) -> Result<Option<ContentDoc>, StoreError> {
        match parse_id(id) {
            Some(id) => self.content.find_one(doc! { "_id": id }).await,
            None => Ok(None),
        }
    }

    async fn find_content_by_slug(&self, slug: &str) -> Result<Option<ContentDoc>, StoreError> {
        self.content.find_one(doc! { "slug": slug }).await
    }

    async fn replace_content(&self, mut content: ContentDoc) -> Result<bool, StoreError> {
        let Some(id) = content._id else {
            return Ok(false);
        };

        content.metadata.touch();
        self.content.replace_one(doc! { "_id": id }, content).await
    }

    async fn delete_content(&self, id: &str) -> Result<bool, StoreError> {
        match parse_id(id) {
            Some(id) => self.content.delete_one(doc! { "_id": id }).await,
            None => Ok(false),
        }
    }

    async fn list_published(&self, query: &ContentQuery) -> Result<Vec<ContentDoc>, StoreError> {
        let mut filter: Document = doc! { "status": "published" };
        if let Some(tag) = &query.tag {
            filter.insert("tags", tag.as_str());
        }
        if let Some(text) = &query.text {
            filter.insert("$text", doc! { "$search": text.as_str() });
        }

        let options = FindOptions::builder()
            .sort(doc! { "published_at": -1, "_id": -1 })
            .skip(u64::from(query.offset))
            .limit(i64::from(query.limit))
            .build();

        self.content.find_many(filter, Some(options)).await
    }

    async fn upsert_tags(&self, tags: &[TagDoc]) -> Result<(), StoreError> {
        for tag in tags {
            let now = DateTime::now();
            // slug is copied from the filter on insert
            self.tags
                .upsert_one(
                    doc! { "slug": tag.slug.as_str() },
                    doc! {
                        "name": tag.name.as_str(),
                        "metadata": {
                            "is_deleted": false,
                            "created_at": now,
                            "updated_at": now,
                        },
                    },
                )
                .await?;
        }
        Ok(())
    }

    async fn list_tags(&self) -> Result<Vec<TagDoc>, StoreError> {
        let collation = Collation::builder()
            .locale("en")
            .strength(CollationStrength::Secondary)
            .build();
        let options = FindOptions::builder()
            .sort(doc! { "name": 1 })
            .collation(collation)
            .build();

        self.tags.find_many(doc! {}, Some(options)).await
    }
}

impl Store for MongoStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }
}
