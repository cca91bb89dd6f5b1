//! API Key document schema
//!
//! Only the digest of the key is stored; the raw value is never persisted.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for API keys
pub const API_KEY_COLLECTION: &str = "api_keys";

/// API Key document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ApiKeyDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata
    #[serde(default)]
    pub metadata: Metadata,

    /// SHA-256 hex digest of the raw key
    pub key_hash: String,

    /// Human-readable name for the key
    pub name: String,

    /// User ID that owns this key
    pub owner_id: ObjectId,

    /// Last time the key authenticated a request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime>,
}

impl ApiKeyDoc {
    pub fn new(key_hash: String, name: String, owner_id: ObjectId) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            key_hash,
            name,
            owner_id,
            last_used_at: None,
        }
    }

    pub fn id_hex(&self) -> String {
        self._id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

impl IntoIndexes for ApiKeyDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on key_hash; a colliding insert must fail
            (
                doc! { "key_hash": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("key_hash_unique".to_string())
                        .build(),
                ),
            ),
            // Index on owner_id for listing user's keys
            (
                doc! { "owner_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("owner_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ApiKeyDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
