//! Tag document schema
//!
//! Tags are created implicitly by content writes and keyed by slug.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for tags
pub const TAG_COLLECTION: &str = "tags";

/// Tag document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TagDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Display name as first written
    pub name: String,

    /// URL-safe key
    pub slug: String,
}

impl TagDoc {
    /// Build a tag from a display name. Returns None if nothing URL-safe remains.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        let slug = slugify(name);
        if slug.is_empty() {
            return None;
        }
        Some(Self {
            _id: None,
            metadata: Metadata::new(),
            name: name.to_string(),
            slug,
        })
    }
}

/// Lowercase ASCII slug: alphanumerics kept, everything else collapsed to single dashes
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

impl IntoIndexes for TagDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "slug": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("tag_slug_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for TagDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
