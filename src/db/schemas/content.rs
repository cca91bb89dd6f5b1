//! Content (article) document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for content
pub const CONTENT_COLLECTION: &str = "content";

/// Publication state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    #[default]
    Draft,
    Published,
}

/// Content document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ContentDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Unique URL key
    pub slug: String,

    pub title: String,

    pub body: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,

    pub author_id: ObjectId,

    /// Denormalized for listings
    pub author_username: String,

    /// Tag slugs
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub status: ContentStatus,

    /// Set the first time the content is published, never cleared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime>,
}

impl ContentDoc {
    pub fn id_hex(&self) -> String {
        self._id.map(|id| id.to_hex()).unwrap_or_default()
    }

    pub fn is_published(&self) -> bool {
        self.status == ContentStatus::Published
    }

    /// Change status, stamping `published_at` on first publication
    pub fn set_status(&mut self, status: ContentStatus) {
        self.status = status;
        if status == ContentStatus::Published && self.published_at.is_none() {
            self.published_at = Some(DateTime::now());
        }
    }

    /// Whether `text` occurs in the title, body or excerpt (case-insensitive)
    pub fn matches_text(&self, text: &str) -> bool {
        let needle = text.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.body.to_lowercase().contains(&needle)
            || self
                .excerpt
                .as_deref()
                .is_some_and(|e| e.to_lowercase().contains(&needle))
    }

    /// Timestamp used for listing order and sitemap `lastmod`
    pub fn last_modified(&self) -> Option<DateTime> {
        self.metadata.updated_at.or(self.published_at)
    }
}

impl IntoIndexes for ContentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "slug": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("content_slug_unique".to_string())
                        .build(),
                ),
            ),
            // Full-text search; ranking is left to MongoDB
            (
                doc! { "title": "text", "body": "text", "excerpt": "text" },
                Some(
                    IndexOptions::builder()
                        .name("content_text".to_string())
                        .weights(doc! { "title": 10, "excerpt": 5, "body": 1 })
                        .build(),
                ),
            ),
            (
                doc! { "status": 1, "published_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("status_published_at".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "tags": 1 },
                Some(IndexOptions::builder().name("tags_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for ContentDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_stamps_once() {
        let mut content = ContentDoc::default();
        assert!(!content.is_published());
        assert!(content.published_at.is_none());

        content.set_status(ContentStatus::Published);
        let first = content.published_at;
        assert!(first.is_some());

        content.set_status(ContentStatus::Draft);
        content.set_status(ContentStatus::Published);
        assert_eq!(content.published_at, first);
    }

    #[test]
    fn test_matches_text() {
        let content = ContentDoc {
            title: "Borrow Checker Basics".into(),
            body: "Lifetimes explained".into(),
            excerpt: Some("A gentle intro".into()),
            ..Default::default()
        };
        assert!(content.matches_text("borrow"));
        assert!(content.matches_text("LIFETIMES"));
        assert!(content.matches_text("gentle"));
        assert!(!content.matches_text("garbage collector"));
    }
}
