//! Adjacent content records (catalog + editorial)
//!
//! Written by the adjacent-content sync stages; read back by the rewriter to
//! enrich entity handles with title/image data.

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Content record kind, one table per kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Product,
    Collection,
    BlogPost,
    Page,
}

impl ContentKind {
    pub fn table(&self) -> &'static str {
        match self {
            ContentKind::Product => "product",
            ContentKind::Collection => "collection",
            ContentKind::BlogPost => "blog_post",
            ContentKind::Page => "page",
        }
    }

    /// Public URL path segment on the storefront
    pub fn url_segment(&self) -> &'static str {
        match self {
            ContentKind::Product => "products",
            ContentKind::Collection => "collections",
            ContentKind::BlogPost => "blogs",
            ContentKind::Page => "pages",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.table())
    }
}

/// One synced catalog/content record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub handle: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub updated_at: i64,
}
