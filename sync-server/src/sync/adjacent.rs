//! Adjacent catalog and content sync
//!
//! Pulls products, collections, blog posts and pages after a theme sync so
//! enrichment lookups resolve. Each subsystem fails independently: a broken
//! catalog endpoint never rolls back the already-persisted theme version,
//! it is logged and counted as zero.

use serde_json::Value;

use super::remote::StorefrontClient;
use crate::db::models::{ContentKind, ContentRecord};
use crate::db::repository::ContentRepository;

/// Records upserted per subsystem during one sync run
#[derive(Debug, Clone, Copy, Default)]
pub struct AdjacentCounts {
    pub products: usize,
    pub collections: usize,
    pub blog_posts: usize,
    pub pages: usize,
}

pub async fn sync_adjacent(
    tenant_key: &str,
    client: &StorefrontClient,
    repo: &ContentRepository,
) -> AdjacentCounts {
    let mut counts = AdjacentCounts::default();
    counts.products = sync_kind(tenant_key, ContentKind::Product, client.products().await, repo).await;
    counts.collections = sync_kind(
        tenant_key,
        ContentKind::Collection,
        client.collections().await,
        repo,
    )
    .await;
    counts.blog_posts = sync_kind(
        tenant_key,
        ContentKind::BlogPost,
        client.blog_posts().await,
        repo,
    )
    .await;
    counts.pages = sync_kind(tenant_key, ContentKind::Page, client.pages().await, repo).await;
    counts
}

async fn sync_kind(
    tenant_key: &str,
    kind: ContentKind,
    fetched: crate::core::AppResult<Vec<Value>>,
    repo: &ContentRepository,
) -> usize {
    let items = match fetched {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(
                tenant = %tenant_key,
                kind = ?kind,
                error = %e,
                "Adjacent fetch failed, keeping previous records"
            );
            return 0;
        }
    };

    let mut upserted = 0;
    for item in items {
        let record = match record_from(&item) {
            Some(record) => record,
            None => {
                tracing::warn!(tenant = %tenant_key, kind = ?kind, "Skipping record without handle");
                continue;
            }
        };
        match repo.upsert(kind, record).await {
            Ok(_) => upserted += 1,
            Err(e) => {
                tracing::warn!(tenant = %tenant_key, kind = ?kind, error = %e, "Upsert failed");
            }
        }
    }
    upserted
}

/// Minimal projection of a remote item; records without a handle cannot be
/// referenced from a theme and are skipped
fn record_from(item: &Value) -> Option<ContentRecord> {
    let handle = item.get("handle")?.as_str()?.to_string();
    if handle.is_empty() {
        return None;
    }
    let title = item
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or(&handle)
        .to_string();
    let image = item
        .get("image")
        .and_then(|img| img.get("src"))
        .or_else(|| {
            item.get("images")
                .and_then(|imgs| imgs.get(0))
                .and_then(|img| img.get("src"))
        })
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(ContentRecord {
        id: None,
        handle,
        title,
        image,
        updated_at: shared::util::now_millis(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_projection_prefers_direct_image() {
        let item = json!({
            "handle": "red-mug",
            "title": "Red Mug",
            "image": {"src": "https://x/cdn/a.png"},
            "images": [{"src": "https://x/cdn/b.png"}],
        });
        let record = record_from(&item).unwrap();
        assert_eq!(record.image.as_deref(), Some("https://x/cdn/a.png"));
    }

    #[test]
    fn record_without_handle_is_skipped() {
        assert!(record_from(&json!({"title": "No handle"})).is_none());
    }

    #[test]
    fn title_falls_back_to_handle() {
        let record = record_from(&json!({"handle": "about-us"})).unwrap();
        assert_eq!(record.title, "about-us");
    }
}
