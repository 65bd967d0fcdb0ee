//! Reference rewriting
//!
//! Deep-copies a settings tree, replacing internal media references with
//! their canonical CDN URLs and augmenting entity handle references
//! (`internal://products/...` and friends) with sibling `_url` / `_info`
//! keys resolved from the tenant partition. The pass is idempotent: a tree
//! that has already been rewritten comes out unchanged.

use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap};

use crate::db::models::{Component, ContentKind, ContentRecord, Tenant};
use crate::media::{INTERNAL_SCHEME, is_media_reference, resolve_reference};

/// Entity lookup used while rewriting. The live watcher swaps in a cached
/// snapshot; the orchestrator queries the partition directly.
pub trait EnrichmentSource {
    fn lookup(&self, kind: ContentKind, handle: &str) -> Option<&ContentRecord>;
}

impl EnrichmentSource for HashMap<(ContentKind, String), ContentRecord> {
    fn lookup(&self, kind: ContentKind, handle: &str) -> Option<&ContentRecord> {
        self.get(&(kind, handle.to_string()))
    }
}

/// Empty source: handles get a `_url` sibling but no `_info`
pub struct NoEnrichment;

impl EnrichmentSource for NoEnrichment {
    fn lookup(&self, _kind: ContentKind, _handle: &str) -> Option<&ContentRecord> {
        None
    }
}

pub struct RewriteContext<'a, E: EnrichmentSource> {
    pub source_domain: &'a str,
    /// raw media reference -> canonical URL, from the ingestion batch
    pub media_map: &'a BTreeMap<String, String>,
    pub enrichment: &'a E,
    pub tenant: &'a Tenant,
}

impl<'a, E: EnrichmentSource> RewriteContext<'a, E> {
    pub fn new(
        tenant: &'a Tenant,
        media_map: &'a BTreeMap<String, String>,
        enrichment: &'a E,
    ) -> Self {
        Self {
            source_domain: &tenant.source_domain,
            media_map,
            enrichment,
            tenant,
        }
    }
}

/// Rewrite one settings tree, returning a new tree
pub fn rewrite_value<E: EnrichmentSource>(value: &Value, ctx: &RewriteContext<'_, E>) -> Value {
    match value {
        Value::Object(map) => Value::Object(rewrite_object(map, ctx)),
        Value::Array(items) => Value::Array(items.iter().map(|v| rewrite_value(v, ctx)).collect()),
        Value::String(s) if is_media_reference(s) => {
            Value::String(canonical_for(s, ctx).into_owned())
        }
        other => other.clone(),
    }
}

/// Rewrite a full component tree, settings and block settings alike
pub fn rewrite_components<E: EnrichmentSource>(
    components: &[Component],
    ctx: &RewriteContext<'_, E>,
) -> Vec<Component> {
    components
        .iter()
        .map(|component| {
            let mut out = component.clone();
            out.settings = rewrite_settings(&component.settings, ctx);
            for block in &mut out.blocks {
                block.settings = rewrite_settings(&block.settings, ctx);
            }
            out
        })
        .collect()
}

fn rewrite_settings<E: EnrichmentSource>(
    settings: &Map<String, Value>,
    ctx: &RewriteContext<'_, E>,
) -> Map<String, Value> {
    rewrite_object(settings, ctx)
}

fn rewrite_object<E: EnrichmentSource>(
    map: &Map<String, Value>,
    ctx: &RewriteContext<'_, E>,
) -> Map<String, Value> {
    let mut out = Map::with_capacity(map.len());
    for (key, value) in map {
        // Siblings from a previous pass are regenerated, never duplicated
        if is_generated_sibling(key, map) {
            continue;
        }
        match value {
            Value::String(s) => {
                if let Some((kind, handle)) = parse_entity_handle(s) {
                    out.insert(key.clone(), value.clone());
                    out.insert(
                        format!("{key}_url"),
                        json!(format!(
                            "https://{}/{}/{}",
                            ctx.source_domain,
                            kind.url_segment(),
                            handle
                        )),
                    );
                    if let Some(record) = ctx.enrichment.lookup(kind, handle) {
                        out.insert(
                            format!("{key}_info"),
                            json!({
                                "title": record.title,
                                "handle": record.handle,
                                "image": record.image,
                            }),
                        );
                    }
                } else if is_media_reference(s) {
                    out.insert(
                        key.clone(),
                        Value::String(canonical_for(s, ctx).into_owned()),
                    );
                } else {
                    out.insert(key.clone(), value.clone());
                }
            }
            nested => {
                out.insert(key.clone(), rewrite_value(nested, ctx));
            }
        }
    }
    out
}

/// `{key}_url` / `{key}_info` entries whose base key still carries an entity
/// handle were produced by an earlier pass
fn is_generated_sibling(key: &str, map: &Map<String, Value>) -> bool {
    let base = match key.strip_suffix("_url").or_else(|| key.strip_suffix("_info")) {
        Some(base) => base,
        None => return false,
    };
    matches!(map.get(base), Some(Value::String(s)) if parse_entity_handle(s).is_some())
}

fn canonical_for<'a, E: EnrichmentSource>(
    raw: &'a str,
    ctx: &RewriteContext<'_, E>,
) -> std::borrow::Cow<'a, str> {
    match ctx.media_map.get(raw) {
        Some(canonical) => std::borrow::Cow::Owned(canonical.clone()),
        // Not in this batch (failed download or already canonical): resolve
        // structurally so the document never ships internal:// references
        None => std::borrow::Cow::Owned(resolve_reference(raw, ctx.tenant)),
    }
}

/// `internal://{products|collections|pages|blogs}/{handle}` -> (kind, handle)
fn parse_entity_handle(value: &str) -> Option<(ContentKind, &str)> {
    let rest = value.strip_prefix(INTERNAL_SCHEME)?;
    let (kind, handle) = rest.split_once('/')?;
    if handle.is_empty() || handle.contains('/') {
        return None;
    }
    let kind = match kind {
        "products" => ContentKind::Product,
        "collections" => ContentKind::Collection,
        "pages" => ContentKind::Page,
        "blogs" => ContentKind::BlogPost,
        _ => return None,
    };
    Some((kind, handle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> Tenant {
        Tenant::new("acme", "acme.example.com", "token")
    }

    fn media_map() -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert(
            "internal://shop_images/hero.png".to_string(),
            "https://acme.example.com/cdn/shop_images/hero.png".to_string(),
        );
        map
    }

    #[test]
    fn media_reference_replaced_from_map() {
        let tenant = tenant();
        let map = media_map();
        let ctx = RewriteContext::new(&tenant, &map, &NoEnrichment);
        let input = json!({"image": "internal://shop_images/hero.png", "label": "Hero"});
        let out = rewrite_value(&input, &ctx);
        assert_eq!(
            out["image"],
            json!("https://acme.example.com/cdn/shop_images/hero.png")
        );
        assert_eq!(out["label"], json!("Hero"));
    }

    #[test]
    fn unmapped_media_reference_resolved_structurally() {
        let tenant = tenant();
        let map = BTreeMap::new();
        let ctx = RewriteContext::new(&tenant, &map, &NoEnrichment);
        let input = json!({"video": "internal://shop_videos/clip.mp4"});
        let out = rewrite_value(&input, &ctx);
        assert_eq!(
            out["video"],
            json!("https://acme.example.com/cdn/shop_videos/clip.mp4")
        );
    }

    #[test]
    fn entity_handle_gets_url_sibling_without_enrichment() {
        let tenant = tenant();
        let map = BTreeMap::new();
        let ctx = RewriteContext::new(&tenant, &map, &NoEnrichment);
        let input = json!({"product": "internal://products/red-mug"});
        let out = rewrite_value(&input, &ctx);
        assert_eq!(out["product"], json!("internal://products/red-mug"));
        assert_eq!(
            out["product_url"],
            json!("https://acme.example.com/products/red-mug")
        );
        assert!(out.get("product_info").is_none());
    }

    #[test]
    fn entity_handle_gets_info_when_known() {
        let tenant = tenant();
        let map = BTreeMap::new();
        let mut enrichment = HashMap::new();
        enrichment.insert(
            (ContentKind::Product, "red-mug".to_string()),
            ContentRecord {
                id: None,
                handle: "red-mug".to_string(),
                title: "Red Mug".to_string(),
                image: Some("https://acme.example.com/cdn/shop_images/mug.png".to_string()),
                updated_at: 0,
            },
        );
        let ctx = RewriteContext::new(&tenant, &map, &enrichment);
        let input = json!({"featured": "internal://products/red-mug"});
        let out = rewrite_value(&input, &ctx);
        assert_eq!(out["featured_info"]["title"], json!("Red Mug"));
        assert_eq!(out["featured_info"]["handle"], json!("red-mug"));
    }

    #[test]
    fn rewrite_is_idempotent() {
        let tenant = tenant();
        let map = media_map();
        let mut enrichment = HashMap::new();
        enrichment.insert(
            (ContentKind::Collection, "summer".to_string()),
            ContentRecord {
                id: None,
                handle: "summer".to_string(),
                title: "Summer".to_string(),
                image: None,
                updated_at: 0,
            },
        );
        let ctx = RewriteContext::new(&tenant, &map, &enrichment);
        let input = json!({
            "banner": "internal://shop_images/hero.png",
            "collection": "internal://collections/summer",
            "nested": [{"link": "internal://pages/about"}],
        });
        let once = rewrite_value(&input, &ctx);
        let twice = rewrite_value(&once, &ctx);
        assert_eq!(once, twice);
    }

    #[test]
    fn unknown_internal_namespace_left_alone() {
        let tenant = tenant();
        let map = BTreeMap::new();
        let ctx = RewriteContext::new(&tenant, &map, &NoEnrichment);
        let input = json!({"ref": "internal://widgets/thing"});
        let out = rewrite_value(&input, &ctx);
        assert_eq!(out, input);
    }
}
