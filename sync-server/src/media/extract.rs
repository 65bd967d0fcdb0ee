//! Media reference discovery
//!
//! A string value counts as a media reference when it
//! - carries the internal scheme with a media locator kind
//!   (`internal://shop_images/...`, `internal://shop_videos/...`,
//!   `internal://files/...`), or
//! - is an http(s) URL containing the CDN path fragment, or
//! - ends with a known media file extension (query/fragment stripped).
//!
//! Entity handles (`internal://products/...` etc.) are NOT media references;
//! the rewriter handles those.

use serde_json::Value;
use std::collections::BTreeSet;

use super::INTERNAL_SCHEME;
use crate::db::models::{Component, UsageRef};

/// Locator kinds under the internal scheme that name binaries
const MEDIA_KINDS: &[&str] = &["shop_images", "shop_videos", "files"];

/// CDN path fragment recognized in already-hosted URLs
const CDN_FRAGMENT: &str = "/cdn/";

const MEDIA_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".avif", ".mp4", ".webm", ".mov",
];

/// Does this string look like a media reference?
pub fn is_media_reference(value: &str) -> bool {
    if let Some(rest) = value.strip_prefix(INTERNAL_SCHEME) {
        return MEDIA_KINDS
            .iter()
            .any(|kind| rest.starts_with(&format!("{kind}/")));
    }

    if (value.starts_with("http://") || value.starts_with("https://"))
        && value.contains(CDN_FRAGMENT)
    {
        return true;
    }

    let path = value.split(['?', '#']).next().unwrap_or(value);
    let lower = path.to_ascii_lowercase();
    MEDIA_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Collect every media-looking string in an arbitrary nested structure
pub fn extract_references(value: &Value) -> BTreeSet<String> {
    let mut refs = BTreeSet::new();
    walk(value, &mut refs);
    refs
}

fn walk(value: &Value, refs: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => {
            if is_media_reference(s) {
                refs.insert(s.clone());
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, refs);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                walk(item, refs);
            }
        }
        _ => {}
    }
}

/// One discovered reference with every place it appears
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredRef {
    pub raw: String,
    pub usages: Vec<UsageRef>,
}

/// Walk a component tree, attributing each reference to the component/block
/// it lives in (usage backlinks for the asset records)
pub fn discover_component_refs(document_id: &str, components: &[Component]) -> Vec<DiscoveredRef> {
    let mut found: Vec<DiscoveredRef> = Vec::new();

    let mut record = |raw: &str, component_id: &str, block_id: Option<&str>| {
        let usage = UsageRef {
            document_id: document_id.to_string(),
            component_id: Some(component_id.to_string()),
            block_id: block_id.map(str::to_string),
        };
        match found.iter_mut().find(|d| d.raw == raw) {
            Some(existing) => existing.usages.push(usage),
            None => found.push(DiscoveredRef {
                raw: raw.to_string(),
                usages: vec![usage],
            }),
        }
    };

    for component in components {
        for raw in extract_references(&Value::Object(component.settings.clone())) {
            record(&raw, &component.id, None);
        }
        for block in &component.blocks {
            for raw in extract_references(&Value::Object(block.settings.clone())) {
                record(&raw, &component.id, Some(&block.id));
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn internal_media_kinds_match() {
        assert!(is_media_reference("internal://shop_images/logo.png"));
        assert!(is_media_reference("internal://shop_videos/intro.mp4"));
        assert!(is_media_reference("internal://files/deck.webp"));
        // Entity handles are not media
        assert!(!is_media_reference("internal://products/red-hat"));
        assert!(!is_media_reference("internal://collections/summer"));
    }

    #[test]
    fn cdn_urls_and_extensions_match() {
        assert!(is_media_reference("https://store.example/cdn/shop_images/a"));
        assert!(is_media_reference("https://elsewhere.example/x/photo.JPG"));
        assert!(is_media_reference("banner.webp?v=3"));
        assert!(!is_media_reference("https://store.example/pages/about"));
        assert!(!is_media_reference("Buy now"));
    }

    #[test]
    fn nested_structures_are_walked() {
        let doc = json!({
            "hero": { "image": "internal://shop_images/hero.png" },
            "gallery": ["https://store.example/cdn/a.jpg", { "src": "b.gif" }],
            "title": "plain text",
        });

        let refs = extract_references(&doc);
        assert_eq!(refs.len(), 3);
        assert!(refs.contains("internal://shop_images/hero.png"));
        assert!(refs.contains("b.gif"));
    }

    #[test]
    fn component_walk_attributes_usages() {
        use crate::db::models::{Block, Component};
        use serde_json::Map;

        let mut settings = Map::new();
        settings.insert("image".into(), json!("internal://shop_images/a.png"));
        let mut block_settings = Map::new();
        block_settings.insert("image".into(), json!("internal://shop_images/a.png"));

        let components = vec![Component {
            id: "hero".into(),
            component_type: "HeroBanner".into(),
            settings,
            blocks: vec![Block {
                id: "slide1".into(),
                block_type: "slide".into(),
                settings: block_settings,
                disabled: false,
            }],
            disabled: false,
        }];

        let discovered = discover_component_refs("doc1", &components);
        assert_eq!(discovered.len(), 1);
        assert_eq!(discovered[0].usages.len(), 2);
        assert_eq!(discovered[0].usages[1].block_id.as_deref(), Some("slide1"));
    }
}
