//! Section/block document parsing
//!
//! Ordering semantics are a behavioral contract with the renderer:
//!
//! - Sections follow the document's declared `order`; sections present in the
//!   document but absent from `order` are appended afterwards in encounter
//!   order.
//! - Blocks follow the section's declared `block_order` ONLY. A block present
//!   in the `blocks` map but missing from `block_order` is dropped, not
//!   appended. This mirrors the source of truth exactly.
//! - Disabled sections and blocks are emitted with their flag set; filtering
//!   them is the renderer's concern.
//!
//! A malformed section never aborts the document: it degrades to an
//! `Unknown`-typed component with an empty property bag.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::db::models::{Block, Component, StyleTokens};
use crate::theme::tokens;

/// Result of parsing one merged settings document
#[derive(Debug, Clone, Default)]
pub struct ParsedTheme {
    /// Home-page component tree
    pub components: Vec<Component>,
    /// Page-template name -> component list
    pub pages: BTreeMap<String, Vec<Component>>,
    pub style_tokens: StyleTokens,
}

/// Parse a merged document: `{"settings": {...}, "pages": {name: sectionDoc}}`
///
/// Pure and deterministic. The home tree is the `index` page when present.
pub fn parse(merged: &Value) -> ParsedTheme {
    let mut pages = BTreeMap::new();
    if let Some(page_map) = merged.get("pages").and_then(Value::as_object) {
        for (name, section_doc) in page_map {
            pages.insert(name.clone(), parse_section_document(section_doc));
        }
    }

    let components = pages.get("index").cloned().unwrap_or_default();
    let style_tokens = merged
        .get("settings")
        .map(tokens::extract_style_tokens)
        .unwrap_or_default();

    ParsedTheme {
        components,
        pages,
        style_tokens,
    }
}

/// Parse one section document: `{"sections": {id: {...}}, "order": [id...]}`
pub fn parse_section_document(doc: &Value) -> Vec<Component> {
    let Some(sections) = doc.get("sections").and_then(Value::as_object) else {
        return Vec::new();
    };
    let order: Vec<&str> = doc
        .get("order")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut components = Vec::with_capacity(sections.len());

    // Declared order first; ids in `order` with no matching section are
    // skipped
    for id in &order {
        if let Some(raw) = sections.get(*id) {
            components.push(parse_section(id, raw));
        }
    }

    // Orphans: present in the document but absent from `order`, appended in
    // encounter order (the serde_json map preserves source order)
    for (id, raw) in sections {
        if !order.contains(&id.as_str()) {
            components.push(parse_section(id, raw));
        }
    }

    components
}

fn parse_section(id: &str, raw: &Value) -> Component {
    let Some(section) = raw.as_object() else {
        tracing::warn!(section = %id, "Malformed section shape, passing through as Unknown");
        return Component {
            id: id.to_string(),
            component_type: "Unknown".to_string(),
            settings: Map::new(),
            blocks: Vec::new(),
            disabled: false,
        };
    };

    let raw_type = section.get("type").and_then(Value::as_str).unwrap_or("");
    let settings = section
        .get("settings")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let disabled = section
        .get("disabled")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Component {
        id: id.to_string(),
        component_type: map_section_type(raw_type),
        settings,
        blocks: parse_blocks(section),
        disabled,
    }
}

/// Blocks in declared `block_order` only; a section with no blocks yields an
/// empty list, never null
fn parse_blocks(section: &Map<String, Value>) -> Vec<Block> {
    let Some(blocks) = section.get("blocks").and_then(Value::as_object) else {
        return Vec::new();
    };
    let Some(block_order) = section.get("block_order").and_then(Value::as_array) else {
        return Vec::new();
    };

    block_order
        .iter()
        .filter_map(Value::as_str)
        .filter_map(|block_id| {
            let raw = blocks.get(block_id)?;
            let block = raw.as_object()?;
            Some(Block {
                id: block_id.to_string(),
                block_type: block
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
                settings: block
                    .get("settings")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
                disabled: block
                    .get("disabled")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            })
        })
        .collect()
}

/// Fixed dictionary from raw section-type strings to logical component types
///
/// Unknown types fall through to a PascalCase name derived from the raw
/// string, so new upstream sections pass through instead of failing.
pub fn map_section_type(raw: &str) -> String {
    let mapped = match raw {
        "announcement-bar" => "AnnouncementBar",
        "collage" => "Collage",
        "collection-list" => "CollectionList",
        "contact-form" => "ContactForm",
        "featured-collection" => "ProductGrid",
        "featured-product" => "FeaturedProduct",
        "footer" => "Footer",
        "header" => "Header",
        "image-banner" => "HeroBanner",
        "image-with-text" => "ImageWithText",
        "main-product" => "ProductDetail",
        "multicolumn" => "ColumnList",
        "newsletter" => "Newsletter",
        "rich-text" => "RichText",
        "slideshow" => "Slideshow",
        "video" => "VideoPlayer",
        _ => return derive_pascal_case(raw),
    };
    mapped.to_string()
}

/// "custom-promo_tile" -> "CustomPromoTile"; empty input -> "Unknown"
fn derive_pascal_case(raw: &str) -> String {
    let derived: String = raw
        .split(['-', '_', ' '])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();

    if derived.is_empty() {
        "Unknown".to_string()
    } else {
        derived
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn section(kind: &str) -> Value {
        json!({ "type": kind, "settings": { "heading": "x" } })
    }

    #[test]
    fn declared_order_then_orphans() {
        let doc = json!({
            "sections": {
                "a": section("rich-text"),
                "d": section("newsletter"),
                "b": section("collage"),
                "c": section("video"),
            },
            "order": ["a", "b", "c"],
        });

        let ids: Vec<String> = parse_section_document(&doc)
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn order_ids_without_sections_are_skipped() {
        let doc = json!({
            "sections": { "a": section("rich-text") },
            "order": ["ghost", "a"],
        });

        let components = parse_section_document(&doc);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].id, "a");
    }

    #[test]
    fn undeclared_blocks_are_dropped_not_appended() {
        let doc = json!({
            "sections": {
                "slides": {
                    "type": "slideshow",
                    "blocks": {
                        "one": { "type": "slide", "settings": {} },
                        "two": { "type": "slide", "settings": {} },
                        "stray": { "type": "slide", "settings": {} },
                    },
                    "block_order": ["two", "one"],
                },
            },
            "order": ["slides"],
        });

        let components = parse_section_document(&doc);
        let block_ids: Vec<&str> = components[0].blocks.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(block_ids, vec!["two", "one"]);
    }

    #[test]
    fn section_without_blocks_yields_empty_list() {
        let doc = json!({
            "sections": { "a": section("rich-text") },
            "order": ["a"],
        });

        assert!(parse_section_document(&doc)[0].blocks.is_empty());
    }

    #[test]
    fn disabled_content_is_emitted_with_flag() {
        let doc = json!({
            "sections": {
                "a": {
                    "type": "rich-text",
                    "disabled": true,
                    "blocks": { "b": { "type": "text", "disabled": true } },
                    "block_order": ["b"],
                },
            },
            "order": ["a"],
        });

        let components = parse_section_document(&doc);
        assert!(components[0].disabled);
        assert!(components[0].blocks[0].disabled);
    }

    #[test]
    fn known_types_map_through_dictionary() {
        let doc = json!({
            "sections": {
                "hero": { "type": "image-banner", "settings": {} },
                "grid": { "type": "multicolumn", "settings": {} },
                "orphan": { "type": "footer", "settings": {} },
            },
            "order": ["hero", "grid"],
        });

        let components = parse_section_document(&doc);
        let types: Vec<&str> = components
            .iter()
            .map(|c| c.component_type.as_str())
            .collect();
        assert_eq!(types, vec!["HeroBanner", "ColumnList", "Footer"]);
    }

    #[test]
    fn unknown_types_derive_pascal_case() {
        assert_eq!(map_section_type("custom-promo-tile"), "CustomPromoTile");
        assert_eq!(map_section_type("vendor_spotlight"), "VendorSpotlight");
        assert_eq!(map_section_type(""), "Unknown");
    }

    #[test]
    fn malformed_section_degrades_to_unknown() {
        let doc = json!({
            "sections": { "weird": 42, "a": section("rich-text") },
            "order": ["weird", "a"],
        });

        let components = parse_section_document(&doc);
        assert_eq!(components[0].component_type, "Unknown");
        assert_eq!(components[1].id, "a");
    }

    #[test]
    fn merged_document_builds_page_map_and_home_tree() {
        let merged = json!({
            "settings": { "primary_color": "#112233" },
            "pages": {
                "index": { "sections": { "a": section("rich-text") }, "order": ["a"] },
                "product": { "sections": { "p": section("main-product") }, "order": ["p"] },
            },
        });

        let parsed = parse(&merged);
        assert_eq!(parsed.components.len(), 1);
        assert_eq!(parsed.pages.len(), 2);
        assert_eq!(parsed.pages["product"][0].component_type, "ProductDetail");
        assert_eq!(
            parsed.style_tokens.colors.get("primary_color").unwrap(),
            "#112233"
        );
    }
}
