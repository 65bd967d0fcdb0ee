//! Theme document records
//!
//! One [`ThemeDocument`] per successful sync run; the [`ThemeCurrent`]
//! pointer record names the authoritative version per (tenant, theme) and is
//! written in the same transaction as the version insert.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use surrealdb::RecordId;

/// One item nested inside a component (a slide, a tab, a column)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Source-assigned stable id
    pub id: String,
    /// Raw source type string, passed through unmapped
    pub block_type: String,
    /// Arbitrary key/value settings
    #[serde(default)]
    pub settings: Map<String, Value>,
    /// Disabled blocks are emitted; filtering is the renderer's concern
    #[serde(default)]
    pub disabled: bool,
}

/// One normalized page section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Source-assigned stable id
    pub id: String,
    /// Logical type, dictionary-mapped from the raw section type with a
    /// derived PascalCase fallback
    pub component_type: String,
    #[serde(default)]
    pub settings: Map<String, Value>,
    /// Blocks in declared block order; undeclared blocks are dropped
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub disabled: bool,
}

/// Style and typography tokens extracted from top-level theme settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleTokens {
    #[serde(default)]
    pub colors: Map<String, Value>,
    #[serde(default)]
    pub typography: Map<String, Value>,
    /// Named color schemes, captured whole
    #[serde(default)]
    pub color_schemes: Map<String, Value>,
}

impl StyleTokens {
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty() && self.typography.is_empty() && self.color_schemes.is_empty()
    }
}

/// One versioned snapshot of a tenant's parsed theme
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub tenant_key: String,
    /// Source theme identifier
    pub theme_id: String,
    pub theme_name: String,
    /// 1-based, strictly increasing per (tenant, theme_id)
    pub version: u64,
    /// Home-page component tree
    pub components: Vec<Component>,
    /// Page-template name -> component list
    pub pages: BTreeMap<String, Vec<Component>>,
    pub style_tokens: StyleTokens,
    /// Raw merged source document, kept for diagnostics and replay
    pub raw_source: Value,
    /// Unix millis
    pub updated_at: i64,
}

/// Explicit current-version pointer per (tenant, theme)
///
/// Record id is the theme id, so there is exactly one pointer per theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeCurrent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub theme_id: String,
    pub version: u64,
    /// Record id of the current [`ThemeDocument`]
    pub document: RecordId,
    pub updated_at: i64,
}
