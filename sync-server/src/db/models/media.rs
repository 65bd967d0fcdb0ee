//! Media asset records
//!
//! Binary payloads live on disk under the tenant's media directory, one file
//! per checksum; the partition record keeps metadata and usage backlinks
//! only, so change-feed notifications and queries never move the binary.

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// One place a media asset is referenced from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRef {
    pub document_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
}

/// One deduplicated downloaded binary plus metadata
///
/// Uniqueness invariant: at most one record per (tenant, canonical_url).
/// Assets are never deleted by the pipeline; usage backlinks accumulate
/// across syncs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaAsset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub tenant_key: String,
    /// The reference exactly as found in the source document (may be a
    /// non-HTTP internal scheme)
    pub original_ref: String,
    /// Fully resolved, fetchable form
    pub canonical_url: String,
    pub content_type: String,
    pub byte_size: u64,
    /// SHA-256 of the payload (hex); also the on-disk blob file stem
    pub checksum: String,
    /// Relative blob path under the tenant media directory
    pub storage_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default)]
    pub usage: Vec<UsageRef>,
    #[serde(default)]
    pub created_at: i64,
}
