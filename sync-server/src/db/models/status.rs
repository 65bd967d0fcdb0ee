//! Per-tenant sync status record
//!
//! A single record per partition, overwritten at the end of every sync run.
//! The status query surface reads this; the live-push surface never carries
//! error information.

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub synced: bool,
    /// Unix millis of the last attempted sync
    pub last_sync: i64,
    /// Human-readable reason on partial or total failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Theme version persisted by the last successful run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default)]
    pub media_ingested: usize,
    #[serde(default)]
    pub media_deduplicated: usize,
    #[serde(default)]
    pub media_failed: usize,
    #[serde(default)]
    pub products: usize,
    #[serde(default)]
    pub collections: usize,
    #[serde(default)]
    pub blog_posts: usize,
    #[serde(default)]
    pub pages: usize,
}
