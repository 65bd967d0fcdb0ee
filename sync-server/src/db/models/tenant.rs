//! Tenant registry record
//!
//! Lives in the shared registry partition, never in a tenant partition.
//! Tenants are created on first successful credential validation for a new
//! source domain and are only ever deactivated, never deleted. At most one
//! active tenant per source domain.

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// One isolated store tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// Stable, URL-safe, globally unique key
    pub key: String,
    /// Canonical storefront domain (e.g. "store.example")
    pub source_domain: String,
    /// Partition name, maps 1:1 to an isolated RocksDB directory
    pub partition: String,
    /// Opaque access credential for the storefront API (received at the
    /// boundary; the credential exchange itself happens elsewhere)
    pub access_token: String,
    pub active: bool,
    /// Unix millis
    #[serde(default)]
    pub created_at: i64,
}

impl Tenant {
    pub fn new(
        key: impl Into<String>,
        source_domain: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        let key = key.into();
        Self {
            id: None,
            partition: key.clone(),
            key,
            source_domain: source_domain.into(),
            access_token: access_token.into(),
            active: true,
            created_at: shared::util::now_millis(),
        }
    }
}
