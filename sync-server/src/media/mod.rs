//! Media Ingestion Pipeline
//!
//! Walks parsed trees (or any nested JSON) for embedded asset references,
//! resolves them to canonical fetch URLs under the tenant's source domain,
//! downloads and deduplicates by canonical URL within the tenant partition,
//! and hands back the rewrite map the rewriter applies.

pub mod extract;
pub mod ingest;
pub mod resolve;

pub use extract::{DiscoveredRef, discover_component_refs, extract_references, is_media_reference};
pub use ingest::{IngestOutcome, MediaIngestor};
pub use resolve::resolve_reference;

/// Scheme prefix of opaque storefront locators ("shop image"/"shop video")
pub const INTERNAL_SCHEME: &str = "internal://";
