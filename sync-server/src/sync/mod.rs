//! Sync pipeline
//!
//! `remote` talks to the storefront admin API, `orchestrator` runs the
//! fetch/parse/persist/ingest/rewrite pipeline under a per-tenant
//! single-flight guard, `adjacent` pulls catalog and content records used
//! for enrichment.

pub mod adjacent;
pub mod orchestrator;
pub mod remote;

pub use orchestrator::{SyncService, SyncSummary};
pub use remote::StorefrontClient;
