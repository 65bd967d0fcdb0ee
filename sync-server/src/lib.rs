//! Reef Sync Server - multi-tenant storefront theme synchronization
//!
//! # Architecture
//!
//! - **Data router** (`db`): one embedded SurrealDB partition per tenant
//!   plus a shared tenant registry
//! - **Theme pipeline** (`theme`, `media`, `rewrite`): parse the remote
//!   settings dump, ingest media, rewrite references
//! - **Sync** (`sync`): orchestrated runs under a per-tenant
//!   single-flight guard
//! - **Live** (`live`): change-feed watchers and websocket fan-out
//! - **HTTP API** (`api`): status query, trigger, webhook, live connection
//!
//! # Module structure
//!
//! ```text
//! sync-server/src/
//! ├── core/          # config, state, errors, server, tasks
//! ├── db/            # partition router, models, repositories
//! ├── theme/         # settings parser, style tokens
//! ├── media/         # reference extraction, resolution, ingestion
//! ├── rewrite/       # reference rewriting and enrichment
//! ├── sync/          # remote client, orchestrator, adjacent content
//! ├── live/          # update hub, partition watchers
//! └── api/           # HTTP routes and handlers
//! ```

pub mod api;
pub mod core;
pub mod db;
pub mod live;
pub mod media;
pub mod rewrite;
pub mod sync;
pub mod theme;

pub use crate::core::{AppError, AppResponse, AppResult, AppState, Config, Server};
pub use db::PartitionRouter;
pub use live::UpdateHub;
pub use sync::SyncService;

pub fn print_banner() {
    println!(
        r#"
    ____  ____________
   / __ \/ ____/ ____/
  / /_/ / __/ / /_
 / _, _/ /___/ __/
/_/ |_/_____/_/     sync
    "#
    );
}

/// Load .env, then initialize logging from the environment
pub fn setup_environment() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    crate::core::logger::init_logger_with_file(log_level.as_deref(), log_dir.as_deref());

    Ok(())
}
