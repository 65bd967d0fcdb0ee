//! API routes
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /health | GET | Liveness and partition/subscriber counts |
//! | /api/stores/{tenant}/theme | GET | Current theme document and sync status |
//! | /api/stores/{tenant}/sync | POST | Manual sync trigger (202, coalescing) |
//! | /api/webhooks/theme-updated | POST | Source-platform webhook by domain |
//! | /api/stores/{tenant}/live | GET | Live update connection (websocket) |

use axum::Router;

use crate::core::AppState;

pub mod health;
pub mod status;
pub mod trigger;
pub mod webhook;
pub mod ws;

pub fn build_app() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(status::router())
        .merge(trigger::router())
        .merge(webhook::router())
        .merge(ws::router())
}
