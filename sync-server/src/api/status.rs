//! Theme status query
//!
//! Returns the current theme document (via the current-version pointer) and
//! the last sync status for one tenant. A registered tenant that has never
//! synced gets an empty body, not an error.

use axum::{Json, Router, extract::Path, extract::State, routing::get};
use serde::Serialize;

use crate::core::{AppResponse, AppResult, AppState, ok};
use crate::db::models::{SyncStatus, ThemeDocument};
use crate::db::repository::{StatusRepository, ThemeRepository};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/stores/{tenant}/theme", get(current_theme))
}

#[derive(Serialize)]
pub struct ThemeStatusResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<ThemeDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SyncStatus>,
}

async fn current_theme(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> AppResult<Json<AppResponse<ThemeStatusResponse>>> {
    let db = state.router.resolve_partition(&tenant).await?;
    let theme = ThemeRepository::new(db.clone()).current_latest().await?;
    let status = StatusRepository::new(db).get().await?;
    Ok(ok(ThemeStatusResponse { theme, status }))
}
