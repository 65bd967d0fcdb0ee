//! Manual sync trigger
//!
//! Returns 202 immediately; the run itself is observable via the status
//! query or the live connection. A trigger during an in-flight run is
//! coalesced and acknowledged with `already_running`.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};
use serde::Deserialize;
use shared::SyncAck;

use crate::core::{AppResponse, AppResult, AppState, ok};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/stores/{tenant}/sync", post(trigger_sync))
}

#[derive(Debug, Deserialize)]
struct TriggerRequest {
    /// Sync this theme instead of the storefront's active one
    theme_id: Option<String>,
}

async fn trigger_sync(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    body: Option<Json<TriggerRequest>>,
) -> AppResult<(StatusCode, Json<AppResponse<SyncAck>>)> {
    // Unknown or deactivated tenants fail here, before a run is spawned
    state.router.resolve_partition(&tenant).await?;
    let theme_id = body.and_then(|Json(req)| req.theme_id);
    let ack = state.sync.trigger(&tenant, theme_id);
    Ok((StatusCode::ACCEPTED, ok(ack)))
}
