//! Source-platform webhook
//!
//! The platform announces theme publishes per domain; the domain travels in
//! the `X-Storefront-Domain` header. Unknown domains get 404 so the platform
//! stops retrying. The body is accepted but not trusted: a webhook only
//! schedules a full fetch, it never carries theme data into the pipeline.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use shared::SyncAck;

use crate::core::{AppError, AppResponse, AppResult, AppState, ok};

const DOMAIN_HEADER: &str = "x-storefront-domain";

pub fn router() -> Router<AppState> {
    Router::new().route("/api/webhooks/theme-updated", post(theme_updated))
}

async fn theme_updated(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<(StatusCode, Json<AppResponse<SyncAck>>)> {
    let domain = headers
        .get(DOMAIN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation("Missing X-Storefront-Domain header"))?;

    let tenant = state
        .router
        .resolve_tenant_by_domain(domain)
        .await?
        .ok_or_else(|| AppError::not_found(format!("No active tenant for domain '{domain}'")))?;

    tracing::info!(tenant = %tenant.key, domain = %domain, "Webhook received, scheduling sync");
    let ack = state.sync.trigger(&tenant.key, None);
    Ok((StatusCode::ACCEPTED, ok(ack)))
}
