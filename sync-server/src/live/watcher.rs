//! Partition change-feed watchers
//!
//! One watcher pair per open partition, spawned from the partition-open
//! hook: a live query on theme documents and one on media assets. A theme
//! notification is re-run through the rewriter against the partition's
//! current media and enrichment state before it goes out, so live clients
//! always see canonical references; media notifications carry metadata
//! only. A broken feed is re-established with exponential backoff; after
//! the retry budget is spent the watcher stops and logs, it never takes
//! the partition down with it.

use futures::StreamExt;
use serde_json::json;
use std::time::Duration;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use tokio_util::sync::CancellationToken;

use shared::{OperationKind, UpdateFrame};
use std::sync::Arc;

use crate::core::AppResult;
use crate::db::models::{MediaAsset, Tenant, ThemeDocument};
use crate::db::repository::{ContentRepository, MediaRepository};
use crate::live::UpdateHub;
use crate::rewrite::{RewriteContext, rewrite_components};

const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);
const MAX_RETRIES: u32 = 5;

/// Spawn the theme and media watchers for one partition
pub fn spawn_partition_watchers(
    tenant: Tenant,
    db: Surreal<Db>,
    hub: Arc<UpdateHub>,
    shutdown: CancellationToken,
) {
    {
        let tenant = tenant.clone();
        let db = db.clone();
        let hub = Arc::clone(&hub);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            watch_themes(tenant, db, hub, shutdown).await;
        });
    }
    tokio::spawn(async move {
        watch_media(tenant.key, db, hub, shutdown).await;
    });
}

async fn watch_themes(
    tenant: Tenant,
    db: Surreal<Db>,
    hub: Arc<UpdateHub>,
    shutdown: CancellationToken,
) {
    let tenant_key = tenant.key.clone();
    let mut delay = INITIAL_RETRY_DELAY;
    let mut attempts = 0u32;

    loop {
        let stream = match db.select::<Vec<ThemeDocument>>("theme_document").live().await {
            Ok(stream) => stream,
            Err(e) => {
                attempts += 1;
                if attempts >= MAX_RETRIES {
                    tracing::error!(
                        tenant = %tenant_key,
                        error = %e,
                        "Theme feed could not be established, watcher stopped"
                    );
                    return;
                }
                tracing::warn!(
                    tenant = %tenant_key,
                    attempt = attempts,
                    delay_secs = delay.as_secs(),
                    error = %e,
                    "Theme feed failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(MAX_RETRY_DELAY);
                continue;
            }
        };

        tracing::debug!(tenant = %tenant_key, "Theme feed established");
        let mut stream = stream;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!(tenant = %tenant_key, "Theme watcher shutting down");
                    return;
                }
                notification = stream.next() => {
                    match notification {
                        Some(Ok(notification)) => {
                            // A healthy feed resets the retry budget
                            attempts = 0;
                            delay = INITIAL_RETRY_DELAY;
                            let Some(operation) = operation_from(&notification.action) else {
                                continue;
                            };
                            let doc: ThemeDocument = notification.data;
                            let data = match theme_frame_data(&tenant, &db, &doc).await {
                                Ok(data) => data,
                                Err(e) => {
                                    // Degrade to metadata rather than drop the frame
                                    tracing::warn!(
                                        tenant = %tenant_key,
                                        error = %e,
                                        "Rewrite for live frame failed, sending metadata only"
                                    );
                                    json!({
                                        "theme_id": doc.theme_id,
                                        "theme_name": doc.theme_name,
                                        "version": doc.version,
                                        "updated_at": doc.updated_at,
                                    })
                                }
                            };
                            hub.broadcast(
                                &tenant_key,
                                UpdateFrame::theme_update(tenant_key.clone(), operation, data),
                            );
                        }
                        Some(Err(e)) => {
                            tracing::warn!(tenant = %tenant_key, error = %e, "Theme feed error, re-establishing");
                            break;
                        }
                        None => {
                            tracing::warn!(tenant = %tenant_key, "Theme feed closed, re-establishing");
                            break;
                        }
                    }
                }
            }
        }

        attempts += 1;
        if attempts >= MAX_RETRIES {
            tracing::error!(tenant = %tenant_key, "Theme feed retry budget spent, watcher stopped");
            return;
        }
        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(MAX_RETRY_DELAY);
    }
}

/// Build the payload for a theme frame: the stored trees pushed through the
/// rewriter once more, against whatever media and enrichment state the
/// partition holds right now
async fn theme_frame_data(
    tenant: &Tenant,
    db: &Surreal<Db>,
    doc: &ThemeDocument,
) -> AppResult<serde_json::Value> {
    let media_map = MediaRepository::new(db.clone()).rewrite_map().await?;
    let enrichment = ContentRepository::new(db.clone()).enrichment_map().await?;
    let ctx = RewriteContext::new(tenant, &media_map, &enrichment);

    let components = rewrite_components(&doc.components, &ctx);
    let pages: std::collections::BTreeMap<_, _> = doc
        .pages
        .iter()
        .map(|(name, comps)| (name.clone(), rewrite_components(comps, &ctx)))
        .collect();

    Ok(json!({
        "theme_id": doc.theme_id,
        "theme_name": doc.theme_name,
        "version": doc.version,
        "updated_at": doc.updated_at,
        "components": components,
        "pages": pages,
        "style_tokens": doc.style_tokens,
    }))
}

async fn watch_media(
    tenant_key: String,
    db: Surreal<Db>,
    hub: Arc<UpdateHub>,
    shutdown: CancellationToken,
) {
    let mut delay = INITIAL_RETRY_DELAY;
    let mut attempts = 0u32;

    loop {
        let stream = match db.select::<Vec<MediaAsset>>("media_asset").live().await {
            Ok(stream) => stream,
            Err(e) => {
                attempts += 1;
                if attempts >= MAX_RETRIES {
                    tracing::error!(
                        tenant = %tenant_key,
                        error = %e,
                        "Media feed could not be established, watcher stopped"
                    );
                    return;
                }
                tracing::warn!(
                    tenant = %tenant_key,
                    attempt = attempts,
                    delay_secs = delay.as_secs(),
                    error = %e,
                    "Media feed failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(MAX_RETRY_DELAY);
                continue;
            }
        };

        tracing::debug!(tenant = %tenant_key, "Media feed established");
        let mut stream = stream;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!(tenant = %tenant_key, "Media watcher shutting down");
                    return;
                }
                notification = stream.next() => {
                    match notification {
                        Some(Ok(notification)) => {
                            attempts = 0;
                            delay = INITIAL_RETRY_DELAY;
                            let Some(operation) = operation_from(&notification.action) else {
                                continue;
                            };
                            let asset: MediaAsset = notification.data;
                            // Metadata only, never the binary
                            hub.broadcast(
                                &tenant_key,
                                UpdateFrame::media_update(
                                    tenant_key.clone(),
                                    operation,
                                    json!({
                                        "canonical_url": asset.canonical_url,
                                        "content_type": asset.content_type,
                                        "checksum": asset.checksum,
                                        "byte_size": asset.byte_size,
                                        "width": asset.width,
                                        "height": asset.height,
                                    }),
                                ),
                            );
                        }
                        Some(Err(e)) => {
                            tracing::warn!(tenant = %tenant_key, error = %e, "Media feed error, re-establishing");
                            break;
                        }
                        None => {
                            tracing::warn!(tenant = %tenant_key, "Media feed closed, re-establishing");
                            break;
                        }
                    }
                }
            }
        }

        attempts += 1;
        if attempts >= MAX_RETRIES {
            tracing::error!(tenant = %tenant_key, "Media feed retry budget spent, watcher stopped");
            return;
        }
        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(MAX_RETRY_DELAY);
    }
}

fn operation_from(action: &surrealdb::Action) -> Option<OperationKind> {
    match action {
        surrealdb::Action::Create => Some(OperationKind::Create),
        surrealdb::Action::Update => Some(OperationKind::Update),
        surrealdb::Action::Delete => Some(OperationKind::Delete),
        _ => None,
    }
}
