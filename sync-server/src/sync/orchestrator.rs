//! Sync orchestrator
//!
//! One run per tenant at a time: a trigger that lands while a run is in
//! flight is coalesced into it and acknowledged as such. A run fetches the
//! remote theme, parses it, persists a new version under the current-version
//! pointer, ingests media, rewrites references into the stored trees,
//! refreshes adjacent content and pushes a theme frame to live clients. A
//! fetch failure aborts before anything is written, leaving the prior
//! version authoritative.

use dashmap::DashMap;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};

use shared::{OperationKind, SyncAck, UpdateFrame};

use super::adjacent::{AdjacentCounts, sync_adjacent};
use super::remote::StorefrontClient;
use crate::core::{AppError, AppResult, Config};
use crate::db::PartitionRouter;
use crate::db::models::{SyncStatus, Tenant, ThemeDocument};
use crate::db::repository::{
    ContentRepository, MediaRepository, StatusRepository, ThemeRepository,
};
use crate::live::UpdateHub;
use crate::media::extract::{DiscoveredRef, discover_component_refs};
use crate::media::ingest::{IngestOutcome, MediaIngestor};
use crate::rewrite::{RewriteContext, rewrite_components};
use crate::theme;

/// Page templates fetched on every run; absent templates are skipped
const PAGE_TEMPLATES: &[&str] = &["index", "product", "collection", "page", "blog", "cart"];

/// Shared section groups merged into every page tree
const HEADER_GROUP_ASSET: &str = "sections/header-group.json";
const FOOTER_GROUP_ASSET: &str = "sections/footer-group.json";

/// Navigation menus carried alongside the theme document
const MENU_HANDLES: &[&str] = &["main-menu", "footer"];

/// Outcome of one completed run
#[derive(Debug, Clone)]
pub struct SyncSummary {
    pub tenant_key: String,
    pub theme_id: String,
    pub version: u64,
    pub media: IngestOutcome,
    pub adjacent: AdjacentCounts,
    pub elapsed: Duration,
}

pub struct SyncService {
    config: Arc<Config>,
    router: Arc<PartitionRouter>,
    hub: Arc<UpdateHub>,
    http: reqwest::Client,
    in_flight: Arc<DashMap<String, ()>>,
}

/// RAII single-flight permit; dropping it releases the tenant slot
struct SyncPermit {
    in_flight: Arc<DashMap<String, ()>>,
    tenant_key: String,
}

impl Drop for SyncPermit {
    fn drop(&mut self) {
        self.in_flight.remove(&self.tenant_key);
    }
}

impl SyncService {
    pub fn new(
        config: Arc<Config>,
        router: Arc<PartitionRouter>,
        hub: Arc<UpdateHub>,
    ) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.fetch_timeout_ms))
            .build()
            .map_err(|e| AppError::internal(format!("build http client: {e}")))?;
        Ok(Self {
            config,
            router,
            hub,
            http,
            in_flight: Arc::new(DashMap::new()),
        })
    }

    /// Fire-and-forget trigger; the ack reports whether a run was started or
    /// an in-flight run absorbed the request. A `theme_id` pins the run to
    /// that theme instead of whatever the storefront reports as active.
    pub fn trigger(self: &Arc<Self>, tenant_key: &str, theme_id: Option<String>) -> SyncAck {
        let Some(permit) = self.try_acquire(tenant_key) else {
            tracing::info!(tenant = %tenant_key, "Sync already running, coalescing trigger");
            return SyncAck {
                accepted: false,
                already_running: true,
                tenant_key: tenant_key.to_string(),
            };
        };

        let service = Arc::clone(self);
        let key = tenant_key.to_string();
        tokio::spawn(async move {
            let _permit = permit;
            match service.run(&key, theme_id).await {
                Ok(summary) => {
                    tracing::info!(
                        tenant = %summary.tenant_key,
                        theme = %summary.theme_id,
                        version = summary.version,
                        media_ingested = summary.media.ingested,
                        media_deduplicated = summary.media.deduplicated,
                        media_failed = summary.media.failed,
                        elapsed_ms = summary.elapsed.as_millis() as u64,
                        "Sync run complete"
                    );
                }
                Err(e) => {
                    tracing::error!(tenant = %key, error = %e, "Sync run failed");
                }
            }
        });

        SyncAck {
            accepted: true,
            already_running: false,
            tenant_key: tenant_key.to_string(),
        }
    }

    /// Run synchronously, still under the single-flight guard (scheduled
    /// runs and tests use this; the HTTP trigger goes through [`Self::trigger`])
    pub async fn run_guarded(
        &self,
        tenant_key: &str,
        theme_id: Option<String>,
    ) -> AppResult<Option<SyncSummary>> {
        let Some(_permit) = self.try_acquire(tenant_key) else {
            return Ok(None);
        };
        self.run(tenant_key, theme_id).await.map(Some)
    }

    fn try_acquire(&self, tenant_key: &str) -> Option<SyncPermit> {
        use dashmap::mapref::entry::Entry;
        match self.in_flight.entry(tenant_key.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(SyncPermit {
                    in_flight: Arc::clone(&self.in_flight),
                    tenant_key: tenant_key.to_string(),
                })
            }
        }
    }

    async fn run(&self, tenant_key: &str, theme_id: Option<String>) -> AppResult<SyncSummary> {
        let started = Instant::now();
        let tenant = self.router.resolve_tenant(tenant_key).await?;
        let db = self.router.resolve_partition(tenant_key).await?;

        let theme_repo = ThemeRepository::new(db.clone());
        let media_repo = MediaRepository::new(db.clone());
        let content_repo = ContentRepository::new(db.clone());
        let status_repo = StatusRepository::new(db);

        let result = self
            .run_pipeline(&tenant, theme_id, &theme_repo, &media_repo, &content_repo)
            .await;

        // The status record reflects every attempt, failed ones included
        let status = match &result {
            Ok(summary) => SyncStatus {
                id: None,
                synced: true,
                last_sync: shared::util::now_millis(),
                reason: None,
                version: Some(summary.version),
                media_ingested: summary.media.ingested,
                media_deduplicated: summary.media.deduplicated,
                media_failed: summary.media.failed,
                products: summary.adjacent.products,
                collections: summary.adjacent.collections,
                blog_posts: summary.adjacent.blog_posts,
                pages: summary.adjacent.pages,
            },
            Err(e) => {
                let previous = status_repo.get().await.ok().flatten().unwrap_or_default();
                SyncStatus {
                    id: None,
                    synced: false,
                    last_sync: shared::util::now_millis(),
                    reason: Some(e.to_string()),
                    // Prior version and counters stay visible through failures
                    ..previous
                }
            }
        };
        if let Err(e) = status_repo.put(status).await {
            tracing::error!(tenant = %tenant_key, error = %e, "Failed to persist sync status");
        }

        let mut summary = result?;
        summary.elapsed = started.elapsed();
        Ok(summary)
    }

    async fn run_pipeline(
        &self,
        tenant: &Tenant,
        pinned_theme: Option<String>,
        theme_repo: &ThemeRepository,
        media_repo: &MediaRepository,
        content_repo: &ContentRepository,
    ) -> AppResult<SyncSummary> {
        let client = StorefrontClient::new(
            self.http.clone(),
            tenant,
            Duration::from_millis(self.config.fetch_timeout_ms),
        );

        // ========== Fetch ==========
        let theme_meta = match &pinned_theme {
            Some(id) => client.theme(id).await?,
            None => client.active_theme().await?,
        };
        let theme_id = theme_meta
            .get("id")
            .map(|id| match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .filter(|id| !id.is_empty())
            .or(pinned_theme)
            .ok_or_else(|| AppError::remote_fetch("active theme without id"))?;
        let theme_name = theme_meta
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("Unnamed")
            .to_string();

        let (settings, header_group, footer_group, main_menu, footer_menu) = tokio::try_join!(
            client.settings(&theme_id),
            client.asset(&theme_id, HEADER_GROUP_ASSET),
            client.asset(&theme_id, FOOTER_GROUP_ASSET),
            client.menu(MENU_HANDLES[0]),
            client.menu(MENU_HANDLES[1]),
        )?;

        let mut templates: Vec<(String, Value)> = Vec::with_capacity(PAGE_TEMPLATES.len());
        for name in PAGE_TEMPLATES {
            if let Some(doc) = client.template(&theme_id, name).await? {
                templates.push((name.to_string(), doc));
            }
        }
        if templates.is_empty() {
            return Err(AppError::remote_fetch(format!(
                "theme '{theme_id}' has no page templates"
            )));
        }

        let menus = [
            (MENU_HANDLES[0], main_menu),
            (MENU_HANDLES[1], footer_menu),
        ];
        let merged = merge_sections(settings, &templates, header_group, footer_group, &menus);

        // ========== Parse and persist ==========
        let parsed = theme::parse(&merged);
        ensure_renderable(&parsed)?;
        let version = theme_repo.next_version(&theme_id).await?;
        let document = ThemeDocument {
            id: None,
            tenant_key: tenant.key.clone(),
            theme_id: theme_id.clone(),
            theme_name,
            version,
            components: parsed.components.clone(),
            pages: parsed.pages.clone(),
            style_tokens: parsed.style_tokens,
            raw_source: merged,
            updated_at: shared::util::now_millis(),
        };
        let persisted = theme_repo.persist_version(document).await?;
        let document_id = format!("{theme_id}_{version}");

        // ========== Media ingestion ==========
        let mut refs: Vec<DiscoveredRef> = Vec::new();
        for (_, components) in &parsed.pages {
            merge_refs(&mut refs, discover_component_refs(&document_id, components));
        }
        let ingestor = MediaIngestor::new(
            self.http.clone(),
            media_repo.clone(),
            tenant.clone(),
            self.config.media_dir(),
            Duration::from_millis(self.config.download_timeout_ms),
            self.config.media_concurrency,
        );
        let media = ingestor.ingest_batch(refs).await;

        // ========== Rewrite and store the final trees ==========
        // Prior assets cover references whose re-download failed this run.
        // Enrichment is the partition's pre-run content state; the change
        // feed re-rewrite refreshes frames once adjacent content lands.
        let enrichment = content_repo.enrichment_map().await?;
        let mut rewrite_map = media_repo.rewrite_map().await?;
        rewrite_map.extend(media.rewrite_map.clone());
        let ctx = RewriteContext::new(tenant, &rewrite_map, &enrichment);
        let components = rewrite_components(&parsed.components, &ctx);
        let pages = parsed
            .pages
            .iter()
            .map(|(name, comps)| (name.clone(), rewrite_components(comps, &ctx)))
            .collect();
        if let Some(record) = persisted.id.clone() {
            theme_repo.update_trees(record, &components, &pages).await?;
        }

        // ========== Adjacent content ==========
        let adjacent = sync_adjacent(&tenant.key, &client, content_repo).await;

        // ========== Notify ==========
        self.hub.broadcast(
            &tenant.key,
            UpdateFrame::theme_update(
                tenant.key.clone(),
                if version == 1 {
                    OperationKind::Create
                } else {
                    OperationKind::Update
                },
                json!({ "theme_id": theme_id, "version": version }),
            ),
        );

        Ok(SyncSummary {
            tenant_key: tenant.key.clone(),
            theme_id,
            version,
            media,
            adjacent,
            elapsed: Duration::ZERO,
        })
    }
}

/// Assemble the merged document the parser consumes
///
/// Every page tree carries the shared header group first and the footer
/// group last, around the page's own declared order. Navigation menus ride
/// along under `menus` so they land in the stored raw source.
fn merge_sections(
    settings: Value,
    templates: &[(String, Value)],
    header_group: Option<Value>,
    footer_group: Option<Value>,
    menus: &[(&str, Option<Value>)],
) -> Value {
    let mut pages = Map::new();
    for (name, doc) in templates {
        pages.insert(
            name.clone(),
            merge_page(doc, header_group.as_ref(), footer_group.as_ref()),
        );
    }
    let mut menu_map = Map::new();
    for (handle, menu) in menus {
        if let Some(menu) = menu {
            menu_map.insert(handle.to_string(), menu.clone());
        }
    }
    json!({ "settings": settings, "pages": pages, "menus": menu_map })
}

fn merge_page(doc: &Value, header_group: Option<&Value>, footer_group: Option<&Value>) -> Value {
    let mut sections = Map::new();
    let mut order: Vec<Value> = Vec::new();

    let mut absorb = |group: &Value| {
        if let Some(group_sections) = group.get("sections").and_then(Value::as_object) {
            for (id, section) in group_sections {
                sections.insert(id.clone(), section.clone());
            }
        }
        if let Some(group_order) = group.get("order").and_then(Value::as_array) {
            order.extend(group_order.iter().cloned());
        }
    };

    if let Some(header) = header_group {
        absorb(header);
    }
    absorb(doc);
    if let Some(footer) = footer_group {
        absorb(footer);
    }

    json!({ "sections": sections, "order": order })
}

/// A document that parses to zero components everywhere is junk input, not
/// a theme; abort before a version of it is persisted
fn ensure_renderable(parsed: &theme::ParsedTheme) -> AppResult<()> {
    if parsed.components.is_empty() && parsed.pages.values().all(Vec::is_empty) {
        return Err(AppError::parse_anomaly(
            "document contains no renderable components",
        ));
    }
    Ok(())
}

fn merge_refs(into: &mut Vec<DiscoveredRef>, found: Vec<DiscoveredRef>) {
    for discovered in found {
        match into.iter_mut().find(|d| d.raw == discovered.raw) {
            Some(existing) => existing.usages.extend(discovered.usages),
            None => into.push(discovered),
        }
    }
}
