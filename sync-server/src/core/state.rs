//! Application state
//!
//! [`AppState`] holds shared references to every service; cloning it is an
//! `Arc` bump per field. Partition watchers are installed through the
//! router's open hook before any tenant traffic, so every partition ever
//! opened gets its change-feed watchers.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{AppError, AppResult, Config};
use crate::db::PartitionRouter;
use crate::live::{UpdateHub, watcher::spawn_partition_watchers};
use crate::sync::SyncService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub router: Arc<PartitionRouter>,
    pub hub: Arc<UpdateHub>,
    pub sync: Arc<SyncService>,
    tasks: Arc<Mutex<BackgroundTasks>>,
}

impl AppState {
    pub async fn initialize(config: Config) -> AppResult<Self> {
        config
            .ensure_work_dir_structure()
            .map_err(|e| AppError::internal(format!("prepare work dir: {e}")))?;

        let config = Arc::new(config);
        let router = Arc::new(PartitionRouter::open(config.partitions_dir()).await?);
        let hub = Arc::new(UpdateHub::new());
        let sync = Arc::new(SyncService::new(
            Arc::clone(&config),
            Arc::clone(&router),
            Arc::clone(&hub),
        )?);

        let tasks = Arc::new(Mutex::new(BackgroundTasks::new()));
        let shutdown = tasks.lock().await.shutdown_token();

        // Every partition open spawns its change-feed watchers
        {
            let hub = Arc::clone(&hub);
            router.set_open_hook(Arc::new(move |tenant, db| {
                spawn_partition_watchers(tenant, db, Arc::clone(&hub), shutdown.clone());
            }));
        }

        Ok(Self {
            config,
            router,
            hub,
            sync,
            tasks,
        })
    }

    /// Spawn long-running tasks (call once, after initialize)
    pub async fn start_background_tasks(&self) {
        let mut tasks = self.tasks.lock().await;
        let shutdown = tasks.shutdown_token();

        if self.config.sync_interval_secs > 0 {
            let interval = self.config.sync_interval_secs;
            let router = Arc::clone(&self.router);
            let sync = Arc::clone(&self.sync);
            tasks.spawn("scheduled_sync", TaskKind::Periodic, async move {
                run_scheduled_sync(router, sync, interval, shutdown).await;
            });
        }
    }

    pub async fn shutdown(&self) {
        self.tasks.lock().await.shutdown().await;
        self.router.close_all().await;
    }
}

/// Periodic full resync across every active tenant
async fn run_scheduled_sync(
    router: Arc<PartitionRouter>,
    sync: Arc<SyncService>,
    interval_secs: u64,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
    ticker.tick().await; // skip immediate tick

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Scheduled sync shutting down");
                break;
            }
            _ = ticker.tick() => {
                let tenants = match router.tenants().list_active().await {
                    Ok(tenants) => tenants,
                    Err(e) => {
                        tracing::error!(error = %e, "Could not list tenants for scheduled sync");
                        continue;
                    }
                };
                for tenant in tenants {
                    // Coalesced when a run is already in flight
                    match sync.run_guarded(&tenant.key, None).await {
                        Ok(Some(_)) => {}
                        Ok(None) => {
                            tracing::debug!(tenant = %tenant.key, "Scheduled sync skipped, run in flight");
                        }
                        Err(e) => {
                            tracing::error!(tenant = %tenant.key, error = %e, "Scheduled sync failed");
                        }
                    }
                }
            }
        }
    }
}
