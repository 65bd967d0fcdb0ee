//! Tenant Registry & Data Router
//!
//! Resolves a tenant key to its isolated data partition: one embedded
//! RocksDB directory per tenant plus one shared registry partition for the
//! tenant table itself. Connections are opened lazily, validated, and cached
//! for the life of the process; a handle is either fully cached or absent,
//! never half-initialized.

pub mod models;
pub mod repository;

use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, RocksDb};
use tokio::sync::Mutex;

use crate::core::{AppError, AppResult};
use models::Tenant;
use repository::TenantRepository;

/// Called once per newly opened tenant partition, after the handle is cached.
/// The server uses this to spawn the change-feed watcher tasks for that
/// partition.
pub type PartitionOpenHook = Arc<dyn Fn(Tenant, Surreal<Db>) + Send + Sync>;

/// Keyed connection cache over per-tenant partitions
///
/// The only shared mutable resource in the pipeline: read-mostly, write-once
/// per tenant on first resolution. No auto-retry on failure; the caller
/// decides what a [`AppError::PartitionUnavailable`] means for its operation.
pub struct PartitionRouter {
    partitions_dir: PathBuf,
    registry: Surreal<Db>,
    partitions: DashMap<String, Surreal<Db>>,
    /// Serializes first-open; lookups never take it
    open_lock: Mutex<()>,
    open_hook: RwLock<Option<PartitionOpenHook>>,
}

impl PartitionRouter {
    /// Open the router, eagerly connecting the shared registry partition
    pub async fn open(partitions_dir: impl Into<PathBuf>) -> AppResult<Self> {
        let partitions_dir = partitions_dir.into();
        std::fs::create_dir_all(&partitions_dir)
            .map_err(|e| AppError::partition_unavailable(format!("create partitions dir: {e}")))?;

        let registry_path = partitions_dir.join("_registry");
        let registry = Surreal::new::<RocksDb>(registry_path)
            .await
            .map_err(|e| AppError::partition_unavailable(format!("open registry: {e}")))?;
        registry
            .use_ns("registry")
            .use_db("registry")
            .await
            .map_err(|e| AppError::partition_unavailable(format!("select registry: {e}")))?;

        tracing::info!(dir = %partitions_dir.display(), "Partition router ready");

        Ok(Self {
            partitions_dir,
            registry,
            partitions: DashMap::new(),
            open_lock: Mutex::new(()),
            open_hook: RwLock::new(None),
        })
    }

    /// Install the partition-open hook (before any tenant traffic)
    pub fn set_open_hook(&self, hook: PartitionOpenHook) {
        *self.open_hook.write().expect("open hook lock poisoned") = Some(hook);
    }

    /// Typed accessors over the shared registry partition
    pub fn tenants(&self) -> TenantRepository {
        TenantRepository::new(self.registry.clone())
    }

    /// Resolve a tenant key to its partition handle
    ///
    /// Idempotent and safe to call concurrently: the first call opens and
    /// validates the connection, later calls return the cached handle.
    pub async fn resolve_partition(&self, tenant_key: &str) -> AppResult<Surreal<Db>> {
        if let Some(handle) = self.partitions.get(tenant_key) {
            return Ok(handle.clone());
        }

        // First resolution for this tenant; serialize opens so exactly one
        // live connection per key ever exists
        let _guard = self.open_lock.lock().await;
        if let Some(handle) = self.partitions.get(tenant_key) {
            return Ok(handle.clone());
        }

        let tenant = self
            .tenants()
            .find_by_key(tenant_key)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Tenant '{tenant_key}' not registered")))?;
        if !tenant.active {
            return Err(AppError::validation(format!(
                "Tenant '{tenant_key}' is deactivated"
            )));
        }

        let path = self.partitions_dir.join(&tenant.partition);
        let db = Surreal::new::<RocksDb>(path).await.map_err(|e| {
            AppError::partition_unavailable(format!("open partition '{}': {e}", tenant.partition))
        })?;
        db.use_ns("tenant").use_db(&tenant.partition).await.map_err(|e| {
            AppError::partition_unavailable(format!("select partition '{}': {e}", tenant.partition))
        })?;

        self.partitions
            .insert(tenant_key.to_string(), db.clone());
        tracing::info!(tenant = %tenant_key, partition = %tenant.partition, "Opened tenant partition");

        let hook = self
            .open_hook
            .read()
            .expect("open hook lock poisoned")
            .clone();
        if let Some(hook) = hook {
            hook(tenant, db.clone());
        }

        Ok(db)
    }

    /// Resolve a source domain to its active tenant
    pub async fn resolve_tenant_by_domain(&self, domain: &str) -> AppResult<Option<Tenant>> {
        Ok(self.tenants().find_by_domain(domain).await?)
    }

    /// Tenant record by key, registry-scoped
    pub async fn resolve_tenant(&self, tenant_key: &str) -> AppResult<Tenant> {
        self.tenants()
            .find_by_key(tenant_key)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Tenant '{tenant_key}' not registered")))
    }

    /// Number of cached partition handles
    pub fn open_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Drain all cached connections for graceful shutdown
    pub async fn close_all(&self) {
        let drained = self.partitions.len();
        self.partitions.clear();
        tracing::info!(drained, "Partition router drained");
    }
}
