//! Tenant Registry Repository
//!
//! Runs against the shared registry partition. The invariant "exactly one
//! active tenant per source domain" is enforced here: registering a domain
//! again deactivates the previous holder in the same transaction.

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::Tenant;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const TABLE: &str = "tenant";

#[derive(Clone)]
pub struct TenantRepository {
    base: BaseRepository,
}

impl TenantRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find a tenant by its stable key
    pub async fn find_by_key(&self, key: &str) -> RepoResult<Option<Tenant>> {
        let tenant: Option<Tenant> = self.base.db().select((TABLE, key)).await?;
        Ok(tenant)
    }

    /// Resolve the active tenant for a source domain
    pub async fn find_by_domain(&self, domain: &str) -> RepoResult<Option<Tenant>> {
        let domain_owned = domain.to_string();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM tenant WHERE source_domain = $domain AND active = true LIMIT 1")
            .bind(("domain", domain_owned))
            .await?;
        let tenants: Vec<Tenant> = result.take(0)?;
        Ok(tenants.into_iter().next())
    }

    /// All active tenants (scheduled resync iterates these)
    pub async fn list_active(&self) -> RepoResult<Vec<Tenant>> {
        let tenants: Vec<Tenant> = self
            .base
            .db()
            .query("SELECT * FROM tenant WHERE active = true ORDER BY key")
            .await?
            .take(0)?;
        Ok(tenants)
    }

    /// Register a tenant on first successful credential validation
    ///
    /// Deactivates any previous active tenant for the same source domain so
    /// the one-active-per-domain invariant holds.
    pub async fn register(&self, tenant: Tenant) -> RepoResult<Tenant> {
        if self.find_by_key(&tenant.key).await?.is_some() {
            return Err(RepoError::Duplicate(format!(
                "Tenant '{}' already registered",
                tenant.key
            )));
        }

        let key = tenant.key.clone();
        let domain = tenant.source_domain.clone();
        let mut result = self
            .base
            .db()
            .query(
                "BEGIN; \
                 UPDATE tenant SET active = false WHERE source_domain = $domain AND active = true; \
                 CREATE type::thing('tenant', $key) CONTENT $tenant; \
                 COMMIT;",
            )
            .bind(("domain", domain))
            .bind(("key", key.clone()))
            .bind(("tenant", tenant))
            .await?;
        let created: Vec<Tenant> = result.take(1)?;
        created
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::Database(format!("Failed to register tenant '{key}'")))
    }

    /// Deactivate a tenant (tenants are never deleted)
    pub async fn deactivate(&self, key: &str) -> RepoResult<bool> {
        let key_owned = key.to_string();
        self.base
            .db()
            .query("UPDATE type::thing('tenant', $key) SET active = false")
            .bind(("key", key_owned))
            .await?;
        Ok(true)
    }
}
