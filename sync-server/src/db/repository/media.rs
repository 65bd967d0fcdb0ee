//! Media Asset Repository
//!
//! Dedup lookup is by canonical URL; the partition itself provides the
//! tenant scope, so (tenant, canonical_url) uniqueness falls out of the
//! router's isolation.

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{MediaAsset, UsageRef};
use std::collections::BTreeMap;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const TABLE: &str = "media_asset";

#[derive(Clone)]
pub struct MediaRepository {
    base: BaseRepository,
}

impl MediaRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Look up an asset by its canonical URL
    pub async fn find_by_canonical(&self, canonical_url: &str) -> RepoResult<Option<MediaAsset>> {
        let url_owned = canonical_url.to_string();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM media_asset WHERE canonical_url = $url LIMIT 1")
            .bind(("url", url_owned))
            .await?;
        let assets: Vec<MediaAsset> = result.take(0)?;
        Ok(assets.into_iter().next())
    }

    /// Persist a freshly downloaded asset
    pub async fn insert(&self, asset: MediaAsset) -> RepoResult<MediaAsset> {
        let canonical = asset.canonical_url.clone();
        let created: Option<MediaAsset> = self.base.db().create(TABLE).content(asset).await?;
        created.ok_or_else(|| {
            RepoError::Database(format!("Failed to persist media asset for '{canonical}'"))
        })
    }

    /// Append usage backlinks to an existing asset (no re-download path)
    ///
    /// Backlinks accumulate across syncs; stale entries are not pruned.
    pub async fn append_usage(
        &self,
        asset: surrealdb::RecordId,
        usages: Vec<UsageRef>,
    ) -> RepoResult<()> {
        self.base
            .db()
            .query("UPDATE $asset SET usage += $usages")
            .bind(("asset", asset))
            .bind(("usages", usages))
            .await?;
        Ok(())
    }

    /// original_ref -> canonical_url for every asset in the partition
    ///
    /// This is the rewrite map the rewriter consults when re-applying after
    /// a change-feed notification, without re-downloading anything.
    pub async fn rewrite_map(&self) -> RepoResult<BTreeMap<String, String>> {
        let assets: Vec<MediaAsset> = self.base.db().select(TABLE).await?;
        Ok(assets
            .into_iter()
            .map(|a| (a.original_ref, a.canonical_url))
            .collect())
    }

    pub async fn count(&self) -> RepoResult<usize> {
        let mut result = self
            .base
            .db()
            .query("SELECT count() FROM media_asset GROUP ALL")
            .await?;
        let counts: Vec<usize> = result.take((0, "count"))?;
        Ok(counts.into_iter().next().unwrap_or(0))
    }
}
