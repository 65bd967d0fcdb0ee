//! Sync Status Repository
//!
//! One record per partition under a fixed id.

use super::{BaseRepository, RepoResult};
use crate::db::models::SyncStatus;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const TABLE: &str = "sync_status";
const RECORD: &str = "current";

#[derive(Clone)]
pub struct StatusRepository {
    base: BaseRepository,
}

impl StatusRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn get(&self) -> RepoResult<Option<SyncStatus>> {
        let status: Option<SyncStatus> = self.base.db().select((TABLE, RECORD)).await?;
        Ok(status)
    }

    pub async fn put(&self, status: SyncStatus) -> RepoResult<()> {
        self.base
            .db()
            .query("UPSERT type::thing($table, $record) CONTENT $status")
            .bind(("table", TABLE))
            .bind(("record", RECORD))
            .bind(("status", status))
            .await?;
        Ok(())
    }
}
