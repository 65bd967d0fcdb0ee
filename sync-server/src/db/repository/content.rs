//! Adjacent Content Repository
//!
//! Upsert-by-handle storage for catalog and editorial records, plus the
//! enrichment lookups the rewriter uses.

use super::{BaseRepository, RepoResult};
use crate::db::models::{ContentKind, ContentRecord};
use std::collections::HashMap;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

#[derive(Clone)]
pub struct ContentRepository {
    base: BaseRepository,
}

impl ContentRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Upsert one record by handle; returns true when newly created
    pub async fn upsert(&self, kind: ContentKind, record: ContentRecord) -> RepoResult<bool> {
        let existing: Option<ContentRecord> = self
            .base
            .db()
            .select((kind.table(), record.handle.as_str()))
            .await?;
        let is_new = existing.is_none();

        let handle = record.handle.clone();
        self.base
            .db()
            .query("UPSERT type::thing($table, $handle) CONTENT $record")
            .bind(("table", kind.table()))
            .bind(("handle", handle))
            .bind(("record", record))
            .await?;
        Ok(is_new)
    }

    pub async fn find(&self, kind: ContentKind, handle: &str) -> RepoResult<Option<ContentRecord>> {
        let record: Option<ContentRecord> = self.base.db().select((kind.table(), handle)).await?;
        Ok(record)
    }

    pub async fn count(&self, kind: ContentKind) -> RepoResult<usize> {
        let mut result = self
            .base
            .db()
            .query(format!(
                "SELECT count() FROM {} GROUP ALL",
                kind.table()
            ))
            .await?;
        let counts: Vec<usize> = result.take((0, "count"))?;
        Ok(counts.into_iter().next().unwrap_or(0))
    }

    /// Snapshot every record of every kind, keyed for the rewriter
    pub async fn enrichment_map(
        &self,
    ) -> RepoResult<HashMap<(ContentKind, String), ContentRecord>> {
        let mut map = HashMap::new();
        for kind in [
            ContentKind::Product,
            ContentKind::Collection,
            ContentKind::BlogPost,
            ContentKind::Page,
        ] {
            let records: Vec<ContentRecord> = self.base.db().select(kind.table()).await?;
            for record in records {
                map.insert((kind, record.handle.clone()), record);
            }
        }
        Ok(map)
    }
}
