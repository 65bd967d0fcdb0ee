//! Theme Document Repository
//!
//! Versioned snapshots plus the explicit current-version pointer. The
//! pointer record (`theme_current`, keyed by theme id) is written in the same
//! transaction as the version insert, so "current" can never point at a
//! half-persisted version and recency plays no role.

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{Component, ThemeCurrent, ThemeDocument};
use serde_json::Value;
use std::collections::BTreeMap;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const TABLE: &str = "theme_document";
const POINTER_TABLE: &str = "theme_current";

#[derive(Clone)]
pub struct ThemeRepository {
    base: BaseRepository,
}

impl ThemeRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Current document for a theme, via the pointer record
    pub async fn current(&self, theme_id: &str) -> RepoResult<Option<ThemeDocument>> {
        let pointer: Option<ThemeCurrent> =
            self.base.db().select((POINTER_TABLE, theme_id)).await?;
        let Some(pointer) = pointer else {
            return Ok(None);
        };
        let doc: Option<ThemeDocument> = self.base.db().select(pointer.document).await?;
        Ok(doc)
    }

    /// Most recently updated current document across all themes of the tenant
    pub async fn current_latest(&self) -> RepoResult<Option<ThemeDocument>> {
        let pointers: Vec<ThemeCurrent> = self
            .base
            .db()
            .query("SELECT * FROM theme_current ORDER BY updated_at DESC LIMIT 1")
            .await?
            .take(0)?;
        let Some(pointer) = pointers.into_iter().next() else {
            return Ok(None);
        };
        let doc: Option<ThemeDocument> = self.base.db().select(pointer.document).await?;
        Ok(doc)
    }

    /// Next version number for a theme (1 when no pointer exists yet)
    pub async fn next_version(&self, theme_id: &str) -> RepoResult<u64> {
        let pointer: Option<ThemeCurrent> =
            self.base.db().select((POINTER_TABLE, theme_id)).await?;
        Ok(pointer.map(|p| p.version + 1).unwrap_or(1))
    }

    /// Persist a new version and advance the pointer, transactionally
    ///
    /// The document's `version` field must already hold the value from
    /// [`Self::next_version`]; the caller serializes runs per tenant, so
    /// versions come out as 1..N with no gaps.
    pub async fn persist_version(&self, doc: ThemeDocument) -> RepoResult<ThemeDocument> {
        let theme_id = doc.theme_id.clone();
        let doc_key = format!("{}_{}", doc.theme_id, doc.version);
        // Bind the pointer as a typed record so the document link reaches the
        // database as a record id, not a plain object
        let pointer = ThemeCurrent {
            id: None,
            theme_id: doc.theme_id.clone(),
            version: doc.version,
            document: surrealdb::RecordId::from_table_key(TABLE, doc_key.as_str()),
            updated_at: doc.updated_at,
        };

        let mut result = self
            .base
            .db()
            .query(
                "BEGIN; \
                 CREATE type::thing('theme_document', $doc_key) CONTENT $doc; \
                 UPSERT type::thing('theme_current', $theme_id) CONTENT $pointer; \
                 COMMIT;",
            )
            .bind(("doc_key", doc_key))
            .bind(("doc", doc))
            .bind(("theme_id", theme_id.clone()))
            .bind(("pointer", pointer))
            .await?;
        let created: Vec<ThemeDocument> = result.take(0)?;
        created.into_iter().next().ok_or_else(|| {
            RepoError::Database(format!("Failed to persist theme version for '{theme_id}'"))
        })
    }

    /// Replace the component trees of an existing document (PERSIST_REWRITTEN)
    ///
    /// Only the parsed trees change; version and raw source stay as written
    /// by [`Self::persist_version`].
    pub async fn update_trees(
        &self,
        document: surrealdb::RecordId,
        components: &[Component],
        pages: &BTreeMap<String, Vec<Component>>,
    ) -> RepoResult<()> {
        let patch = serde_json::json!({
            "components": components,
            "pages": pages,
            "updated_at": shared::util::now_millis(),
        });
        self.base
            .db()
            .query("UPDATE $document MERGE $patch")
            .bind(("document", document))
            .bind(("patch", patch))
            .await?;
        Ok(())
    }

    /// All persisted version numbers for a theme, ascending
    pub async fn versions(&self, theme_id: &str) -> RepoResult<Vec<u64>> {
        let theme_id_owned = theme_id.to_string();
        let mut result = self
            .base
            .db()
            .query(
                "SELECT VALUE version FROM theme_document \
                 WHERE theme_id = $theme_id ORDER BY version ASC",
            )
            .bind(("theme_id", theme_id_owned))
            .await?;
        let versions: Vec<u64> = result.take(0)?;
        Ok(versions)
    }

    /// Raw source archive of the current version (diagnostics/replay)
    pub async fn current_raw_source(&self, theme_id: &str) -> RepoResult<Option<Value>> {
        Ok(self.current(theme_id).await?.map(|d| d.raw_source))
    }
}
