//! Media download and deduplication
//!
//! One asset per (tenant, canonical URL): a reference already ingested gets
//! its usage backlinks appended and is never re-downloaded. Fresh downloads
//! are checksummed, probed for dimensions, written to the tenant media
//! directory (atomic tmp+rename), and recorded in the partition.
//!
//! Independent assets download concurrently up to a bounded fan-out; the
//! batch is grouped by canonical URL first, so distinct raw spellings of one
//! asset (an internal locator and its literal CDN URL, say) never race to
//! create duplicate records. One failed download never aborts the batch; it
//! is counted and skipped.

use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::Duration;

use super::extract::DiscoveredRef;
use super::resolve::resolve_reference;
use crate::core::{AppError, AppResult};
use crate::db::models::{MediaAsset, Tenant, UsageRef};
use crate::db::repository::MediaRepository;

/// Batch result handed back to the orchestrator
#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    /// raw reference -> canonical URL, for every reference that resolved to
    /// a persisted asset (fresh or deduplicated)
    pub rewrite_map: std::collections::BTreeMap<String, String>,
    pub ingested: usize,
    pub deduplicated: usize,
    pub failed: usize,
}

pub struct MediaIngestor {
    http: reqwest::Client,
    repo: MediaRepository,
    tenant: Tenant,
    media_dir: PathBuf,
    download_timeout: Duration,
    concurrency: usize,
}

impl MediaIngestor {
    pub fn new(
        http: reqwest::Client,
        repo: MediaRepository,
        tenant: Tenant,
        media_dir: PathBuf,
        download_timeout: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            http,
            repo,
            tenant,
            media_dir,
            download_timeout,
            concurrency: concurrency.max(1),
        }
    }

    /// Ingest a batch of discovered references with bounded concurrency
    ///
    /// The batch fans out per canonical URL, not per raw reference: the same
    /// asset spelt two ways must still produce exactly one record.
    pub async fn ingest_batch(&self, refs: Vec<DiscoveredRef>) -> IngestOutcome {
        let mut outcome = IngestOutcome::default();
        let groups = group_by_canonical(refs, &self.tenant);

        let mut results =
            futures::stream::iter(groups.into_iter().map(|(canonical, group)| async move {
                let result = self
                    .ingest_canonical(&canonical, &group.original_ref, group.usages)
                    .await;
                (canonical, group.raws, result)
            }))
            .buffer_unordered(self.concurrency);

        while let Some((canonical, raws, result)) = results.next().await {
            match result {
                Ok(was_new) => {
                    if was_new {
                        outcome.ingested += 1;
                    } else {
                        outcome.deduplicated += 1;
                    }
                    for raw in raws {
                        outcome.rewrite_map.insert(raw, canonical.clone());
                    }
                }
                Err(e) => {
                    outcome.failed += 1;
                    tracing::warn!(
                        tenant = %self.tenant.key,
                        canonical = %canonical,
                        error = %e,
                        "Media ingestion failed for reference, continuing batch"
                    );
                }
            }
        }

        tracing::info!(
            tenant = %self.tenant.key,
            ingested = outcome.ingested,
            deduplicated = outcome.deduplicated,
            failed = outcome.failed,
            "Media batch complete"
        );
        outcome
    }

    /// Ingest one canonical URL; returns whether a new asset was created
    async fn ingest_canonical(
        &self,
        canonical: &str,
        original_ref: &str,
        usages: Vec<UsageRef>,
    ) -> AppResult<bool> {
        // Dedup by canonical URL inside the tenant partition
        if let Some(existing) = self.repo.find_by_canonical(canonical).await? {
            if let Some(id) = existing.id {
                self.repo.append_usage(id, usages).await?;
            }
            return Ok(false);
        }

        let (bytes, content_type) = self.download(canonical).await?;
        let checksum = hex::encode(Sha256::digest(&bytes));
        let (width, height) = probe_dimensions(&bytes);
        let storage_path = self.write_blob(&checksum, canonical, &bytes).await?;

        let asset = MediaAsset {
            id: None,
            tenant_key: self.tenant.key.clone(),
            original_ref: original_ref.to_string(),
            canonical_url: canonical.to_string(),
            content_type,
            byte_size: bytes.len() as u64,
            checksum,
            storage_path,
            width,
            height,
            alt: None,
            usage: usages,
            created_at: shared::util::now_millis(),
        };
        self.repo.insert(asset).await?;

        Ok(true)
    }

    async fn download(&self, canonical: &str) -> AppResult<(Vec<u8>, String)> {
        let resp = self
            .http
            .get(canonical)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| AppError::download(format!("{canonical}: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::download(format!(
                "{canonical}: status {}",
                resp.status()
            )));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .unwrap_or_else(|| guess_content_type(canonical));

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AppError::download(format!("{canonical}: {e}")))?;

        Ok((bytes.to_vec(), content_type))
    }

    /// Atomic write: tmp file + rename, keyed by checksum so identical bytes
    /// share one blob
    async fn write_blob(&self, checksum: &str, canonical: &str, bytes: &[u8]) -> AppResult<String> {
        let ext = blob_extension(canonical);
        let file_name = format!("{checksum}{ext}");
        let tenant_dir = self.media_dir.join(&self.tenant.key);
        let file_path = tenant_dir.join(&file_name);

        if file_path.exists() {
            return Ok(file_name);
        }

        tokio::fs::create_dir_all(&tenant_dir)
            .await
            .map_err(|e| AppError::internal(format!("create media dir: {e}")))?;

        let tmp_path = tenant_dir.join(format!("{file_name}.tmp"));
        tokio::fs::write(&tmp_path, bytes)
            .await
            .map_err(|e| AppError::internal(format!("write media blob: {e}")))?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &file_path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(AppError::internal(format!("rename media blob: {e}")));
        }

        Ok(file_name)
    }
}

/// All raw spellings of one canonical URL, merged
#[derive(Debug)]
struct CanonicalGroup {
    /// First raw spelling seen, recorded as the asset's original reference
    original_ref: String,
    raws: Vec<String>,
    usages: Vec<UsageRef>,
}

fn group_by_canonical(
    refs: Vec<DiscoveredRef>,
    tenant: &Tenant,
) -> BTreeMap<String, CanonicalGroup> {
    let mut groups: BTreeMap<String, CanonicalGroup> = BTreeMap::new();
    for discovered in refs {
        let canonical = resolve_reference(&discovered.raw, tenant);
        match groups.get_mut(&canonical) {
            Some(group) => {
                group.raws.push(discovered.raw);
                group.usages.extend(discovered.usages);
            }
            None => {
                groups.insert(
                    canonical,
                    CanonicalGroup {
                        original_ref: discovered.raw.clone(),
                        raws: vec![discovered.raw],
                        usages: discovered.usages,
                    },
                );
            }
        }
    }
    groups
}

/// Header-less best effort: image header probe only, never a full decode
fn probe_dimensions(bytes: &[u8]) -> (Option<u32>, Option<u32>) {
    match image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok())
    {
        Some((w, h)) => (Some(w), Some(h)),
        None => (None, None),
    }
}

fn guess_content_type(canonical: &str) -> String {
    let path = canonical.split(['?', '#']).next().unwrap_or(canonical);
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

fn blob_extension(canonical: &str) -> String {
    let path = canonical.split(['?', '#']).next().unwrap_or(canonical);
    match path.rsplit_once('.') {
        Some((_, ext)) if ext.len() <= 5 && !ext.contains('/') => {
            format!(".{}", ext.to_ascii_lowercase())
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_guess_falls_back() {
        assert_eq!(guess_content_type("https://x/cdn/a.png?v=1"), "image/png");
        assert_eq!(
            guess_content_type("https://x/cdn/mystery"),
            "application/octet-stream"
        );
    }

    #[test]
    fn blob_extension_is_sane() {
        assert_eq!(blob_extension("https://x/cdn/a.PNG?v=1"), ".png");
        assert_eq!(blob_extension("https://x/cdn/noext"), "");
        assert_eq!(blob_extension("https://x/c.dn/path"), "");
    }

    #[test]
    fn dimension_probe_tolerates_garbage() {
        assert_eq!(probe_dimensions(b"not an image"), (None, None));
    }

    #[test]
    fn distinct_spellings_of_one_asset_group_together() {
        let tenant = Tenant::new("acme", "store.example", "token");
        let usage = |component: &str| UsageRef {
            document_id: "dawn_1".to_string(),
            component_id: Some(component.to_string()),
            block_id: None,
        };
        let refs = vec![
            DiscoveredRef {
                raw: "internal://shop_images/logo.png".to_string(),
                usages: vec![usage("hero")],
            },
            DiscoveredRef {
                raw: "https://store.example/cdn/shop_images/logo.png".to_string(),
                usages: vec![usage("footer")],
            },
            DiscoveredRef {
                raw: "internal://shop_images/other.png".to_string(),
                usages: vec![usage("grid")],
            },
        ];

        let groups = group_by_canonical(refs, &tenant);
        assert_eq!(groups.len(), 2);

        let logo = &groups["https://store.example/cdn/shop_images/logo.png"];
        assert_eq!(logo.original_ref, "internal://shop_images/logo.png");
        assert_eq!(logo.raws.len(), 2);
        assert_eq!(logo.usages.len(), 2);
    }
}
