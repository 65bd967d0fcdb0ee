/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | WORK_DIR | /var/lib/reef/sync | Working directory (partitions, media, logs) |
/// | HTTP_PORT | 4000 | HTTP service port |
/// | ENVIRONMENT | development | Runtime environment |
/// | FETCH_TIMEOUT_MS | 30000 | Per-request timeout for storefront API calls |
/// | DOWNLOAD_TIMEOUT_MS | 20000 | Per-download timeout for media |
/// | MEDIA_CONCURRENCY | 8 | Bounded fan-out for media ingestion |
/// | SYNC_INTERVAL_SECS | 0 | Scheduled resync tick (0 disables) |
/// | LOG_DIR | (unset) | Optional directory for rolling file logs |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/reef HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory holding tenant partitions and media blobs
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// Timeout for each storefront API fetch (milliseconds)
    pub fetch_timeout_ms: u64,
    /// Timeout for each media download (milliseconds)
    pub download_timeout_ms: u64,
    /// Maximum concurrent media downloads per sync run
    pub media_concurrency: usize,
    /// Scheduled full-resync interval in seconds (0 = disabled)
    pub sync_interval_secs: u64,
    /// Optional log directory for daily rolling files
    pub log_dir: Option<String>,
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/reef/sync".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(4000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            fetch_timeout_ms: std::env::var("FETCH_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30_000),
            download_timeout_ms: std::env::var("DOWNLOAD_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(20_000),
            media_concurrency: std::env::var("MEDIA_CONCURRENCY")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8),
            sync_interval_secs: std::env::var("SYNC_INTERVAL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(0),
            log_dir: std::env::var("LOG_DIR").ok(),
        }
    }

    /// Override the work dir and port, keeping everything else from env
    ///
    /// Mostly used by tests
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// Directory holding the per-tenant RocksDB partitions
    pub fn partitions_dir(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("partitions")
    }

    /// Directory holding downloaded media blobs (one subdir per tenant)
    pub fn media_dir(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("media")
    }

    /// Ensure the work directory structure exists
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.partitions_dir())?;
        std::fs::create_dir_all(self.media_dir())?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
