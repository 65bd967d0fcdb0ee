//! Repository Module
//!
//! Typed record accessors over SurrealDB tables. Every repository is scoped
//! to one partition handle: tenant repositories against the shared registry
//! partition, everything else against the tenant partition the router
//! resolved.

pub mod content;
pub mod media;
pub mod status;
pub mod tenant;
pub mod theme;

// Re-exports
pub use content::ContentRepository;
pub use media::MediaRepository;
pub use status::StatusRepository;
pub use tenant::TenantRepository;
pub use theme::ThemeRepository;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

impl From<RepoError> for crate::core::AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => crate::core::AppError::NotFound(msg),
            RepoError::Duplicate(msg) | RepoError::Validation(msg) => {
                crate::core::AppError::Validation(msg)
            }
            RepoError::Database(msg) => crate::core::AppError::Database(msg),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}
