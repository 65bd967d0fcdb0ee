//! Record types persisted in the registry and tenant partitions

pub mod content;
pub mod media;
pub mod status;
pub mod tenant;
pub mod theme;

pub use content::{ContentKind, ContentRecord};
pub use media::{MediaAsset, UsageRef};
pub use status::SyncStatus;
pub use tenant::Tenant;
pub use theme::{Block, Component, StyleTokens, ThemeCurrent, ThemeDocument};
