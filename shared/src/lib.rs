//! Shared types for the Reef sync platform
//!
//! Wire types exchanged between sync-server and live clients (the mobile
//! renderer and the admin preview), plus small time utilities. Kept in a
//! separate crate so client-side tooling can depend on the frame format
//! without pulling in the server.

pub mod message;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Live-push re-exports (for convenient access)
pub use message::{FrameKind, OperationKind, SyncAck, UpdateFrame};
