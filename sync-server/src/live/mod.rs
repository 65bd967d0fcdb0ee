//! Live update propagation
//!
//! `hub` fans frames out to connected clients; `watcher` turns partition
//! change feeds into frames.

pub mod hub;
pub mod watcher;

pub use hub::UpdateHub;
