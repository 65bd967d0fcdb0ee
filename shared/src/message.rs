//! Live-push frame types
//!
//! Frames travel server -> client over the per-tenant live connection.
//! The first frame after connect is always a [`FrameKind::Connected`]
//! acknowledgement, never a data frame.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Frame discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    /// Connectivity acknowledgement, sent once on connect
    Connected,
    /// A theme document changed
    ThemeUpdate,
    /// A media asset changed
    MediaUpdate,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "connected"),
            Self::ThemeUpdate => write!(f, "theme_update"),
            Self::MediaUpdate => write!(f, "media_update"),
        }
    }
}

/// Mutation kind reported by the persistence change feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// One frame pushed to a live subscriber
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateFrame {
    /// Frame discriminator (`connected` | `theme_update` | `media_update`)
    #[serde(rename = "type")]
    pub kind: FrameKind,
    /// Tenant the frame belongs to
    pub tenant_key: String,
    /// Mutation kind, absent on the connect ack
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<OperationKind>,
    /// Frame payload, absent on the connect ack
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Frame id (for client-side tracing)
    pub frame_id: Uuid,
    /// Server time the frame was emitted (unix millis)
    pub emitted_at: i64,
}

impl UpdateFrame {
    /// Connect acknowledgement (always the first frame on a connection)
    pub fn connected(tenant_key: impl Into<String>) -> Self {
        Self {
            kind: FrameKind::Connected,
            tenant_key: tenant_key.into(),
            operation: None,
            data: None,
            frame_id: Uuid::new_v4(),
            emitted_at: crate::util::now_millis(),
        }
    }

    /// Theme document change frame
    pub fn theme_update(
        tenant_key: impl Into<String>,
        operation: OperationKind,
        data: serde_json::Value,
    ) -> Self {
        Self {
            kind: FrameKind::ThemeUpdate,
            tenant_key: tenant_key.into(),
            operation: Some(operation),
            data: Some(data),
            frame_id: Uuid::new_v4(),
            emitted_at: crate::util::now_millis(),
        }
    }

    /// Media asset change frame (metadata only, never the binary)
    pub fn media_update(
        tenant_key: impl Into<String>,
        operation: OperationKind,
        data: serde_json::Value,
    ) -> Self {
        Self {
            kind: FrameKind::MediaUpdate,
            tenant_key: tenant_key.into(),
            operation: Some(operation),
            data: Some(data),
            frame_id: Uuid::new_v4(),
            emitted_at: crate::util::now_millis(),
        }
    }
}

/// Acknowledgement returned by the manual-trigger surface
///
/// The trigger returns immediately; the sync outcome is observable only via
/// the status query or the live connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncAck {
    pub accepted: bool,
    /// True when a run for this tenant was already in flight and the trigger
    /// was coalesced into it
    pub already_running: bool,
    pub tenant_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_frame_carries_no_data() {
        let frame = UpdateFrame::connected("acme");
        assert_eq!(frame.kind, FrameKind::Connected);
        assert!(frame.operation.is_none());
        assert!(frame.data.is_none());

        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "connected");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn theme_update_round_trips() {
        let frame = UpdateFrame::theme_update(
            "acme",
            OperationKind::Update,
            serde_json::json!({"version": 3}),
        );
        let json = serde_json::to_string(&frame).unwrap();
        let back: UpdateFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, FrameKind::ThemeUpdate);
        assert_eq!(back.operation, Some(OperationKind::Update));
        assert_eq!(back.data.unwrap()["version"], 3);
    }
}
