//! Update hub
//!
//! In-process fan-out of [`UpdateFrame`]s to live client connections.
//! Delivery is at-most-once best-effort: a subscriber whose channel is gone
//! is dropped on the spot, and a failed send never aborts the broadcast
//! loop. The hub holds no history; a client that reconnects starts from the
//! current persisted state via the query surface.

use dashmap::DashMap;
use shared::UpdateFrame;
use tokio::sync::mpsc;
use uuid::Uuid;

pub struct LiveSubscription {
    pub tenant_key: String,
    sender: mpsc::UnboundedSender<UpdateFrame>,
    /// Unix millis
    pub connected_at: i64,
}

#[derive(Default)]
pub struct UpdateHub {
    subscriptions: DashMap<Uuid, LiveSubscription>,
}

impl UpdateHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client; the connected acknowledgement is queued before the
    /// receiver is handed back, so it is always the first frame delivered
    pub fn subscribe(
        &self,
        tenant_key: impl Into<String>,
    ) -> (Uuid, mpsc::UnboundedReceiver<UpdateFrame>) {
        let tenant_key = tenant_key.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();

        let _ = tx.send(UpdateFrame::connected(tenant_key.clone()));
        self.subscriptions.insert(
            id,
            LiveSubscription {
                tenant_key: tenant_key.clone(),
                sender: tx,
                connected_at: shared::util::now_millis(),
            },
        );
        tracing::debug!(subscription = %id, tenant = %tenant_key, "Live client subscribed");
        (id, rx)
    }

    pub fn unsubscribe(&self, id: Uuid) {
        if self.subscriptions.remove(&id).is_some() {
            tracing::debug!(subscription = %id, "Live client unsubscribed");
        }
    }

    /// Deliver a frame to every subscriber of the tenant
    pub fn broadcast(&self, tenant_key: &str, frame: UpdateFrame) {
        let mut dead = Vec::new();
        let mut delivered = 0usize;

        for entry in self.subscriptions.iter() {
            if entry.value().tenant_key != tenant_key {
                continue;
            }
            if entry.value().sender.send(frame.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(*entry.key());
            }
        }

        for id in dead {
            self.subscriptions.remove(&id);
            tracing::debug!(subscription = %id, "Dropped dead live subscriber");
        }

        if delivered > 0 {
            tracing::debug!(
                tenant = %tenant_key,
                kind = %frame.kind,
                delivered,
                "Broadcast frame"
            );
        }
    }

    /// Subscriber count for one tenant
    pub fn subscriber_count(&self, tenant_key: &str) -> usize {
        self.subscriptions
            .iter()
            .filter(|entry| entry.value().tenant_key == tenant_key)
            .count()
    }

    pub fn total_subscribers(&self) -> usize {
        self.subscriptions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::OperationKind;

    #[tokio::test]
    async fn connected_ack_arrives_first() {
        let hub = UpdateHub::new();
        let (_id, mut rx) = hub.subscribe("acme");
        hub.broadcast(
            "acme",
            UpdateFrame::theme_update("acme", OperationKind::Update, serde_json::json!({})),
        );
        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind, shared::FrameKind::Connected);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.kind, shared::FrameKind::ThemeUpdate);
    }

    #[tokio::test]
    async fn broadcast_scoped_to_tenant() {
        let hub = UpdateHub::new();
        let (_a, mut rx_a) = hub.subscribe("acme");
        let (_b, mut rx_b) = hub.subscribe("globex");
        rx_a.recv().await.unwrap();
        rx_b.recv().await.unwrap();

        hub.broadcast(
            "acme",
            UpdateFrame::theme_update("acme", OperationKind::Update, serde_json::json!({})),
        );
        assert_eq!(rx_a.recv().await.unwrap().kind, shared::FrameKind::ThemeUpdate);
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn dead_subscriber_removed_on_broadcast() {
        let hub = UpdateHub::new();
        let (_id, rx) = hub.subscribe("acme");
        assert_eq!(hub.subscriber_count("acme"), 1);
        drop(rx);
        hub.broadcast(
            "acme",
            UpdateFrame::theme_update("acme", OperationKind::Update, serde_json::json!({})),
        );
        assert_eq!(hub.subscriber_count("acme"), 0);
    }
}
