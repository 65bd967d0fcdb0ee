//! Live update connection
//!
//! Websocket per (client, tenant). The first frame is always the connected
//! acknowledgement; afterwards the socket carries theme and media frames as
//! JSON text. The server ignores inbound text; a close (or any receive
//! error) tears the subscription down.

use axum::{
    Router,
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use shared::UpdateFrame;
use tokio::sync::mpsc;

use crate::core::{AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/stores/{tenant}/live", get(live))
}

async fn live(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    upgrade: WebSocketUpgrade,
) -> AppResult<Response> {
    // Reject unknown tenants before the upgrade completes
    state.router.resolve_tenant(&tenant).await?;
    Ok(upgrade.on_upgrade(move |socket| handle_socket(state, tenant, socket)))
}

async fn handle_socket(state: AppState, tenant: String, socket: WebSocket) {
    let (id, rx) = state.hub.subscribe(tenant.clone());
    let (sink, stream) = socket.split();

    tokio::select! {
        _ = forward_frames(rx, sink) => {}
        _ = drain_inbound(stream) => {}
    }

    state.hub.unsubscribe(id);
    tracing::debug!(subscription = %id, tenant = %tenant, "Live connection closed");
}

async fn forward_frames(
    mut rx: mpsc::UnboundedReceiver<UpdateFrame>,
    mut sink: futures::stream::SplitSink<WebSocket, Message>,
) {
    while let Some(frame) = rx.recv().await {
        let text = match serde_json::to_string(&frame) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(frame = %frame.frame_id, error = %e, "Frame serialization failed");
                continue;
            }
        };
        if sink.send(Message::Text(text.into())).await.is_err() {
            break;
        }
    }
}

/// Consume inbound messages until the peer goes away; inbound payloads are
/// ignored, the live surface is one-way
async fn drain_inbound(mut stream: futures::stream::SplitStream<WebSocket>) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }
}
