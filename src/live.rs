//! Live update notifications
//!
//! Every post mutation, from either API surface, is broadcast to
//! connected WebSocket clients as a JSON event.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::AppState;
use crate::posts::Post;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FeedEvent {
    Created { post: Post },
    Updated { post: Post },
    Deleted { post_id: String },
}

/// Broadcast channel for real-time feed updates
#[derive(Clone)]
pub struct FeedEvents {
    tx: broadcast::Sender<FeedEvent>,
}

impl FeedEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.tx.subscribe()
    }

    /// Fire-and-forget: an event with no listeners is not an error.
    pub fn emit(&self, event: FeedEvent) {
        if self.tx.send(event).is_err() {
            debug!("feed event dropped, no subscribers");
        }
    }
}

/// GET /feed/live - WebSocket upgrade
pub async fn feed_live(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let rx = state.events.subscribe();
    ws.on_upgrade(move |socket| forward_events(socket, rx))
}

async fn forward_events(socket: WebSocket, mut rx: broadcast::Receiver<FeedEvent>) {
    info!("feed subscriber connected");
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    let Ok(text) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("feed subscriber lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            msg = receiver.next() => match msg {
                // Clients only listen; ignore anything they send.
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    info!("feed subscriber disconnected");
}
