//! Live subscription channel. One task per connection bridges the hub's
//! per-subscriber queue onto the socket; client pongs feed the hub's
//! liveness sweep, which is the sole mechanism that reclaims dead
//! connections.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::debug;

use safesewa_common::Topic;
use safesewa_hub::{BroadcastHub, HubMessage};

use crate::state::AppState;

#[derive(Deserialize)]
pub struct WsParams {
    /// Comma-separated topic list; defaults to all topics.
    pub topics: Option<String>,
}

pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let topics = parse_topics(params.topics.as_deref());
    let hub = Arc::clone(&state.hub);
    ws.on_upgrade(move |socket| client_loop(socket, hub, topics))
}

fn parse_topics(raw: Option<&str>) -> Vec<Topic> {
    match raw {
        None => vec![Topic::HazardAlerts, Topic::SosEvents],
        Some(list) => {
            let topics: Vec<Topic> = list
                .split(',')
                .filter_map(|t| t.trim().parse().ok())
                .collect();
            if topics.is_empty() {
                vec![Topic::HazardAlerts, Topic::SosEvents]
            } else {
                topics
            }
        }
    }
}

async fn client_loop(socket: WebSocket, hub: Arc<BroadcastHub>, topics: Vec<Topic>) {
    let mut subscription = hub.subscribe(topics);
    let id = subscription.id;
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            queued = subscription.rx.recv() => match queued {
                Some(HubMessage::Event(event)) => {
                    let payload = match serde_json::to_string(&event) {
                        Ok(p) => p,
                        Err(e) => {
                            debug!(error = %e, "Failed to serialize event");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                Some(HubMessage::Ping) => {
                    if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
                // Evicted by the liveness sweep.
                None => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Pong(_))) => hub.record_pong(id),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    hub.unsubscribe(id);
    debug!(subscriber = %id, "WebSocket connection closed");
}
