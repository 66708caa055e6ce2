//! Per-connection relay task.
//!
//! # Data Flow
//! ```text
//! upgrade (type, room)     → Session { Connecting }
//! join RoomRegistry        → Session { Active }
//!     socket reader        → RelayPayload → RoomRegistry::broadcast
//!     peer queue (mpsc)    → write pump → socket
//! close / error / shutdown → Membership dropped → Session { Closed }
//! ```
//!
//! # Design Decisions
//! - Each connection owns a bounded outbound queue drained by its own write pump
//! - Deregistration is tied to the `Membership` guard, so every exit path runs it once
//! - Keepalive pings and the shutdown close frame go out through the write pump

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{self, Instant};

use crate::http::server::AppState;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::relay::connection::{ConnectionId, ConnectionState, ConnectionTracker};
use crate::relay::message::{RelayFrame, RelayPayload, Role};
use crate::relay::registry::RoomRegistry;

/// How long the write pump gets to answer a peer's close frame.
const CLOSE_REPLY_GRACE: Duration = Duration::from_secs(2);

/// Query parameters of a relay upgrade request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionParams {
    #[serde(rename = "type")]
    pub role: Option<String>,
    pub room: Option<String>,
}

/// Everything a session needs from the server.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub registry: Arc<RoomRegistry>,
    pub tracker: ConnectionTracker,
    pub shutdown: Shutdown,
    pub peer_buffer: usize,
    pub ping_interval: Option<Duration>,
}

impl SessionContext {
    pub fn from_state(state: &AppState) -> Self {
        let rooms = &state.rooms;
        Self {
            registry: Arc::clone(&state.registry),
            tracker: state.connections.clone(),
            shutdown: state.shutdown.clone(),
            peer_buffer: rooms.peer_buffer,
            ping_interval: (rooms.ping_interval_secs > 0)
                .then(|| Duration::from_secs(rooms.ping_interval_secs)),
        }
    }
}

/// One relay connection.
#[derive(Debug)]
pub struct Session {
    id: ConnectionId,
    role: Role,
    room: String,
    state: ConnectionState,
}

impl Session {
    pub fn new(params: SessionParams, default_room: &str) -> Self {
        Self {
            id: ConnectionId::new(),
            role: Role::from_param(params.role.as_deref()),
            room: params.room.unwrap_or_else(|| default_room.to_owned()),
            state: ConnectionState::Connecting,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Drive the connection until it closes.
    pub async fn run(mut self, socket: WebSocket, ctx: SessionContext) {
        let _conn = ctx.tracker.track(self.id);
        let shutdown = ctx.shutdown.subscribe();
        let (peer_tx, peer_rx) = mpsc::channel(ctx.peer_buffer);
        let membership = ctx.registry.join(&self.room, self.role, self.id, peer_tx);
        self.state = ConnectionState::Active;

        tracing::info!(
            connection_id = %self.id,
            role = %self.role,
            room = %self.room,
            "Relay connection active"
        );

        let (sink, mut stream) = socket.split();
        let (peer_closed_tx, peer_closed_rx) = oneshot::channel();
        let mut writer = tokio::spawn(write_pump(
            self.id,
            sink,
            peer_rx,
            ctx.ping_interval,
            shutdown,
            peer_closed_rx,
        ));

        let mut peer_closed = false;
        loop {
            tokio::select! {
                inbound = stream.next() => match inbound {
                    Some(Ok(Message::Close(_))) => {
                        tracing::debug!(connection_id = %self.id, "Peer closed connection");
                        peer_closed = true;
                        break;
                    }
                    None => {
                        tracing::debug!(connection_id = %self.id, "Peer stream ended");
                        break;
                    }
                    Some(Ok(message)) => {
                        if let Some(frame) = RelayFrame::from_message(message) {
                            self.relay(&ctx.registry, frame);
                        }
                    }
                    Some(Err(e)) => {
                        tracing::warn!(connection_id = %self.id, error = %e, "Relay transport error");
                        break;
                    }
                },
                _ = &mut writer => {
                    tracing::debug!(connection_id = %self.id, "Write side finished");
                    break;
                }
            }
        }

        drop(membership);
        if peer_closed && peer_closed_tx.send(()).is_ok() {
            if time::timeout(CLOSE_REPLY_GRACE, &mut writer).await.is_err() {
                writer.abort();
            }
        } else {
            writer.abort();
        }
        self.state = ConnectionState::Closed;

        tracing::info!(
            connection_id = %self.id,
            role = %self.role,
            room = %self.room,
            "Relay connection closed"
        );
    }

    fn relay(&self, registry: &RoomRegistry, frame: RelayFrame) {
        let bytes = frame.len();
        let payload = RelayPayload::from_inbound(self.role, frame);
        match registry.broadcast(&self.room, payload) {
            Ok(delivery) => {
                metrics::record_relay_message(self.role, delivery.delivered, delivery.dropped);
                tracing::trace!(
                    connection_id = %self.id,
                    room = %self.room,
                    bytes,
                    delivered = delivery.delivered,
                    dropped = delivery.dropped,
                    "Relayed frame"
                );
            }
            Err(e) => {
                tracing::error!(connection_id = %self.id, error = %e, "Failed to encode relay payload");
            }
        }
    }
}

/// Forward queued frames, keepalive pings and close frames to the socket.
///
/// `peer_closed` fires once the reader saw the peer's close frame; closing the sink then flushes
/// the close reply the protocol layer already queued.
async fn write_pump(
    id: ConnectionId,
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<RelayFrame>,
    ping_interval: Option<Duration>,
    mut shutdown: broadcast::Receiver<()>,
    mut peer_closed: oneshot::Receiver<()>,
) {
    let period = ping_interval.unwrap_or(Duration::from_secs(3600));
    let mut ticker = time::interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(frame) = frame else { break };
                if let Err(e) = sink.send(frame.into()).await {
                    tracing::debug!(connection_id = %id, error = %e, "Send to peer failed");
                    break;
                }
            }
            _ = ticker.tick(), if ping_interval.is_some() => {
                if sink.send(Message::Ping(Default::default())).await.is_err() {
                    tracing::debug!(connection_id = %id, "Ping failed");
                    break;
                }
            }
            _ = shutdown.recv() => {
                let close = CloseFrame {
                    code: close_code::AWAY,
                    reason: "server shutting down".into(),
                };
                let _ = sink.send(Message::Close(Some(close))).await;
                break;
            }
            _ = &mut peer_closed => {
                if let Err(e) = sink.close().await {
                    tracing::debug!(connection_id = %id, error = %e, "Close reply failed");
                }
                break;
            }
        }
    }
}

/// Complete a relay upgrade for `params`.
pub fn accept(ws: WebSocketUpgrade, params: SessionParams, state: &AppState) -> Response {
    let session = Session::new(params, &state.rooms.default_room);
    let ctx = SessionContext::from_state(state);
    let id = session.id();

    tracing::debug!(
        connection_id = %id,
        role = %session.role(),
        room = %session.room(),
        "Relay upgrade requested"
    );

    ws.on_failed_upgrade(move |e| {
        tracing::warn!(connection_id = %id, error = %e, "Relay upgrade failed");
    })
    .on_upgrade(move |socket| session.run(socket, ctx))
    .into_response()
}
