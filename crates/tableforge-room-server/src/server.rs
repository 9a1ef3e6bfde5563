// SPDX-License-Identifier: Apache-2.0
//! axum WebSocket transport, grounded directly on
//! `echo-session-ws-gateway`'s connection handling: one `WebSocketUpgrade`
//! handler per socket, a dedicated writer task fed by an `mpsc` channel, a
//! reader loop that classifies and forwards client frames, graceful
//! per-task teardown on either side closing first.
//!
//! Unlike the teacher's binary-framed Unix-socket bridge, this transport
//! speaks the JSON [`crate::protocol`] directly: `room:*`/`dispatch`
//! requests in, `room:*`/`state` frames out.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::protocol::{ClientMessage, ServerMessage};
use crate::registry::{RegistryError, RoomRegistry, RoomRegistryConfig};
use crate::room::RoomError;

/// room_code -> (client_id -> outbound sender). Used for broadcast fan-out.
type ConnTable = HashMap<String, HashMap<String, mpsc::Sender<ServerMessage>>>;

/// Shared server state, cloned (cheaply, via `Arc`s) into every connection task.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<Mutex<RoomRegistry>>,
    conns: Arc<Mutex<ConnTable>>,
    /// How long a disconnected seat's binding survives before the seat (and,
    /// if it was the last occupant, the room) is released.
    reconnect_grace: Duration,
}

impl AppState {
    /// Builds fresh, empty server state.
    pub fn new(config: RoomRegistryConfig, reconnect_grace: Duration) -> Self {
        Self {
            registry: Arc::new(Mutex::new(RoomRegistry::new(config))),
            conns: Arc::new(Mutex::new(HashMap::new())),
            reconnect_grace,
        }
    }

    /// Open room count, for `/healthz`.
    pub async fn room_count(&self) -> usize {
        self.registry.lock().await.room_count()
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    rooms: usize,
}

async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse { status: "ok", rooms: state.room_count().await })
}

/// Builds the full axum router: `/ws` upgrade endpoint plus `/healthz`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn ws_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, addr))
}

/// Which room/client identity this connection currently occupies, if any.
struct Seated {
    room_code: String,
    client_id: String,
}

async fn handle_socket(socket: WebSocket, state: AppState, peer: SocketAddr) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerMessage>(64);

    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let Ok(text) = serde_json::to_string(&msg) else { continue };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    if out_tx.send(ServerMessage::Welcome { in_room: false }).await.is_err() {
        writer.abort();
        return;
    }

    let mut seated: Option<Seated> = None;

    while let Some(frame) = ws_rx.next().await {
        let msg = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                warn!(?err, ?peer, "ws recv error");
                break;
            }
        };

        let parsed: Result<ClientMessage, _> = serde_json::from_str(&msg);
        let client_msg = match parsed {
            Ok(m) => m,
            Err(err) => {
                let _ = out_tx.send(ServerMessage::RoomError { message: format!("malformed frame: {err}") }).await;
                continue;
            }
        };

        handle_client_message(&state, &mut seated, &out_tx, client_msg).await;
    }

    if let Some(Seated { room_code, client_id }) = seated {
        on_disconnect(&state, room_code, client_id).await;
    }

    drop(out_tx);
    let _ = writer.await;
}

async fn handle_client_message(
    state: &AppState,
    seated: &mut Option<Seated>,
    out_tx: &mpsc::Sender<ServerMessage>,
    msg: ClientMessage,
) {
    match msg {
        ClientMessage::RoomCreate { variant, password, max_members, is_private, client_id } => {
            let mut registry = state.registry.lock().await;
            let result = registry.create_room(variant, password, max_members, is_private.unwrap_or(false)).and_then(|room| {
                room.join(&client_id, None)
                    .map(|seat| (room.code().to_string(), room.game_state_for(seat)))
                    .map_err(RegistryError::from)
            });
            drop(registry);
            match result {
                Ok((room_code, state_value)) => {
                    register_conn(state, &room_code, &client_id, out_tx.clone()).await;
                    let _ = out_tx.send(ServerMessage::RoomCreated { room_code: room_code.clone(), state: state_value }).await;
                    *seated = Some(Seated { room_code: room_code.clone(), client_id });
                    broadcast_room(state, &room_code, false).await;
                }
                Err(err) => {
                    let _ = out_tx.send(ServerMessage::RoomError { message: err.to_string() }).await;
                }
            }
        }
        ClientMessage::RoomJoin { room_code, password, client_id } => {
            let mut registry = state.registry.lock().await;
            let result = registry.get_mut(&room_code).and_then(|room| {
                room.join(&client_id, password.as_deref())
                    .map(|seat| (seat, room.game_state_for(seat)))
                    .map_err(RegistryError::from)
            });
            drop(registry);
            match result {
                Ok((seat, state_value)) => {
                    register_conn(state, &room_code, &client_id, out_tx.clone()).await;
                    let _ = out_tx
                        .send(ServerMessage::RoomJoined { room_code: room_code.clone(), player_index: seat, state: state_value })
                        .await;
                    *seated = Some(Seated { room_code: room_code.clone(), client_id });
                    broadcast_room(state, &room_code, false).await;
                }
                Err(err) => {
                    let _ = out_tx.send(ServerMessage::RoomError { message: err.to_string() }).await;
                }
            }
        }
        ClientMessage::RoomLeave => {
            if let Some(Seated { room_code, client_id }) = seated.take() {
                let mut registry = state.registry.lock().await;
                if let Ok(room) = registry.get_mut(&room_code) {
                    room.leave(&client_id);
                    let empty = room.is_empty();
                    if empty {
                        registry.remove(&room_code);
                    }
                    drop(registry);
                    unregister_conn(state, &room_code, &client_id).await;
                    let _ = out_tx.send(ServerMessage::RoomLeft).await;
                    if !empty {
                        broadcast_room(state, &room_code, false).await;
                    }
                }
            }
        }
        ClientMessage::RoomList => {
            let rooms = state.registry.lock().await.list_public();
            let _ = out_tx.send(ServerMessage::RoomList { rooms }).await;
        }
        ClientMessage::Dispatch { action_type, payload } => {
            let Some(Seated { room_code, client_id }) = seated else {
                let _ = out_tx.send(ServerMessage::RoomError { message: "not seated in a room".to_string() }).await;
                return;
            };
            let mut registry = state.registry.lock().await;
            let Ok(room) = registry.get_mut(room_code) else {
                let _ = out_tx.send(ServerMessage::RoomError { message: "room no longer exists".to_string() }).await;
                return;
            };
            let outcome = if action_type.ends_with(":ready") {
                room.mark_ready(client_id).map_err(RegistryError::from)
            } else {
                room.dispatch(&action_type, payload).map(|_| false).map_err(RoomError::from).map_err(RegistryError::Room)
            };
            match outcome {
                Ok(just_reset) => {
                    let room_code = room_code.clone();
                    drop(registry);
                    broadcast_room(state, &room_code, just_reset).await;
                }
                Err(err) => {
                    drop(registry);
                    let _ = out_tx.send(ServerMessage::RoomError { message: err.to_string() }).await;
                }
            }
        }
    }
}

async fn register_conn(state: &AppState, room_code: &str, client_id: &str, sender: mpsc::Sender<ServerMessage>) {
    let mut conns = state.conns.lock().await;
    conns.entry(room_code.to_string()).or_default().insert(client_id.to_string(), sender);
}

async fn unregister_conn(state: &AppState, room_code: &str, client_id: &str) {
    let mut conns = state.conns.lock().await;
    if let Some(table) = conns.get_mut(room_code) {
        table.remove(client_id);
        if table.is_empty() {
            conns.remove(room_code);
        }
    }
}

/// Sends a fresh `state` frame to every connected seat of `room_code`, each
/// built from that seat's own [`crate::seat_view::SeatView`] filtering.
async fn broadcast_room(state: &AppState, room_code: &str, just_reset: bool) {
    let registry = state.registry.lock().await;
    let Ok(room) = registry.get(room_code) else { return };
    let per_client: Vec<(String, ServerMessage)> = room
        .occupied_seats()
        .filter_map(|seat| {
            let client_id = room.client_id_at(seat)?;
            Some((client_id.to_string(), room.state_message_for(seat, just_reset)))
        })
        .collect();
    drop(registry);

    let conns = state.conns.lock().await;
    let Some(table) = conns.get(room_code) else { return };
    for (client_id, message) in per_client {
        if let Some(sender) = table.get(&client_id) {
            let _ = sender.send(message).await;
        }
    }
}

async fn on_disconnect(state: &AppState, room_code: String, client_id: String) {
    {
        let mut registry = state.registry.lock().await;
        if let Ok(room) = registry.get_mut(&room_code) {
            room.mark_disconnected(&client_id);
        }
    }
    unregister_conn(state, &room_code, &client_id).await;

    let grace = state.reconnect_grace;
    let state = state.clone();
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        let mut registry = state.registry.lock().await;
        let Ok(room) = registry.get_mut(&room_code) else { return };
        let still_disconnected = room.is_connected(&client_id) == Some(false);
        if still_disconnected {
            room.leave(&client_id);
            info!(room_code = %room_code, client_id = %client_id, "reconnect grace elapsed; seat released");
            if room.is_empty() {
                registry.remove(&room_code);
                info!(room_code = %room_code, "room deleted: empty after grace period");
            }
        }
    });
}
