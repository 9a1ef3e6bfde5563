// SPDX-License-Identifier: Apache-2.0
//! JSON wire protocol for the room server (spec.md §4.10's table). Each
//! message is a flat, internally-tagged object: `{"type": "...", ...}`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A message a client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    /// `room:create` — allocate a new room, seating the sender as seat 0.
    #[serde(rename = "room:create")]
    RoomCreate {
        /// Opaque, embedder-defined game variant tag.
        variant: Option<String>,
        /// Join password; rooms with one reject joins that don't match.
        password: Option<String>,
        /// Maximum seats; defaults to the registry's configured default.
        #[serde(rename = "maxMembers")]
        max_members: Option<usize>,
        /// Omit this room from `room:list` responses when `true`.
        #[serde(rename = "isPrivate")]
        is_private: Option<bool>,
        /// Stable client identity, persisted across socket lifetimes.
        #[serde(rename = "clientId")]
        client_id: String,
    },
    /// `room:join` — seat the sender at the next free index.
    #[serde(rename = "room:join")]
    RoomJoin {
        /// Room code to join.
        #[serde(rename = "roomCode")]
        room_code: String,
        /// Must match the room's password, if one was set.
        password: Option<String>,
        /// Stable client identity, persisted across socket lifetimes.
        #[serde(rename = "clientId")]
        client_id: String,
    },
    /// `room:leave` — release the sender's seat.
    #[serde(rename = "room:leave")]
    RoomLeave,
    /// `room:list` — list public, non-full rooms.
    #[serde(rename = "room:list")]
    RoomList,
    /// `dispatch` — forward an action to the room's Engine.
    #[serde(rename = "dispatch")]
    Dispatch {
        /// The action type, e.g. `"agent:giveResource"`.
        #[serde(rename = "type")]
        action_type: String,
        /// The action payload.
        payload: serde_json::Value,
    },
}

/// A message the server may send.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "camelCase")]
pub enum ServerMessage {
    /// First frame after socket open (spec.md §4.10, §6).
    #[serde(rename = "welcome")]
    Welcome {
        /// Whether this `clientId` already occupies a seat in some room.
        in_room: bool,
    },
    /// Ack for `room:create`.
    #[serde(rename = "room:created")]
    RoomCreated {
        /// The newly allocated room code.
        #[serde(rename = "roomCode")]
        room_code: String,
        /// The room's current state, from the creating seat's view.
        state: serde_json::Value,
    },
    /// Ack for `room:join`.
    #[serde(rename = "room:joined")]
    RoomJoined {
        /// The joined room's code.
        #[serde(rename = "roomCode")]
        room_code: String,
        /// The seat index assigned (or resumed, on reconnect).
        #[serde(rename = "playerIndex")]
        player_index: usize,
        /// The room's current state, from the joining seat's view.
        state: serde_json::Value,
    },
    /// Ack for `room:leave`.
    #[serde(rename = "room:left")]
    RoomLeft,
    /// Response to `room:list`.
    #[serde(rename = "room:list")]
    RoomList {
        /// Public, non-full rooms currently open.
        rooms: Vec<RoomSummary>,
    },
    /// Any room-level failure, sent only to the offending client.
    #[serde(rename = "room:error")]
    RoomError {
        /// Human-readable failure description.
        message: String,
    },
    /// Full broadcast after any dispatch, sent to every seat of a room.
    #[serde(rename = "state")]
    State {
        /// Per-seat-filtered world state (see [`crate::seat_view::SeatView`]).
        #[serde(rename = "_gameState")]
        game_state: serde_json::Value,
        /// Advisory valid-action type list, keyed by seat index as a string.
        #[serde(rename = "validActions")]
        valid_actions: HashMap<String, Vec<String>>,
        /// The room this broadcast belongs to.
        #[serde(rename = "roomCode")]
        room_code: String,
        /// Present (and `true`) on the broadcast immediately following a
        /// ready/reset transition, so clients can dismiss end-game UI.
        #[serde(rename = "readyForNextGame", skip_serializing_if = "Option::is_none")]
        ready_for_next_game: Option<ReadyForNextGame>,
    },
}

/// Empty marker object per spec.md §4.10 ("carries `readyForNextGame: {}`").
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReadyForNextGame {}

/// One entry of a `room:list` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    /// The room's code.
    pub room_code: String,
    /// Occupied seat count.
    pub members: usize,
    /// Maximum seat count.
    pub max_members: usize,
    /// Embedder-defined game variant tag, if any.
    pub variant: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn room_create_parses_camel_case_fields() {
        let raw = serde_json::json!({
            "type": "room:create",
            "variant": "classic",
            "password": null,
            "maxMembers": 4,
            "isPrivate": false,
            "clientId": "client-1",
        });
        assert!(matches!(
            &serde_json::from_value::<ClientMessage>(raw).unwrap(),
            ClientMessage::RoomCreate { client_id, max_members: Some(4), .. } if client_id == "client-1"
        ));
    }

    #[test]
    fn state_message_serializes_with_tag_and_optional_ready_marker() {
        let msg = ServerMessage::State {
            game_state: serde_json::json!({}),
            valid_actions: HashMap::new(),
            room_code: "ABCD-1234".to_string(),
            ready_for_next_game: None,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "state");
        assert!(value.get("readyForNextGame").is_none());
    }
}
