// SPDX-License-Identifier: Apache-2.0
//! A single room: one [`tableforge_core::Engine`], a fixed seat table, and
//! the admission/seating/readiness rules spec.md §4.10 assigns to it.
//!
//! The core ships no domain-specific game variant, so the "domain-specific
//! `*:register` action" and "domain-specific reset action" spec.md
//! describes are realized here with the generic native actions that
//! already exist for exactly this purpose: `agent:create` seats a client
//! as an agent named after its `clientId`, and `game:reset` is the reset
//! action. Readiness has no native counterpart (inventing one would widen
//! the closed ~68-action set), so it is tracked as room-local bookkeeping
//! rather than dispatched into the Engine.

use std::collections::HashMap;
use std::sync::Arc;

use tableforge_core::{Action, ChronicleError, Engine};
use thiserror::Error;

use crate::protocol::{ReadyForNextGame, ServerMessage};
use crate::seat_view::SeatView;

/// Errors a room operation can fail with. Every variant maps to a
/// `room:error` frame sent only to the offending client (spec.md §4.10).
#[derive(Debug, Error)]
pub enum RoomError {
    /// The room is already at `max_members`.
    #[error("room is full")]
    Full,
    /// A `password` was required and missing or incorrect.
    #[error("invalid password")]
    BadPassword,
    /// No seat is currently bound to the given `clientId`.
    #[error("client is not seated in this room")]
    NotSeated,
    /// The Engine rejected the registration or dispatch.
    #[error("engine error: {0}")]
    Engine(#[from] ChronicleError),
}

/// One occupied or vacated seat.
#[derive(Debug, Clone)]
pub struct Seat {
    /// The stable client identity bound to this seat.
    pub client_id: String,
    /// `false` while the seat's socket is closed but within its grace
    /// period; the seat still counts toward `members`.
    pub connected: bool,
}

/// One independent game room: seat table plus the Engine it mirrors.
pub struct Room {
    code: String,
    engine: Engine,
    seats: Vec<Option<Seat>>,
    ready: std::collections::HashSet<usize>,
    variant: Option<String>,
    password: Option<String>,
    is_private: bool,
    seat_view: Arc<dyn SeatView>,
}

impl Room {
    /// Creates a room with `max_members` seats, all initially vacant.
    pub fn new(
        code: impl Into<String>,
        max_members: usize,
        variant: Option<String>,
        password: Option<String>,
        is_private: bool,
        seat_view: Arc<dyn SeatView>,
    ) -> Self {
        Self {
            code: code.into(),
            engine: Engine::new(),
            seats: vec![None; max_members.max(1)],
            ready: std::collections::HashSet::new(),
            variant,
            password,
            is_private,
            seat_view,
        }
    }

    /// The room's code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Whether this room should be omitted from `room:list` responses.
    pub fn is_private(&self) -> bool {
        self.is_private
    }

    /// Embedder-defined game variant tag, if any.
    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    /// Maximum seat count.
    pub fn max_members(&self) -> usize {
        self.seats.len()
    }

    /// Currently occupied (connected or within grace period) seat count.
    pub fn member_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_some()).count()
    }

    /// Whether every seat is occupied.
    pub fn is_full(&self) -> bool {
        self.member_count() >= self.max_members()
    }

    /// Seat index currently bound to `client_id`, if any.
    pub fn seat_of(&self, client_id: &str) -> Option<usize> {
        self.seats
            .iter()
            .position(|s| s.as_ref().is_some_and(|seat| seat.client_id == client_id))
    }

    /// The `clientId` occupying `seat`, if any.
    pub fn client_id_at(&self, seat: usize) -> Option<&str> {
        self.seats.get(seat)?.as_ref().map(|s| s.client_id.as_str())
    }

    /// Whether `client_id`'s seat (if any) is currently marked connected.
    pub fn is_connected(&self, client_id: &str) -> Option<bool> {
        self.seats
            .iter()
            .find_map(|s| s.as_ref().filter(|seat| seat.client_id == client_id).map(|seat| seat.connected))
    }

    fn lowest_free_seat(&self) -> Option<usize> {
        self.seats.iter().position(Option::is_none)
    }

    /// Validates `password` against the room's, if one was set.
    fn check_password(&self, password: Option<&str>) -> Result<(), RoomError> {
        match &self.password {
            None => Ok(()),
            Some(expected) if password == Some(expected.as_str()) => Ok(()),
            Some(_) => Err(RoomError::BadPassword),
        }
    }

    /// Seats `client_id` at the lowest free index, registering it into the
    /// Engine via `agent:create`. Returns the assigned seat index. If
    /// `client_id` already holds a seat (reconnection), no new seat is
    /// allocated and no re-registration is performed.
    pub fn join(&mut self, client_id: &str, password: Option<&str>) -> Result<usize, RoomError> {
        if let Some(existing) = self.seat_of(client_id) {
            if let Some(seat) = self.seats[existing].as_mut() {
                seat.connected = true;
            }
            return Ok(existing);
        }
        self.check_password(password)?;
        let index = self.lowest_free_seat().ok_or(RoomError::Full)?;
        self.engine.dispatch("agent:create", serde_json::json!({"name": client_id}))?;
        self.seats[index] = Some(Seat {
            client_id: client_id.to_string(),
            connected: true,
        });
        Ok(index)
    }

    /// Marks `client_id`'s seat disconnected without vacating it. Returns
    /// the seat index, or `None` if the client holds no seat here.
    pub fn mark_disconnected(&mut self, client_id: &str) -> Option<usize> {
        let index = self.seat_of(client_id)?;
        if let Some(seat) = self.seats[index].as_mut() {
            seat.connected = false;
        }
        Some(index)
    }

    /// Releases `client_id`'s seat outright (spec.md: `room:leave`, or a
    /// disconnect whose grace period has elapsed). Returns the vacated
    /// seat index.
    pub fn leave(&mut self, client_id: &str) -> Option<usize> {
        let index = self.seat_of(client_id)?;
        self.seats[index] = None;
        self.ready.remove(&index);
        Some(index)
    }

    /// `true` once every occupied seat is empty.
    pub fn is_empty(&self) -> bool {
        self.member_count() == 0
    }

    /// Forwards a client-originated action to the room's Engine.
    pub fn dispatch(&mut self, action_type: &str, payload: serde_json::Value) -> Result<Action, ChronicleError> {
        self.engine.dispatch(action_type, payload)
    }

    /// Marks `client_id`'s seat ready. Once every occupied seat is ready,
    /// resets the Engine (`game:reset`) and clears readiness, returning
    /// `true` to signal the caller should broadcast with
    /// `readyForNextGame` set.
    pub fn mark_ready(&mut self, client_id: &str) -> Result<bool, RoomError> {
        let index = self.seat_of(client_id).ok_or(RoomError::NotSeated)?;
        self.ready.insert(index);
        let occupied: Vec<usize> = self
            .seats
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|_| i))
            .collect();
        if !occupied.is_empty() && occupied.iter().all(|i| self.ready.contains(i)) {
            self.engine.dispatch("game:reset", serde_json::json!({}))?;
            self.ready.clear();
            return Ok(true);
        }
        Ok(false)
    }

    /// The per-seat-filtered game state alone, for `room:created`/`room:joined` acks.
    pub fn game_state_for(&self, seat: usize) -> serde_json::Value {
        self.seat_view.view_for(self.engine.chronicle().state(), seat)
    }

    /// Builds the `state` broadcast frame, per-seat-filtered for `seat`.
    pub fn state_message_for(&self, seat: usize, just_reset: bool) -> ServerMessage {
        let mut valid_actions: HashMap<String, Vec<String>> = HashMap::new();
        let types: Vec<String> = self.engine.available_actions().into_iter().map(|a| a.action_type).collect();
        for (index, occupant) in self.seats.iter().enumerate() {
            if occupant.is_some() {
                valid_actions.insert(index.to_string(), types.clone());
            }
        }
        ServerMessage::State {
            game_state: self.seat_view.view_for(self.engine.chronicle().state(), seat),
            valid_actions,
            room_code: self.code.clone(),
            ready_for_next_game: just_reset.then_some(ReadyForNextGame {}),
        }
    }

    /// Every currently occupied seat index, in seat order.
    pub fn occupied_seats(&self) -> impl Iterator<Item = usize> + '_ {
        self.seats.iter().enumerate().filter_map(|(i, s)| s.as_ref().map(|_| i))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::seat_view::IdentitySeatView;

    fn room(max: usize) -> Room {
        Room::new("ABCD-1234", max, Some("classic".to_string()), None, false, Arc::new(IdentitySeatView))
    }

    #[test]
    fn join_seats_lowest_free_index_and_registers_an_agent() {
        let mut r = room(2);
        assert_eq!(r.join("alice", None).unwrap(), 0);
        assert_eq!(r.join("bob", None).unwrap(), 1);
        assert!(r.engine.chronicle().state().agent("alice").is_some());
        assert!(matches!(r.join("carol", None), Err(RoomError::Full)));
    }

    #[test]
    fn rejoining_the_same_client_resumes_its_seat() {
        let mut r = room(2);
        r.join("alice", None).unwrap();
        r.mark_disconnected("alice");
        let index = r.join("alice", None).unwrap();
        assert_eq!(index, 0);
        assert_eq!(r.member_count(), 1);
    }

    #[test]
    fn leave_vacates_the_seat_and_room_becomes_empty() {
        let mut r = room(1);
        r.join("alice", None).unwrap();
        assert!(!r.is_empty());
        r.leave("alice");
        assert!(r.is_empty());
    }

    #[test]
    fn all_seats_ready_triggers_a_reset_and_clears_readiness() {
        let mut r = room(2);
        r.join("alice", None).unwrap();
        r.join("bob", None).unwrap();
        assert!(!r.mark_ready("alice").unwrap());
        assert!(r.mark_ready("bob").unwrap());
        let msg = r.state_message_for(0, true);
        assert!(matches!(msg, ServerMessage::State { ready_for_next_game: Some(_), .. }));
    }

    #[test]
    fn password_mismatch_is_rejected() {
        let mut r = Room::new("CODE-0001", 2, None, Some("secret".to_string()), false, Arc::new(IdentitySeatView));
        assert!(matches!(r.join("alice", Some("wrong")), Err(RoomError::BadPassword)));
        assert!(r.join("alice", Some("secret")).is_ok());
    }
}
