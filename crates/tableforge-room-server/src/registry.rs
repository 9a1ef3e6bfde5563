// SPDX-License-Identifier: Apache-2.0
//! Process-wide room registry: code allocation, admission control
//! (`maxRooms`), and lookup. Owns no transport; [`crate::server`] drives
//! this through an `Arc<Mutex<RoomRegistry>>`.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;

use crate::protocol::RoomSummary;
use crate::room::{Room, RoomError};
use crate::seat_view::{IdentitySeatView, SeatView};

/// Registry-wide configuration (spec.md §6: room server options
/// `{port, verbose, maxRooms}`).
#[derive(Debug, Clone)]
pub struct RoomRegistryConfig {
    /// Maximum number of concurrently open rooms.
    pub max_rooms: usize,
    /// Seat count assumed for `room:create` calls that omit `maxMembers`.
    pub default_max_members: usize,
    /// Attempts to make before giving up on a colliding room code.
    pub code_retry_attempts: u32,
}

impl Default for RoomRegistryConfig {
    fn default() -> Self {
        Self {
            max_rooms: 256,
            default_max_members: 4,
            code_retry_attempts: 16,
        }
    }
}

/// Errors raised allocating or looking up a room.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The registry is already at `max_rooms`.
    #[error("server is at capacity ({0} rooms)")]
    AtCapacity(usize),
    /// No room is open under the given code.
    #[error("no room with that code")]
    NotFound,
    /// A room-local operation failed.
    #[error(transparent)]
    Room(#[from] RoomError),
}

/// Owns every open [`Room`], keyed by its human-shareable code.
pub struct RoomRegistry {
    config: RoomRegistryConfig,
    rooms: HashMap<String, Room>,
    seat_view_factory: Arc<dyn Fn() -> Arc<dyn SeatView> + Send + Sync>,
}

impl RoomRegistry {
    /// Creates an empty registry using [`IdentitySeatView`] for every room.
    pub fn new(config: RoomRegistryConfig) -> Self {
        Self::with_seat_view(config, || Arc::new(IdentitySeatView))
    }

    /// Creates an empty registry, constructing a fresh [`SeatView`] for
    /// each room via `seat_view_factory`.
    pub fn with_seat_view<F>(config: RoomRegistryConfig, seat_view_factory: F) -> Self
    where
        F: Fn() -> Arc<dyn SeatView> + Send + Sync + 'static,
    {
        Self {
            config,
            rooms: HashMap::new(),
            seat_view_factory: Arc::new(seat_view_factory),
        }
    }

    /// Allocates a new room, generating a unique code. Fails with
    /// [`RegistryError::AtCapacity`] once `max_rooms` rooms are open.
    pub fn create_room(
        &mut self,
        variant: Option<String>,
        password: Option<String>,
        max_members: Option<usize>,
        is_private: bool,
    ) -> Result<&mut Room, RegistryError> {
        if self.rooms.len() >= self.config.max_rooms {
            return Err(RegistryError::AtCapacity(self.config.max_rooms));
        }
        let code = self.allocate_code()?;
        let room = Room::new(
            code.clone(),
            max_members.unwrap_or(self.config.default_max_members),
            variant,
            password,
            is_private,
            (self.seat_view_factory)(),
        );
        Ok(self.rooms.entry(code).or_insert(room))
    }

    fn allocate_code(&self) -> Result<String, RegistryError> {
        let mut rng = rand::thread_rng();
        for _ in 0..self.config.code_retry_attempts {
            let code = random_room_code(&mut rng);
            if !self.rooms.contains_key(&code) {
                return Ok(code);
            }
        }
        Err(RegistryError::AtCapacity(self.config.max_rooms))
    }

    /// Looks up a room by code.
    pub fn get_mut(&mut self, code: &str) -> Result<&mut Room, RegistryError> {
        self.rooms.get_mut(code).ok_or(RegistryError::NotFound)
    }

    /// Looks up a room by code, immutably.
    pub fn get(&self, code: &str) -> Result<&Room, RegistryError> {
        self.rooms.get(code).ok_or(RegistryError::NotFound)
    }

    /// Deletes a room outright (spec.md: "When all seats leave, the room
    /// is deleted").
    pub fn remove(&mut self, code: &str) {
        self.rooms.remove(code);
    }

    /// Public, non-full rooms for a `room:list` response.
    pub fn list_public(&self) -> Vec<RoomSummary> {
        self.rooms
            .values()
            .filter(|r| !r.is_private() && !r.is_full())
            .map(|r| RoomSummary {
                room_code: r.code().to_string(),
                members: r.member_count(),
                max_members: r.max_members(),
                variant: r.variant().map(str::to_string),
            })
            .collect()
    }

    /// Finds the room (if any) containing a seat bound to `client_id`.
    pub fn room_of_client(&self, client_id: &str) -> Option<&str> {
        self.rooms
            .values()
            .find(|r| r.seat_of(client_id).is_some())
            .map(Room::code)
    }

    /// Currently open room count.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

fn random_room_code(rng: &mut impl Rng) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
    let letters: String = (0..4).map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char).collect();
    let digits: u32 = rng.gen_range(0..10_000);
    format!("{letters}-{digits:04}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn create_room_allocates_a_unique_code_and_seats_nobody_yet() {
        let mut registry = RoomRegistry::new(RoomRegistryConfig::default());
        let room = registry.create_room(Some("classic".to_string()), None, Some(2), false).unwrap();
        assert_eq!(room.member_count(), 0);
        assert_eq!(registry.room_count(), 1);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut registry = RoomRegistry::new(RoomRegistryConfig { max_rooms: 1, ..RoomRegistryConfig::default() });
        registry.create_room(None, None, None, false).unwrap();
        assert!(matches!(
            registry.create_room(None, None, None, false),
            Err(RegistryError::AtCapacity(1))
        ));
    }

    #[test]
    fn private_rooms_are_excluded_from_the_public_list() {
        let mut registry = RoomRegistry::new(RoomRegistryConfig::default());
        registry.create_room(None, None, None, true).unwrap();
        registry.create_room(None, None, None, false).unwrap();
        assert_eq!(registry.list_public().len(), 1);
    }

    #[test]
    fn room_is_removed_once_empty() {
        let mut registry = RoomRegistry::new(RoomRegistryConfig::default());
        let code = registry.create_room(None, None, Some(1), false).unwrap().code().to_string();
        registry.get_mut(&code).unwrap().join("alice", None).unwrap();
        registry.get_mut(&code).unwrap().leave("alice");
        assert!(registry.get(&code).unwrap().is_empty());
        registry.remove(&code);
        assert!(matches!(registry.get(&code), Err(RegistryError::NotFound)));
    }
}
