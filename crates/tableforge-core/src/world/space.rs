// SPDX-License-Identifier: Apache-2.0
//! Space: a set of named zones, each an ordered sequence of placements.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ident::{IdCounter, PlacementId, TokenId};

/// A token's current board position within a zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    /// Identifier unique within the owning zone.
    pub id: PlacementId,
    /// The placed token.
    pub token: TokenId,
    /// Optional X coordinate.
    pub x: Option<f64>,
    /// Optional Y coordinate.
    pub y: Option<f64>,
    /// Whether the placement is face-up.
    pub face_up: bool,
    /// Optional display label for the placement (distinct from the token's own label).
    pub label: Option<String>,
}

/// A named ordered sequence of placements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Zone {
    /// Locked zones reject mutations.
    pub locked: bool,
    /// Free-form tags (e.g. `"discard"`, `"hand"`).
    pub tags: Vec<String>,
    placements: Vec<Placement>,
}

impl Zone {
    /// Read-only view of the zone's placements, in order.
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Finds a placement by id.
    pub fn placement(&self, id: PlacementId) -> Option<&Placement> {
        self.placements.iter().find(|p| p.id == id)
    }
}

/// Errors raised by space operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SpaceError {
    /// The named zone does not exist.
    #[error("zone '{0}' does not exist")]
    NoSuchZone(String),
    /// The zone is locked and rejects mutation.
    #[error("zone '{0}' is locked")]
    ZoneLocked(String),
    /// The named placement does not exist in the zone.
    #[error("placement {0} not found in zone '{1}'")]
    NoSuchPlacement(PlacementId, String),
    /// A zone with this name already exists.
    #[error("zone '{0}' already exists")]
    ZoneExists(String),
}

/// A set of named zones, each an ordered sequence of placements.
///
/// Invariant: each placement id is unique within its owning zone; each token
/// appears in at most one placement across the whole `Space` at any time —
/// the latter is enforced by [`crate::world::WorldDocument`], which is the
/// only code allowed to call [`Space::place_raw`]/[`Space::remove_raw`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Space {
    zones: BTreeMap<String, Zone>,
    #[serde(skip)]
    placement_ids: IdCounter,
}

impl Space {
    /// Creates a named, empty zone.
    pub fn create_zone(&mut self, name: impl Into<String>) -> Result<(), SpaceError> {
        let name = name.into();
        if self.zones.contains_key(&name) {
            return Err(SpaceError::ZoneExists(name));
        }
        self.zones.insert(name, Zone::default());
        Ok(())
    }

    /// Deletes a zone. Returns the token ids that were scrapped along with it
    /// (the caller routes them to wherever "deleted" tokens go).
    pub fn delete_zone(&mut self, name: &str) -> Result<Vec<TokenId>, SpaceError> {
        let zone = self
            .zones
            .remove(name)
            .ok_or_else(|| SpaceError::NoSuchZone(name.to_string()))?;
        Ok(zone.placements.into_iter().map(|p| p.token).collect())
    }

    /// Borrows a zone by name.
    pub fn zone(&self, name: &str) -> Option<&Zone> {
        self.zones.get(name)
    }

    /// Iterates over all zones by name.
    pub fn zones(&self) -> impl Iterator<Item = (&String, &Zone)> {
        self.zones.iter()
    }

    /// Locks or unlocks a zone.
    pub fn lock_zone(&mut self, name: &str, locked: bool) -> Result<(), SpaceError> {
        self.zone_mut(name)?.locked = locked;
        Ok(())
    }

    /// Clears every placement from a zone, returning the displaced tokens.
    pub fn clear_zone(&mut self, name: &str) -> Result<Vec<TokenId>, SpaceError> {
        let zone = self.zone_mut_checked(name)?;
        Ok(std::mem::take(&mut zone.placements)
            .into_iter()
            .map(|p| p.token)
            .collect())
    }

    /// Places `token` into `zone`, returning the new placement.
    pub fn place(
        &mut self,
        zone: &str,
        token: TokenId,
        x: Option<f64>,
        y: Option<f64>,
        face_up: bool,
        label: Option<String>,
    ) -> Result<Placement, SpaceError> {
        let id = PlacementId(self.placement_ids.next());
        let z = self.zone_mut_checked(zone)?;
        let placement = Placement {
            id,
            token,
            x,
            y,
            face_up,
            label,
        };
        z.placements.push(placement.clone());
        Ok(placement)
    }

    /// Moves a placement from one zone to another, optionally repositioning it.
    pub fn move_placement(
        &mut self,
        from: &str,
        to: &str,
        placement: PlacementId,
        x: Option<f64>,
        y: Option<f64>,
    ) -> Result<Placement, SpaceError> {
        let from_zone = self.zone_mut_checked(from)?;
        let idx = from_zone
            .placements
            .iter()
            .position(|p| p.id == placement)
            .ok_or_else(|| SpaceError::NoSuchPlacement(placement, from.to_string()))?;
        let mut moved = from_zone.placements.remove(idx);
        if x.is_some() {
            moved.x = x;
        }
        if y.is_some() {
            moved.y = y;
        }
        let to_zone = self.zone_mut_checked(to)?;
        to_zone.placements.push(moved.clone());
        Ok(moved)
    }

    /// Flips a placement's face orientation (or sets it explicitly).
    pub fn flip(
        &mut self,
        zone: &str,
        placement: PlacementId,
        face_up: Option<bool>,
    ) -> Result<Placement, SpaceError> {
        let z = self.zone_mut_checked(zone)?;
        let p = z
            .placements
            .iter_mut()
            .find(|p| p.id == placement)
            .ok_or_else(|| SpaceError::NoSuchPlacement(placement, zone.to_string()))?;
        p.face_up = face_up.unwrap_or(!p.face_up);
        Ok(p.clone())
    }

    /// Removes a placement from a zone, returning it.
    pub fn remove(&mut self, zone: &str, placement: PlacementId) -> Result<Placement, SpaceError> {
        let z = self.zone_mut_checked(zone)?;
        let idx = z
            .placements
            .iter()
            .position(|p| p.id == placement)
            .ok_or_else(|| SpaceError::NoSuchPlacement(placement, zone.to_string()))?;
        Ok(z.placements.remove(idx))
    }

    /// Transfers every placement from one zone to another, preserving order.
    pub fn transfer_zone(&mut self, from: &str, to: &str) -> Result<(), SpaceError> {
        let moved = std::mem::take(&mut self.zone_mut_checked(from)?.placements);
        self.zone_mut_checked(to)?.placements.extend(moved);
        Ok(())
    }

    /// Shuffles the placement order within a zone (does not alter coordinates).
    pub fn shuffle_zone(&mut self, name: &str, seed: Option<u64>) -> Result<(), SpaceError> {
        use rand::rngs::StdRng;
        use rand::seq::SliceRandom;
        use rand::SeedableRng;
        let z = self.zone_mut_checked(name)?;
        match seed {
            Some(s) => {
                let mut rng = StdRng::seed_from_u64(s);
                z.placements.shuffle(&mut rng);
            }
            None => {
                let mut rng = rand::thread_rng();
                z.placements.shuffle(&mut rng);
            }
        }
        Ok(())
    }

    /// Arranges a zone's placements in a fan around `(center_x, center_y)`.
    pub fn fan_zone(
        &mut self,
        name: &str,
        center_x: f64,
        center_y: f64,
        radius: f64,
        arc_angle_degrees: f64,
    ) -> Result<(), SpaceError> {
        let z = self.zone_mut_checked(name)?;
        let n = z.placements.len();
        if n == 0 {
            return Ok(());
        }
        let arc = arc_angle_degrees.to_radians();
        let start = -arc / 2.0;
        let step = if n > 1 { arc / (n - 1) as f64 } else { 0.0 };
        for (i, p) in z.placements.iter_mut().enumerate() {
            let angle = start + step * i as f64;
            p.x = Some(center_x + radius * angle.sin());
            p.y = Some(center_y - radius * angle.cos());
        }
        Ok(())
    }

    /// Stacks every placement in a zone at the same coordinate, offsetting
    /// each by `offset_y` so later placements render above earlier ones.
    pub fn stack_zone(
        &mut self,
        name: &str,
        x: f64,
        y: f64,
        offset_y: f64,
    ) -> Result<(), SpaceError> {
        let z = self.zone_mut_checked(name)?;
        for (i, p) in z.placements.iter_mut().enumerate() {
            p.x = Some(x);
            p.y = Some(y - offset_y * i as f64);
        }
        Ok(())
    }

    /// Spreads a zone's placements linearly from `(start_x, start_y)`.
    pub fn spread_zone(
        &mut self,
        name: &str,
        start_x: f64,
        start_y: f64,
        spacing: f64,
        horizontal: bool,
    ) -> Result<(), SpaceError> {
        let z = self.zone_mut_checked(name)?;
        for (i, p) in z.placements.iter_mut().enumerate() {
            let offset = spacing * i as f64;
            if horizontal {
                p.x = Some(start_x + offset);
                p.y = Some(start_y);
            } else {
                p.x = Some(start_x);
                p.y = Some(start_y + offset);
            }
        }
        Ok(())
    }

    fn zone_mut(&mut self, name: &str) -> Result<&mut Zone, SpaceError> {
        self.zones
            .get_mut(name)
            .ok_or_else(|| SpaceError::NoSuchZone(name.to_string()))
    }

    /// Like [`Space::zone_mut`] but additionally rejects locked zones; used
    /// by every mutating operation above except lock/unlock itself.
    fn zone_mut_checked(&mut self, name: &str) -> Result<&mut Zone, SpaceError> {
        let z = self.zone_mut(name)?;
        if z.locked {
            return Err(SpaceError::ZoneLocked(name.to_string()));
        }
        Ok(z)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn place_then_remove_preserves_placement_id_set() {
        let mut space = Space::default();
        space.create_zone("hand").unwrap();
        let p1 = space.place("hand", TokenId(1), None, None, true, None).unwrap();
        let p2 = space.place("hand", TokenId(2), None, None, true, None).unwrap();
        let before: std::collections::BTreeSet<_> =
            space.zone("hand").unwrap().placements().iter().map(|p| p.id).collect();
        space.remove("hand", p1.id).unwrap();
        space.place("hand", TokenId(3), None, None, true, None).unwrap();
        // p2's id must still be present; overall cardinality restored.
        let after: std::collections::BTreeSet<_> =
            space.zone("hand").unwrap().placements().iter().map(|p| p.id).collect();
        assert!(after.contains(&p2.id));
        assert_eq!(before.len(), after.len());
    }

    #[test]
    fn locked_zone_rejects_mutation() {
        let mut space = Space::default();
        space.create_zone("vault").unwrap();
        space.lock_zone("vault", true).unwrap();
        let result = space.place("vault", TokenId(1), None, None, true, None);
        assert_eq!(result.unwrap_err(), SpaceError::ZoneLocked("vault".to_string()));
    }

    #[test]
    fn delete_nonempty_zone_scraps_its_placements() {
        let mut space = Space::default();
        space.create_zone("discard").unwrap();
        space.place("discard", TokenId(1), None, None, true, None).unwrap();
        let scrapped = space.delete_zone("discard").unwrap();
        assert_eq!(scrapped, vec![TokenId(1)]);
        assert!(space.zone("discard").is_none());
    }
}
