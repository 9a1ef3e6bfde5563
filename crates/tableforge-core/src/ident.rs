// SPDX-License-Identifier: Apache-2.0
//! Identifier types shared across the world primitives and the Chronicle.

use serde::{Deserialize, Serialize};

/// Canonical 256-bit content hash used for Chronicle snapshot digests.
pub type Hash = [u8; 32];

/// Stable identifier for a [`crate::world::token::Token`].
///
/// Identifiers are generated by the engine from a monotonic counter; callers
/// must never fabricate one (mirrors the Action record's own id policy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId(pub u64);

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "token-{}", self.0)
    }
}

/// Stable identifier for a placement inside a [`crate::world::space::Space`] zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlacementId(pub u64);

impl std::fmt::Display for PlacementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "placement-{}", self.0)
    }
}

/// Monotonic counter that hands out identifiers, wrapping past zero and
/// skipping it (zero is reserved as a sentinel "no id" value on the wire).
#[derive(Debug, Clone, Default)]
pub struct IdCounter(u64);

impl IdCounter {
    /// Returns the next identifier value, skipping zero.
    pub fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(1);
        if self.0 == 0 {
            self.0 = 1;
        }
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_counter_never_yields_zero() {
        let mut c = IdCounter(u64::MAX);
        assert_eq!(c.next(), 1);
    }

    #[test]
    fn id_counter_is_monotonic() {
        let mut c = IdCounter::default();
        let a = c.next();
        let b = c.next();
        assert!(b > a);
    }
}
