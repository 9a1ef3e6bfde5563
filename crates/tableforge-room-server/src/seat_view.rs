// SPDX-License-Identifier: Apache-2.0
//! Per-seat observation filtering (spec.md §4.10: "the mirrored state
//! includes per-seat observation filtering ... Observation filtering is
//! the room server's responsibility; the Engine exposes the raw state").
//!
//! The core ships no game rules, so it has no way to know which fields of
//! a [`tableforge_core::WorldDocument`] are hidden information for a given
//! seat. [`SeatView`] is the seam an embedder implements to encode that
//! policy; [`IdentitySeatView`] is the default — full visibility for every
//! seat — so a consumer opts into hiding information rather than the room
//! server guessing at one.

use tableforge_core::WorldDocument;

/// Filters a room's [`WorldDocument`] down to what a given seat is allowed
/// to observe.
pub trait SeatView: Send + Sync {
    /// Returns the view of `state` that `seat` should receive. The
    /// returned value is serialized verbatim into the `state` frame's
    /// `_gameState` field for that seat.
    fn view_for(&self, state: &WorldDocument, seat: usize) -> serde_json::Value;
}

/// No filtering: every seat observes the full document. The default for
/// [`crate::room::Room`].
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentitySeatView;

impl SeatView for IdentitySeatView {
    fn view_for(&self, state: &WorldDocument, _seat: usize) -> serde_json::Value {
        serde_json::to_value(state).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tableforge_core::Engine;

    #[test]
    fn identity_view_exposes_the_whole_document() {
        let mut engine = Engine::new();
        engine.dispatch("agent:create", serde_json::json!({"name": "alice"})).unwrap();
        let view = IdentitySeatView.view_for(engine.chronicle().state(), 0);
        assert!(view.get("agents").is_some());
    }
}
