// SPDX-License-Identifier: Apache-2.0
//! GameState: a keyed map tracking session-level lifecycle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default phase progression used by `game:nextPhase` when no explicit
/// target phase is given.
pub const DEFAULT_PHASES: [&str; 4] = ["setup", "play", "scoring", "end"];

/// Session-level lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Whether the game has started.
    pub started: bool,
    /// Whether the game has ended.
    pub ended: bool,
    /// Whether the game is currently paused.
    pub paused: bool,
    /// Current phase name, if the game uses phases.
    pub phase: Option<String>,
    /// Current turn counter.
    pub turn: u64,
    /// Declared winner, if any.
    pub winner: Option<String>,
    /// Logical start time (set by `game:start`).
    pub start_time: Option<i64>,
    /// Arbitrary consumer-defined keys.
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            started: false,
            ended: false,
            paused: false,
            phase: None,
            turn: 0,
            winner: None,
            start_time: None,
            extra: BTreeMap::new(),
        }
    }
}

impl GameState {
    /// Marks the game started at the given logical timestamp.
    pub fn start(&mut self, now: i64) {
        self.started = true;
        self.ended = false;
        self.start_time = Some(now);
        self.phase = Some(DEFAULT_PHASES[0].to_string());
    }

    /// Marks the game ended, recording an optional winner and reason.
    pub fn end(&mut self, winner: Option<String>, reason: Option<String>) {
        self.ended = true;
        self.paused = false;
        self.winner = winner;
        if let Some(reason) = reason {
            self.extra
                .insert("endReason".to_string(), serde_json::Value::String(reason));
        }
    }

    /// Advances to the next phase in [`DEFAULT_PHASES`], or to an explicit
    /// phase if one is given.
    pub fn next_phase(&mut self, explicit: Option<String>) {
        self.phase = Some(explicit.unwrap_or_else(|| {
            let current = self.phase.as_deref().unwrap_or(DEFAULT_PHASES[0]);
            let idx = DEFAULT_PHASES
                .iter()
                .position(|p| *p == current)
                .unwrap_or(0);
            DEFAULT_PHASES[(idx + 1).min(DEFAULT_PHASES.len() - 1)].to_string()
        }));
    }

    /// Resets to a fresh, unstarted game (used by the room server's
    /// readiness/reset lifecycle).
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_phase_defaults_progress_in_order() {
        let mut gs = GameState::default();
        gs.start(0);
        assert_eq!(gs.phase.as_deref(), Some("setup"));
        gs.next_phase(None);
        assert_eq!(gs.phase.as_deref(), Some("play"));
        gs.next_phase(None);
        assert_eq!(gs.phase.as_deref(), Some("scoring"));
        gs.next_phase(None);
        assert_eq!(gs.phase.as_deref(), Some("end"));
        gs.next_phase(None);
        assert_eq!(gs.phase.as_deref(), Some("end"));
    }
}
