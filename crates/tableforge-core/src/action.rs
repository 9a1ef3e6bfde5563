// SPDX-License-Identifier: Apache-2.0
//! Action records — the wire/history representation of a dispatched
//! command (spec.md §6 "Action wire format").

use serde::{Deserialize, Serialize};

use crate::ident::{PlacementId, TokenId};
use crate::world::{Agent, GameState, Placement, SourceInspection, Transaction};

/// The typed result a handler hands back to the dispatcher. Serializes to
/// the `result` field of an [`Action`] and to event payloads; the fallback
/// registry's handlers return [`ActionResult::Json`] directly, since their
/// payload shape is open per spec.md's Design Notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionResult {
    /// No meaningful return value.
    Unit,
    /// A boolean result (e.g. `tokens:count` predicates collapsed to `find`).
    Bool(bool),
    /// A count.
    Count(usize),
    /// A single token id.
    Token(TokenId),
    /// An optional token id (e.g. `batch:find`, `token:detach`).
    OptionToken(Option<TokenId>),
    /// An ordered list of token ids (draw/peek/burn/split/filter/map results).
    Tokens(Vec<TokenId>),
    /// A list of decks (each an ordered list of token ids), for `batch:shuffle`/`batch:draw`.
    Decks(Vec<Vec<TokenId>>),
    /// `batch:draw`'s combined `{drawn, decks}` result.
    BatchDraw {
        /// Tokens drawn from each deck, in deck order.
        drawn: Vec<Vec<TokenId>>,
        /// The decks after drawing.
        decks: Vec<Vec<TokenId>>,
    },
    /// A single placement.
    Placement(Placement),
    /// An optional placement (`space:remove` when nothing was there, etc.).
    OptionPlacement(Option<Placement>),
    /// One agent's public view.
    Agent(Agent),
    /// Every agent's public view.
    Agents(Vec<Agent>),
    /// A completed agent-to-agent transaction.
    Transaction(Transaction),
    /// Summary statistics over a `Source`.
    SourceInspection(SourceInspection),
    /// Session-level lifecycle state.
    GameState(GameState),
    /// Catch-all for fallback-registry handlers and the debug probe.
    Json(serde_json::Value),
}

impl From<()> for ActionResult {
    fn from(_: ()) -> Self {
        ActionResult::Unit
    }
}

/// An appended-to-history record of one dispatched action, matching
/// spec.md §6's wire format exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Engine-generated identifier. Consumers SHOULD NOT fabricate one.
    pub id: String,
    /// The dispatched type string (e.g. `"stack:draw"`).
    #[serde(rename = "type")]
    pub kind: String,
    /// The payload the caller supplied.
    pub payload: serde_json::Value,
    /// Seed used, if the action was a seeded shuffle.
    pub seed: Option<u64>,
    /// Advisory reversibility, used by undo/redo.
    pub reversible: bool,
    /// Logical timestamp (milliseconds since epoch).
    pub timestamp: i64,
    /// The handler's result, once known.
    pub result: Option<ActionResult>,
}

/// A scripted or effect-produced action spec prior to dispatch (no id/
/// timestamp/result yet — those are assigned at dispatch time).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    /// The action type to dispatch.
    #[serde(rename = "type")]
    pub kind: String,
    /// Payload for the action.
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Delay, in milliseconds, to wait before dispatching this step
    /// (used by [`crate::script::Script`]).
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

/// A reference to a placement by zone and id, used where handlers accept
/// either the token or the placement shorthand.
pub type ZonePlacement = (String, PlacementId);
