// SPDX-License-Identifier: Apache-2.0
//! Typed request payloads for the native action set (spec.md §4.3).
//!
//! Each struct mirrors one handler's expected fields. Optional fields carry
//! the defaults spec.md documents (`count=1`, `faceUp=true`, ...) via
//! `#[serde(default = ...)]` so a caller may omit them entirely.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ident::{PlacementId, TokenId};
use crate::world::Token;

fn one() -> usize {
    1
}
fn one_u64() -> u64 {
    1
}
fn zero_pos() -> usize {
    0
}
fn true_default() -> bool {
    true
}
fn radius_default() -> f64 {
    100.0
}
fn arc_default() -> f64 {
    120.0
}
fn spacing_default() -> f64 {
    50.0
}
fn offset_y_default() -> f64 {
    1.0
}

/// `stack:shuffle` / `source:shuffle` / `space:shuffleZone`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedPayload {
    /// Deterministic seed; absent means "sample the process RNG".
    #[serde(default)]
    pub seed: Option<u64>,
}

/// `stack:draw` / `stack:burn` / `source:burn`.
#[derive(Debug, Clone, Deserialize)]
pub struct CountPayload {
    /// Number of tokens to draw/burn.
    #[serde(default = "one")]
    pub count: usize,
}

impl Default for CountPayload {
    fn default() -> Self {
        Self { count: 1 }
    }
}

/// `stack:peek`.
#[derive(Debug, Clone, Deserialize)]
pub struct PeekPayload {
    /// Number of tokens to peek, without removing them.
    #[serde(default = "one")]
    pub count: usize,
}

/// `stack:cut`.
#[derive(Debug, Clone, Deserialize)]
pub struct CutPayload {
    /// Cut position, counted from the bottom.
    pub position: usize,
    /// Whether the top portion moves to the bottom (`true`, default) or vice versa.
    #[serde(default = "true_default")]
    pub top_to_bottom: bool,
}

/// `stack:insertAt`.
#[derive(Debug, Clone, Deserialize)]
pub struct InsertAtPayload {
    /// Token to insert. Must already be spawned and currently detached.
    pub card: TokenId,
    /// Position to insert at (0 = bottom).
    #[serde(default = "zero_pos")]
    pub position: usize,
}

/// `stack:removeAt`.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionPayload {
    /// Position to act on (0 = bottom).
    #[serde(default = "zero_pos")]
    pub position: usize,
}

/// `stack:swap`.
#[derive(Debug, Clone, Deserialize)]
pub struct SwapPayload {
    /// First position.
    pub position1: usize,
    /// Second position.
    pub position2: usize,
}

/// `space:place`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlacePayload {
    /// Destination zone name.
    pub zone: String,
    /// Token to place.
    pub token: TokenId,
    /// Optional X coordinate.
    #[serde(default)]
    pub x: Option<f64>,
    /// Optional Y coordinate.
    #[serde(default)]
    pub y: Option<f64>,
    /// Whether the placement starts face-up.
    #[serde(default = "true_default")]
    pub face_up: bool,
    /// Optional display label for the placement.
    #[serde(default)]
    pub label: Option<String>,
}

/// `space:move`.
#[derive(Debug, Clone, Deserialize)]
pub struct MovePayload {
    /// Source zone.
    pub from: String,
    /// Destination zone.
    pub to: String,
    /// Placement to move.
    pub placement: PlacementId,
    /// Optional new X coordinate.
    #[serde(default)]
    pub x: Option<f64>,
    /// Optional new Y coordinate.
    #[serde(default)]
    pub y: Option<f64>,
}

/// `space:flip`.
#[derive(Debug, Clone, Deserialize)]
pub struct FlipPayload {
    /// Zone the placement lives in.
    pub zone: String,
    /// Placement to flip.
    pub placement: PlacementId,
    /// Explicit orientation; omitted means "toggle".
    #[serde(default)]
    pub face_up: Option<bool>,
}

/// `space:remove`.
#[derive(Debug, Clone, Deserialize)]
pub struct ZonePlacementPayload {
    /// Zone the placement lives in.
    pub zone: String,
    /// Placement to remove.
    pub placement: PlacementId,
}

/// `space:createZone` / `space:deleteZone` / `space:clearZone` / `space:lockZone`'s name field.
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneNamePayload {
    /// Zone name.
    pub name: String,
}

/// `space:createZone`'s optional metadata (accepted, not yet interpreted by core).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateZonePayload {
    /// Zone name.
    pub name: String,
    /// Free-form metadata; the core does not assign it semantics.
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
}

/// `space:shuffleZone`.
#[derive(Debug, Clone, Deserialize)]
pub struct ShuffleZonePayload {
    /// Zone to shuffle.
    pub zone: String,
    /// Deterministic seed.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// `space:transferZone`.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferZonePayload {
    /// Source zone.
    pub from: String,
    /// Destination zone.
    pub to: String,
}

/// `space:fanZone`.
#[derive(Debug, Clone, Deserialize)]
pub struct FanZonePayload {
    /// Zone to fan out.
    pub zone: String,
    /// Fan center X.
    pub center_x: f64,
    /// Fan center Y.
    pub center_y: f64,
    /// Fan radius.
    #[serde(default = "radius_default")]
    pub radius: f64,
    /// Arc angle in degrees.
    #[serde(default = "arc_default")]
    pub arc_angle: f64,
}

/// `space:stackZone`.
#[derive(Debug, Clone, Deserialize)]
pub struct StackZonePayload {
    /// Zone to stack.
    pub zone: String,
    /// Shared X coordinate.
    pub x: f64,
    /// Base Y coordinate.
    pub y: f64,
    /// Per-placement Y offset.
    #[serde(default = "offset_y_default")]
    pub offset_y: f64,
}

/// `space:spreadZone`.
#[derive(Debug, Clone, Deserialize)]
pub struct SpreadZonePayload {
    /// Zone to spread.
    pub zone: String,
    /// Starting X coordinate.
    pub start_x: f64,
    /// Starting Y coordinate.
    pub start_y: f64,
    /// Spacing between placements.
    #[serde(default = "spacing_default")]
    pub spacing: f64,
    /// Spread horizontally (`true`, default) or vertically.
    #[serde(default = "true_default")]
    pub horizontal: bool,
}

/// `space:lockZone`.
#[derive(Debug, Clone, Deserialize)]
pub struct LockZonePayload {
    /// Zone to lock/unlock.
    pub zone: String,
    /// Target lock state.
    #[serde(default = "true_default")]
    pub locked: bool,
}

/// `source:addStack`.
#[derive(Debug, Clone, Deserialize)]
pub struct AddStackPayload {
    /// Token ids making up the new stack, bottom to top.
    pub stack: Vec<TokenId>,
}

/// `source:removeStack`.
#[derive(Debug, Clone, Deserialize)]
pub struct StackIndexPayload {
    /// Index of the stack to remove.
    pub index: usize,
}

/// `agent:create`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAgentPayload {
    /// Agent name (also its lookup key).
    pub name: String,
    /// Free-form metadata, applied after creation.
    #[serde(default)]
    pub meta: Option<BTreeMap<String, serde_json::Value>>,
}

/// `agent:remove` / `agent:get`.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentNamePayload {
    /// Agent name.
    pub name: String,
}

/// `agent:setActive`.
#[derive(Debug, Clone, Deserialize)]
pub struct SetActivePayload {
    /// Agent name.
    pub name: String,
    /// Target active flag.
    #[serde(default = "true_default")]
    pub active: bool,
}

/// `agent:giveResource` / `agent:takeResource`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceAmountPayload {
    /// Agent name.
    pub name: String,
    /// Resource key.
    pub resource: String,
    /// Amount to give/take.
    #[serde(default = "one_u64")]
    pub amount: u64,
}

/// `agent:addToken`.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentTokenPayload {
    /// Agent name.
    pub name: String,
    /// Token to add to the agent's inventory.
    pub token: TokenId,
}

/// `agent:removeToken`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoveTokenPayload {
    /// Agent name.
    pub name: String,
    /// Id of the token to remove.
    pub token_id: TokenId,
}

/// `agent:drawCards`.
#[derive(Debug, Clone, Deserialize)]
pub struct DrawCardsPayload {
    /// Agent name.
    pub name: String,
    /// Number of cards to draw.
    #[serde(default = "one")]
    pub count: usize,
    /// Draw pool: the top-level stack (default) or the top-level source.
    #[serde(default)]
    pub source: DrawSource,
}

/// Which draw pool `agent:drawCards` pulls from.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DrawSource {
    /// The top-level stack.
    #[default]
    Stack,
    /// The top-level composite source.
    Source,
}

/// `agent:discardCards`.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscardCardsPayload {
    /// Agent name.
    pub name: String,
    /// Tokens to discard from the agent's inventory.
    pub cards: Vec<TokenId>,
}

/// `agent:transferResource` / `agent:stealResource`.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferResourcePayload {
    /// Source agent.
    pub from: String,
    /// Destination agent.
    pub to: String,
    /// Resource key.
    pub resource: String,
    /// Amount to move.
    pub amount: u64,
}

/// `agent:transferToken` / `agent:stealToken`.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferTokenPayload {
    /// Source agent.
    pub from: String,
    /// Destination agent.
    pub to: String,
    /// Token id to move.
    #[serde(rename = "tokenId")]
    pub token_id: TokenId,
}

/// `agent:trade`.
#[derive(Debug, Clone, Deserialize)]
pub struct TradePayload {
    /// First agent.
    pub agent1: String,
    /// Second agent.
    pub agent2: String,
    /// What `agent1` offers.
    pub offer1: BTreeMap<String, u64>,
    /// What `agent2` offers.
    pub offer2: BTreeMap<String, u64>,
}

/// `token:transform`.
#[derive(Debug, Clone, Deserialize)]
pub struct TransformPayload {
    /// Token to transform.
    pub token: TokenId,
    /// Metadata merged (not replaced) into the token's existing meta.
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// `token:attach`.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachPayload {
    /// Token receiving the attachment.
    pub host: TokenId,
    /// Token being attached.
    pub attachment: TokenId,
    /// Attachment kind, recorded on the attachment's metadata.
    #[serde(default = "default_attachment_type")]
    pub attachment_type: String,
}

fn default_attachment_type() -> String {
    "default".to_string()
}

/// `token:detach`.
#[derive(Debug, Clone, Deserialize)]
pub struct DetachPayload {
    /// Host token.
    pub host: TokenId,
    /// Attachment to remove. Either field may be supplied; `attachment` wins
    /// if both are present.
    #[serde(default)]
    pub attachment: Option<TokenId>,
    /// Alias accepted for parity with the spec's `attachmentId` field name.
    #[serde(default, rename = "attachmentId")]
    pub attachment_id: Option<TokenId>,
}

/// `token:merge`.
#[derive(Debug, Clone, Deserialize)]
pub struct MergePayload {
    /// Tokens to merge (at least two).
    pub tokens: Vec<TokenId>,
    /// Metadata applied to the merge result.
    #[serde(default)]
    pub result_properties: Option<serde_json::Value>,
    /// If `true`, the inputs stay in their current containers instead of
    /// being detached.
    #[serde(default)]
    pub keep_originals: bool,
}

/// `token:split`.
#[derive(Debug, Clone, Deserialize)]
pub struct SplitPayload {
    /// Token to split.
    pub token: TokenId,
    /// Number of pieces to produce (at least two).
    pub count: u32,
    /// Metadata applied to every produced piece.
    #[serde(default)]
    pub properties: Option<serde_json::Value>,
}

/// `game:end`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndGamePayload {
    /// Declared winner, if any.
    #[serde(default)]
    pub winner: Option<String>,
    /// Free-form reason, recorded under `GameState.extra["endReason"]`.
    #[serde(default)]
    pub reason: Option<String>,
}

/// `game:nextPhase`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NextPhasePayload {
    /// Explicit target phase; omitted advances the default progression.
    #[serde(default)]
    pub phase: Option<String>,
}

/// `game:setProperty`.
#[derive(Debug, Clone, Deserialize)]
pub struct SetPropertyPayload {
    /// Key under `GameState.extra`.
    pub key: String,
    /// Value to store.
    pub value: serde_json::Value,
}

/// Selects a set of tokens to operate on: an explicit list, or `"source":
/// true"` meaning every token currently held by the top-level `Source`.
/// Mirrors spec.md's `tokens|source` shorthand.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenSelector {
    /// Explicit token ids.
    #[serde(default)]
    pub tokens: Option<Vec<TokenId>>,
    /// Pull from the top-level `Source` instead.
    #[serde(default)]
    pub source: bool,
}

/// A declarative stand-in for the source's closure-valued predicates —
/// batch/tokens handlers are native, so predicates are data, not code.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Predicate {
    /// Matches every token.
    Any,
    /// Token carries the given tag.
    HasTag {
        /// Tag to look for.
        tag: String,
    },
    /// Token label equals the given string.
    Label {
        /// Expected label.
        label: String,
    },
    /// Token is currently face-up.
    FaceUp,
    /// Token is currently face-down.
    FaceDown,
    /// Token metadata has `key` set to `value`.
    MetaEquals {
        /// Metadata key.
        key: String,
        /// Expected value.
        value: serde_json::Value,
    },
    /// Negates the inner predicate.
    Not {
        /// Inner predicate.
        predicate: Box<Predicate>,
    },
    /// Matches if every inner predicate matches.
    And {
        /// Inner predicates.
        predicates: Vec<Predicate>,
    },
    /// Matches if any inner predicate matches.
    Or {
        /// Inner predicates.
        predicates: Vec<Predicate>,
    },
}

impl Predicate {
    /// Evaluates the predicate against a token.
    #[must_use]
    pub fn matches(&self, token: &Token) -> bool {
        use crate::world::Face;
        match self {
            Predicate::Any => true,
            Predicate::HasTag { tag } => token.tags.iter().any(|t| t == tag),
            Predicate::Label { label } => &token.label == label,
            Predicate::FaceUp => token.face == Some(Face::Up),
            Predicate::FaceDown => token.face == Some(Face::Down),
            Predicate::MetaEquals { key, value } => token.meta.get(key) == Some(value),
            Predicate::Not { predicate } => !predicate.matches(token),
            Predicate::And { predicates } => predicates.iter().all(|p| p.matches(token)),
            Predicate::Or { predicates } => predicates.iter().any(|p| p.matches(token)),
        }
    }
}

/// `tokens:filter` / `tokens:count`.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterPayload {
    /// Tokens to filter.
    #[serde(flatten)]
    pub selector: TokenSelector,
    /// Predicate; omitted means "match everything" (used by plain `count`).
    #[serde(default)]
    pub predicate: Option<Predicate>,
}

/// `tokens:find`.
#[derive(Debug, Clone, Deserialize)]
pub struct FindPayload {
    /// Tokens to search.
    #[serde(flatten)]
    pub selector: TokenSelector,
    /// Predicate identifying the match.
    pub predicate: Predicate,
}

/// The named per-token operation `tokens:map` / `tokens:forEach` apply.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenOperation {
    /// Toggle face orientation.
    Flip,
    /// Merge every selected token into one.
    Merge,
    /// Reverse a prior merge, restoring the merged-from tokens.
    Unmerge,
}

/// `tokens:map` / `tokens:forEach`.
#[derive(Debug, Clone, Deserialize)]
pub struct MapPayload {
    /// Tokens to operate over.
    pub tokens: Vec<TokenId>,
    /// Operation to apply.
    pub operation: TokenOperation,
}

/// `tokens:collect`.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectPayload {
    /// Containers to gather tokens from.
    pub sources: Vec<TokenSelector>,
    /// Also include each gathered token's current attachments.
    #[serde(default)]
    pub include_attachments: bool,
}

/// `batch:shuffle`.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchShufflePayload {
    /// Decks to shuffle independently.
    pub decks: Vec<Vec<TokenId>>,
    /// Base seed; deck `i` is shuffled with `seed_prefix + i` when present.
    #[serde(default)]
    pub seed_prefix: Option<u64>,
}

/// `batch:draw`.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchDrawPayload {
    /// Decks to draw from, in order.
    pub decks: Vec<Vec<TokenId>>,
    /// Per-deck draw count (broadcast from a single value if shorter).
    pub counts: Vec<usize>,
}
