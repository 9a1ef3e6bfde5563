// SPDX-License-Identifier: Apache-2.0
//! Token record: the universal moveable item.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ident::TokenId;

/// Face orientation of a token, where the simulation cares to track one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Face {
    /// Token face is visible.
    Up,
    /// Token face is hidden.
    Down,
}

/// Materialised record for a single token.
///
/// Relational fields (`attached_to`, `attachments`, `merged_from`, ...) mirror
/// the spec's reserved fields one-for-one. They are plain identifier lists —
/// the store never holds a live reference into another token's storage slot,
/// since tokens move between containers under dispatcher mutation.
///
/// Invariants
/// - `id` is stable for the token's lifetime.
/// - `attached_to` and `attachments` are kept as reciprocal pointers by the
///   `token:attach`/`token:detach` handlers; the store itself does not enforce
///   reciprocity on arbitrary field writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Stable identifier, assigned once at creation.
    pub id: TokenId,
    /// Human-readable label.
    pub label: String,
    /// Group/kind tags (e.g. `["suit:spades", "rank:ace"]`).
    pub tags: Vec<String>,
    /// Open metadata map; merged (not replaced) by `token:transform`.
    pub meta: BTreeMap<String, serde_json::Value>,
    /// Optional face orientation.
    pub face: Option<Face>,
    /// Token this one is attached to, if any.
    pub attached_to: Option<TokenId>,
    /// Tokens attached to this one.
    pub attachments: Vec<TokenId>,
    /// Source tokens this one was merged from, if it is a merge result.
    pub merged_from: Vec<TokenId>,
    /// Merge result this token was folded into, if any.
    pub merged_into: Option<TokenId>,
    /// Token this one was split from, if it is a split result.
    pub split_from: Option<TokenId>,
    /// Tokens produced when this token was split.
    pub split_into: Vec<TokenId>,
    /// This token's position within its sibling group after a split.
    pub split_index: Option<u32>,
    /// Logical timestamp at which the split occurred.
    pub split_at: Option<i64>,
    /// Whether the token's usual orientation is reversed (e.g. an inverted card).
    pub reversed: bool,
}

impl Token {
    /// Creates a fresh token with the given id and label; all relational
    /// fields start empty and `reversed` starts `false`.
    pub fn new(id: TokenId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            tags: Vec::new(),
            meta: BTreeMap::new(),
            face: None,
            attached_to: None,
            attachments: Vec::new(),
            merged_from: Vec::new(),
            merged_into: None,
            split_from: None,
            split_into: Vec::new(),
            split_index: None,
            split_at: None,
            reversed: false,
        }
    }
}
