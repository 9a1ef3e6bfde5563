// SPDX-License-Identifier: Apache-2.0
//! World primitives: the typed data held inside the Chronicle.
//!
//! Each primitive (`Stack`, `Space`, `Source`, `Agent`, `GameState`) is a thin
//! view over a slice of [`WorldDocument`]. Tokens themselves live in a single
//! arena (`tokens`) addressed by [`TokenId`]; every other structure stores
//! only identifier lists, never a live reference into the arena, so token
//! relationships survive arbitrary container moves (see DESIGN NOTES on
//! cyclic relationships).

pub mod agent;
pub mod game_state;
pub mod source;
pub mod space;
pub mod stack;
pub mod token;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ident::{IdCounter, PlacementId, TokenId};
pub use agent::Agent;
pub use game_state::GameState;
pub use source::{Source, SourceInspection};
pub use space::{Placement, Space, SpaceError};
pub use stack::{Stack, StackError};
pub use token::{Face, Token};

/// The container a token currently occupies. Exactly one of these is true
/// for every live token — this is the token-uniqueness invariant, enforced
/// by construction: every mutation that moves a token updates `locations`
/// in the same step that it updates the container itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    /// In the top-level stack.
    Stack,
    /// In the top-level source, at the given stack index.
    Source,
    /// Placed in the named zone of the Space.
    Zone(String),
    /// Held in an agent's inventory.
    AgentInventory(String),
    /// Not currently in any tracked container (e.g. merged away).
    Detached,
}

/// A completed agent-to-agent transaction (trade/transfer/steal), recorded
/// in a process-visible log distinct from the action history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Monotonic transaction id.
    pub id: u64,
    /// Transaction kind (`"transfer"`, `"steal"`, `"trade"`).
    pub kind: String,
    /// Source agent name.
    pub from: String,
    /// Destination agent name.
    pub to: String,
    /// Logical timestamp.
    pub timestamp: i64,
    /// Free-form details (resources/tokens moved).
    pub details: serde_json::Value,
}

/// Errors raised by world-primitive operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum WorldError {
    /// Stack-level precondition violated.
    #[error(transparent)]
    Stack(#[from] StackError),
    /// Space-level precondition violated.
    #[error(transparent)]
    Space(#[from] SpaceError),
    /// No top-level stack is attached to this world.
    #[error("no stack attached")]
    NoStack,
    /// No top-level source is attached to this world.
    #[error("no source attached")]
    NoSource,
    /// Referenced an unknown token id.
    #[error("unknown token {0}")]
    UnknownToken(TokenId),
    /// Referenced an unknown agent name.
    #[error("unknown agent '{0}'")]
    UnknownAgent(String),
    /// A trade/transfer could not be satisfied by the offering agent's balance.
    #[error("insufficient balance for agent '{0}'")]
    InsufficientBalance(String),
    /// `token:split` was asked to produce fewer than two pieces.
    #[error("split requires count >= 2")]
    SplitCountTooSmall,
    /// `token:merge` was asked to combine fewer than two tokens.
    #[error("merge requires at least 2 tokens")]
    MergeTooFewTokens,
    /// Referenced an unknown zone name.
    #[error("unknown zone '{0}'")]
    UnknownZone(String),
    /// A placement payload referenced a field position outside the tokens involved.
    #[error("out of range: {0}")]
    OutOfRange(String),
    /// The action payload failed to deserialize into the handler's expected shape.
    #[error("invalid payload for '{action}': {reason}")]
    InvalidPayload {
        /// The action type the payload was destined for.
        action: String,
        /// Human-readable deserialization failure.
        reason: String,
    },
    /// `dispatch` was called with a type string no handler (native or
    /// fallback) is registered for.
    #[error("unknown action type '{0}'")]
    UnknownAction(String),
}

/// The Chronicle's document: the aggregate of every world primitive plus the
/// convergent rule-fired map. This is the type that `Chronicle::change`
/// transacts over.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldDocument {
    tokens: BTreeMap<TokenId, Token>,
    #[serde(skip)]
    token_ids: IdCounter,
    locations: BTreeMap<TokenId, Location>,
    /// The top-level stack, if one is attached.
    pub stack: Option<Stack>,
    /// The zoned tabletop.
    pub space: Space,
    /// The top-level composite draw pool, if one is attached.
    pub source: Option<Source>,
    agents: BTreeMap<String, Agent>,
    /// Session-level lifecycle state.
    pub game_state: GameState,
    /// Convergent "rule fired" map: rule name -> logical timestamp.
    pub rules_fired: BTreeMap<String, i64>,
    transactions: Vec<Transaction>,
    #[serde(skip)]
    tx_ids: IdCounter,
}

impl WorldDocument {
    /// Spawns a fresh, unplaced (`Detached`) token and returns its id.
    pub fn spawn_token(&mut self, label: impl Into<String>) -> TokenId {
        let id = TokenId(self.token_ids.next());
        self.tokens.insert(id, Token::new(id, label));
        self.locations.insert(id, Location::Detached);
        id
    }

    /// Attaches a freshly built stack made of newly spawned tokens, one per
    /// label, in the given order (bottom to top per `labels`' order).
    pub fn attach_stack(&mut self, labels: impl IntoIterator<Item = String>) {
        let ids: Vec<TokenId> = labels.into_iter().map(|l| self.spawn_token(l)).collect();
        for id in &ids {
            self.locations.insert(*id, Location::Stack);
        }
        self.stack = Some(Stack::new(ids));
    }

    /// Borrows a token record.
    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(&id)
    }

    /// Mutably borrows a token record.
    pub fn token_mut(&mut self, id: TokenId) -> Option<&mut Token> {
        self.tokens.get_mut(&id)
    }

    /// Current container of a token, if it is known to this document.
    pub fn location_of(&self, id: TokenId) -> Option<&Location> {
        self.locations.get(&id)
    }

    /// Iterates over every tracked token id and its current location.
    pub fn locations(&self) -> impl Iterator<Item = (&TokenId, &Location)> {
        self.locations.iter()
    }

    /// Borrows an agent by name.
    pub fn agent(&self, name: &str) -> Option<&Agent> {
        self.agents.get(name)
    }

    /// Mutably borrows an agent by name.
    pub fn agent_mut(&mut self, name: &str) -> Option<&mut Agent> {
        self.agents.get_mut(name)
    }

    /// Iterates over every agent.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Creates a new agent, returning an error if the name is already taken.
    pub fn create_agent(&mut self, name: impl Into<String>) -> Result<(), WorldError> {
        let name = name.into();
        self.agents.entry(name).or_insert_with_key(|k| Agent::new(k.clone()));
        Ok(())
    }

    /// Removes an agent, returning its inventory tokens to `Detached`.
    pub fn remove_agent(&mut self, name: &str) -> Result<(), WorldError> {
        let agent = self
            .agents
            .remove(name)
            .ok_or_else(|| WorldError::UnknownAgent(name.to_string()))?;
        for token in agent.inventory() {
            self.locations.insert(*token, Location::Detached);
        }
        Ok(())
    }

    /// Draws `count` tokens from the top-level stack or source into an
    /// agent's inventory, updating the location index for each.
    pub fn agent_draw_cards(
        &mut self,
        name: &str,
        count: usize,
        from_source: bool,
    ) -> Result<Vec<TokenId>, WorldError> {
        if !self.agents.contains_key(name) {
            return Err(WorldError::UnknownAgent(name.to_string()));
        }
        let mut drawn = Vec::with_capacity(count);
        if from_source {
            let source = self.source.as_mut().ok_or(WorldError::NoSource)?;
            for _ in 0..count {
                match source.draw() {
                    Some(t) => drawn.push(t),
                    None => break,
                }
            }
        } else {
            let stack = self.stack.as_mut().ok_or(WorldError::NoStack)?;
            drawn.extend(stack.draw(count));
        }
        let agent = self.agents.get_mut(name).ok_or_else(|| WorldError::UnknownAgent(name.to_string()))?;
        for token in &drawn {
            agent.add_token(*token);
            self.locations.insert(*token, Location::AgentInventory(name.to_string()));
        }
        Ok(drawn)
    }

    /// Moves cards out of an agent's inventory into `Detached` (the
    /// dispatcher routes them onward to a discard zone if the handler
    /// declares one).
    pub fn agent_discard_cards(
        &mut self,
        name: &str,
        tokens: &[TokenId],
    ) -> Result<(), WorldError> {
        let agent = self
            .agents
            .get_mut(name)
            .ok_or_else(|| WorldError::UnknownAgent(name.to_string()))?;
        for token in tokens {
            agent.remove_token(*token);
            self.locations.insert(*token, Location::Detached);
        }
        Ok(())
    }

    /// Places a detached (or otherwise held) token into a Space zone,
    /// updating the location index.
    pub fn place_in_zone(
        &mut self,
        zone: &str,
        token: TokenId,
        x: Option<f64>,
        y: Option<f64>,
        face_up: bool,
        label: Option<String>,
    ) -> Result<space::Placement, WorldError> {
        let placement = self.space.place(zone, token, x, y, face_up, label)?;
        self.locations.insert(token, Location::Zone(zone.to_string()));
        Ok(placement)
    }

    /// Removes a placement, marking its token `Detached`.
    pub fn remove_from_zone(
        &mut self,
        zone: &str,
        placement: PlacementId,
    ) -> Result<space::Placement, WorldError> {
        let removed = self.space.remove(zone, placement)?;
        self.locations.insert(removed.token, Location::Detached);
        Ok(removed)
    }

    /// Transfers `amount` of `resource` from one agent to another; fails
    /// (leaving both balances unchanged) if the source can't cover it.
    pub fn transfer_resource(
        &mut self,
        from: &str,
        to: &str,
        resource: &str,
        amount: u64,
    ) -> Result<Transaction, WorldError> {
        if !self.agents.contains_key(to) {
            return Err(WorldError::UnknownAgent(to.to_string()));
        }
        {
            let source = self
                .agents
                .get(from)
                .ok_or_else(|| WorldError::UnknownAgent(from.to_string()))?;
            if !source.has_resource(resource, amount) {
                return Err(WorldError::InsufficientBalance(from.to_string()));
            }
        }
        self.agents.get_mut(from).map(|a| a.take_resource(resource, amount));
        self.agents.get_mut(to).map(|a| a.give_resource(resource, amount));
        Ok(self.record_transaction("transfer", from, to, serde_json::json!({"resource": resource, "amount": amount})))
    }

    /// Takes up to `amount` of `resource` from `from` and gives whatever was
    /// actually available to `to` (a "steal": it clamps rather than failing).
    pub fn steal_resource(
        &mut self,
        from: &str,
        to: &str,
        resource: &str,
        amount: u64,
    ) -> Result<Transaction, WorldError> {
        if !self.agents.contains_key(to) {
            return Err(WorldError::UnknownAgent(to.to_string()));
        }
        let taken = self
            .agents
            .get_mut(from)
            .ok_or_else(|| WorldError::UnknownAgent(from.to_string()))?
            .take_resource(resource, amount);
        if let Some(dst) = self.agents.get_mut(to) {
            dst.give_resource(resource, taken);
        }
        Ok(self.record_transaction(
            "steal",
            from,
            to,
            serde_json::json!({"resource": resource, "amount": taken}),
        ))
    }

    /// Transfers a single token from one agent's inventory to another's.
    pub fn transfer_token(
        &mut self,
        from: &str,
        to: &str,
        token: TokenId,
    ) -> Result<Transaction, WorldError> {
        if !self.agents.contains_key(to) {
            return Err(WorldError::UnknownAgent(to.to_string()));
        }
        let removed = self
            .agents
            .get_mut(from)
            .ok_or_else(|| WorldError::UnknownAgent(from.to_string()))?
            .remove_token(token)
            .ok_or(WorldError::UnknownToken(token))?;
        self.agents.get_mut(to).map(|a| a.add_token(removed));
        self.locations.insert(token, Location::AgentInventory(to.to_string()));
        Ok(self.record_transaction("transfer_token", from, to, serde_json::json!({"token": token.0})))
    }

    /// Atomically trades an offer of resources+tokens between two agents:
    /// either both sides are applied, or neither is.
    #[allow(clippy::too_many_arguments)]
    pub fn trade(
        &mut self,
        agent1: &str,
        agent2: &str,
        offer1: &BTreeMap<String, u64>,
        offer2: &BTreeMap<String, u64>,
    ) -> Result<Transaction, WorldError> {
        let a1 = self.agents.get(agent1).ok_or_else(|| WorldError::UnknownAgent(agent1.to_string()))?;
        for (resource, amount) in offer1 {
            if !a1.has_resource(resource, *amount) {
                return Err(WorldError::InsufficientBalance(agent1.to_string()));
            }
        }
        let a2 = self.agents.get(agent2).ok_or_else(|| WorldError::UnknownAgent(agent2.to_string()))?;
        for (resource, amount) in offer2 {
            if !a2.has_resource(resource, *amount) {
                return Err(WorldError::InsufficientBalance(agent2.to_string()));
            }
        }
        for (resource, amount) in offer1 {
            self.agents.get_mut(agent1).map(|a| a.take_resource(resource, *amount));
            self.agents.get_mut(agent2).map(|a| a.give_resource(resource, *amount));
        }
        for (resource, amount) in offer2 {
            self.agents.get_mut(agent2).map(|a| a.take_resource(resource, *amount));
            self.agents.get_mut(agent1).map(|a| a.give_resource(resource, *amount));
        }
        Ok(self.record_transaction(
            "trade",
            agent1,
            agent2,
            serde_json::json!({"offer1": offer1, "offer2": offer2}),
        ))
    }

    /// Merges two or more tokens into a single new token, recording
    /// provenance on both sides.
    pub fn merge_tokens(
        &mut self,
        tokens: &[TokenId],
        result_properties: Option<serde_json::Value>,
        keep_originals: bool,
    ) -> Result<TokenId, WorldError> {
        if tokens.len() < 2 {
            return Err(WorldError::MergeTooFewTokens);
        }
        for t in tokens {
            if !self.tokens.contains_key(t) {
                return Err(WorldError::UnknownToken(*t));
            }
        }
        let label = self
            .tokens
            .get(&tokens[0])
            .map(|t| t.label.clone())
            .unwrap_or_default();
        let merged_id = self.spawn_token(label);
        if let Some(serde_json::Value::Object(map)) = result_properties {
            if let Some(merged) = self.tokens.get_mut(&merged_id) {
                for (k, v) in map {
                    merged.meta.insert(k, v);
                }
            }
        }
        if let Some(merged) = self.tokens.get_mut(&merged_id) {
            merged.merged_from = tokens.to_vec();
        }
        for t in tokens {
            if let Some(tok) = self.tokens.get_mut(t) {
                tok.merged_into = Some(merged_id);
            }
            if !keep_originals {
                self.locations.insert(*t, Location::Detached);
            }
        }
        Ok(merged_id)
    }

    /// Splits a token into `count` new tokens, recording provenance.
    pub fn split_token(
        &mut self,
        token: TokenId,
        count: u32,
        properties: Option<serde_json::Value>,
        now: i64,
    ) -> Result<Vec<TokenId>, WorldError> {
        if count < 2 {
            return Err(WorldError::SplitCountTooSmall);
        }
        let label = self
            .tokens
            .get(&token)
            .ok_or(WorldError::UnknownToken(token))?
            .label
            .clone();
        let mut produced = Vec::with_capacity(count as usize);
        for i in 0..count {
            let id = self.spawn_token(label.clone());
            if let Some(serde_json::Value::Object(map)) = &properties {
                if let Some(t) = self.tokens.get_mut(&id) {
                    for (k, v) in map {
                        t.meta.insert(k.clone(), v.clone());
                    }
                }
            }
            if let Some(t) = self.tokens.get_mut(&id) {
                t.split_from = Some(token);
                t.split_index = Some(i);
                t.split_at = Some(now);
            }
            produced.push(id);
        }
        if let Some(src) = self.tokens.get_mut(&token) {
            src.split_into = produced.clone();
        }
        self.locations.insert(token, Location::Detached);
        Ok(produced)
    }

    /// Adds a token directly to an agent's inventory (e.g. a handler-granted
    /// item that didn't come from a draw), updating the location index.
    pub fn agent_add_token(&mut self, name: &str, token: TokenId) -> Result<(), WorldError> {
        let agent = self
            .agents
            .get_mut(name)
            .ok_or_else(|| WorldError::UnknownAgent(name.to_string()))?;
        agent.add_token(token);
        self.locations.insert(token, Location::AgentInventory(name.to_string()));
        Ok(())
    }

    /// Removes a token from an agent's inventory by id, marking it
    /// `Detached`. Returns `None` if the agent didn't hold that token.
    pub fn agent_remove_token(
        &mut self,
        name: &str,
        token: TokenId,
    ) -> Result<Option<TokenId>, WorldError> {
        let agent = self
            .agents
            .get_mut(name)
            .ok_or_else(|| WorldError::UnknownAgent(name.to_string()))?;
        let removed = agent.remove_token(token);
        if removed.is_some() {
            self.locations.insert(token, Location::Detached);
        }
        Ok(removed)
    }

    /// Forcibly moves a token into `to`'s inventory regardless of which
    /// agent currently holds it (a "steal", mirroring [`Self::steal_resource`]'s
    /// take-whatever's-there semantics rather than [`Self::transfer_token`]'s
    /// ownership-checked move).
    pub fn steal_token(
        &mut self,
        from: &str,
        to: &str,
        token: TokenId,
    ) -> Result<Transaction, WorldError> {
        if !self.agents.contains_key(to) {
            return Err(WorldError::UnknownAgent(to.to_string()));
        }
        let holder = self
            .agents
            .iter()
            .find(|(_, a)| a.inventory().contains(&token))
            .map(|(name, _)| name.clone());
        if let Some(holder) = &holder {
            if let Some(a) = self.agents.get_mut(holder) {
                a.remove_token(token);
            }
        }
        self.agents
            .get_mut(to)
            .ok_or_else(|| WorldError::UnknownAgent(to.to_string()))?
            .add_token(token);
        self.locations.insert(token, Location::AgentInventory(to.to_string()));
        Ok(self.record_transaction("steal_token", from, to, serde_json::json!({"token": token.0})))
    }

    /// Attaches `attachment` onto `host`, recording the reverse pointer.
    pub fn attach(&mut self, host: TokenId, attachment: TokenId) -> Result<(), WorldError> {
        if !self.tokens.contains_key(&host) {
            return Err(WorldError::UnknownToken(host));
        }
        if let Some(att) = self.tokens.get_mut(&attachment) {
            att.attached_to = Some(host);
        } else {
            return Err(WorldError::UnknownToken(attachment));
        }
        if let Some(h) = self.tokens.get_mut(&host) {
            h.attachments.push(attachment);
        }
        Ok(())
    }

    /// Detaches `attachment` from `host`.
    pub fn detach(&mut self, host: TokenId, attachment: TokenId) -> Result<(), WorldError> {
        if let Some(h) = self.tokens.get_mut(&host) {
            h.attachments.retain(|a| *a != attachment);
        }
        if let Some(a) = self.tokens.get_mut(&attachment) {
            a.attached_to = None;
        }
        Ok(())
    }

    /// Draws `count` tokens from the top-level stack, marking them
    /// `Detached` (the dispatcher routes them onward if the caller places
    /// them somewhere).
    pub fn stack_draw(&mut self, count: usize) -> Result<Vec<TokenId>, WorldError> {
        let drawn = self.stack.as_mut().ok_or(WorldError::NoStack)?.draw(count);
        for t in &drawn {
            self.locations.insert(*t, Location::Detached);
        }
        Ok(drawn)
    }

    /// Burns `count` tokens from the top of the top-level stack.
    pub fn stack_burn(&mut self, count: usize) -> Result<Vec<TokenId>, WorldError> {
        let burned = self.stack.as_mut().ok_or(WorldError::NoStack)?.burn(count);
        for t in &burned {
            self.locations.insert(*t, Location::Detached);
        }
        Ok(burned)
    }

    /// Inserts an already-spawned, currently detached token into the
    /// top-level stack at `position`.
    pub fn stack_insert_at(&mut self, token: TokenId, position: usize) -> Result<(), WorldError> {
        self.stack
            .as_mut()
            .ok_or(WorldError::NoStack)?
            .insert_at(token, position)?;
        self.locations.insert(token, Location::Stack);
        Ok(())
    }

    /// Removes and returns the token at `position` in the top-level stack.
    pub fn stack_remove_at(&mut self, position: usize) -> Result<TokenId, WorldError> {
        let token = self
            .stack
            .as_mut()
            .ok_or(WorldError::NoStack)?
            .remove_at(position)?;
        self.locations.insert(token, Location::Detached);
        Ok(token)
    }

    /// Draws a single token from the top-level source, marking it `Detached`.
    pub fn source_draw(&mut self) -> Result<Option<TokenId>, WorldError> {
        let drawn = self.source.as_mut().ok_or(WorldError::NoSource)?.draw();
        if let Some(t) = drawn {
            self.locations.insert(t, Location::Detached);
        }
        Ok(drawn)
    }

    /// Burns up to `count` tokens from the top-level source.
    pub fn source_burn(&mut self, count: usize) -> Result<Vec<TokenId>, WorldError> {
        let burned = self.source.as_mut().ok_or(WorldError::NoSource)?.burn(count);
        for t in &burned {
            self.locations.insert(*t, Location::Detached);
        }
        Ok(burned)
    }

    /// Appends a stack of already-spawned token ids to the top-level source,
    /// creating the source if none is attached yet.
    pub fn source_add_stack(&mut self, tokens: Vec<TokenId>) {
        for t in &tokens {
            self.locations.insert(*t, Location::Source);
        }
        self.source
            .get_or_insert_with(Source::default)
            .add_stack(Stack::new(tokens));
    }

    /// Removes the stack at `index` from the top-level source.
    pub fn source_remove_stack(&mut self, index: usize) -> Result<Stack, WorldError> {
        let removed = self
            .source
            .as_mut()
            .ok_or(WorldError::NoSource)?
            .remove_stack(index)
            .ok_or_else(|| WorldError::OutOfRange(format!("source stack index {index}")))?;
        for t in removed.contents() {
            self.locations.insert(*t, Location::Detached);
        }
        Ok(removed)
    }

    /// Creates a named, empty zone.
    pub fn create_zone(&mut self, name: impl Into<String>) -> Result<(), WorldError> {
        Ok(self.space.create_zone(name)?)
    }

    /// Deletes a zone, detaching any tokens it held.
    pub fn delete_zone(&mut self, name: &str) -> Result<Vec<TokenId>, WorldError> {
        let scrapped = self.space.delete_zone(name)?;
        for t in &scrapped {
            self.locations.insert(*t, Location::Detached);
        }
        Ok(scrapped)
    }

    /// Clears every placement from a single zone, detaching its tokens.
    pub fn clear_zone(&mut self, name: &str) -> Result<Vec<TokenId>, WorldError> {
        let cleared = self.space.clear_zone(name)?;
        for t in &cleared {
            self.locations.insert(*t, Location::Detached);
        }
        Ok(cleared)
    }

    /// Clears every zone in the Space, detaching every placed token.
    pub fn clear_all_zones(&mut self) -> Vec<TokenId> {
        let names: Vec<String> = self.space.zones().map(|(name, _)| name.clone()).collect();
        let mut all = Vec::new();
        for name in names {
            if let Ok(cleared) = self.clear_zone(&name) {
                all.extend(cleared);
            }
        }
        all
    }

    /// Moves a placement between zones, updating the token's tracked location.
    pub fn move_placement(
        &mut self,
        from: &str,
        to: &str,
        placement: PlacementId,
        x: Option<f64>,
        y: Option<f64>,
    ) -> Result<space::Placement, WorldError> {
        let moved = self.space.move_placement(from, to, placement, x, y)?;
        self.locations.insert(moved.token, Location::Zone(to.to_string()));
        Ok(moved)
    }

    /// Transfers every placement from one zone to another, updating every
    /// moved token's tracked location.
    pub fn transfer_zone(&mut self, from: &str, to: &str) -> Result<Vec<TokenId>, WorldError> {
        let moved: Vec<TokenId> = self
            .space
            .zone(from)
            .ok_or_else(|| WorldError::UnknownZone(from.to_string()))?
            .placements()
            .iter()
            .map(|p| p.token)
            .collect();
        self.space.transfer_zone(from, to)?;
        for t in &moved {
            self.locations.insert(*t, Location::Zone(to.to_string()));
        }
        Ok(moved)
    }

    /// Attaches `attachment` onto `host`, additionally recording the
    /// attachment's kind in its metadata (`attachmentType`).
    pub fn attach_with_type(
        &mut self,
        host: TokenId,
        attachment: TokenId,
        attachment_type: &str,
    ) -> Result<(), WorldError> {
        self.attach(host, attachment)?;
        if let Some(tok) = self.token_mut(attachment) {
            tok.meta.insert(
                "attachmentType".to_string(),
                serde_json::Value::String(attachment_type.to_string()),
            );
        }
        Ok(())
    }

    /// Read-only view of every token currently tracked, regardless of location.
    pub fn all_token_ids(&self) -> impl Iterator<Item = TokenId> + '_ {
        self.tokens.keys().copied()
    }

    /// Read-only view of the transaction log.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    fn record_transaction(
        &mut self,
        kind: &str,
        from: &str,
        to: &str,
        details: serde_json::Value,
    ) -> Transaction {
        let tx = Transaction {
            id: self.tx_ids.next(),
            kind: kind.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            timestamp: 0,
            details,
        };
        self.transactions.push(tx.clone());
        tx
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn token_uniqueness_holds_across_stack_and_agent_draw() {
        let mut world = WorldDocument::default();
        world.attach_stack((0..10).map(|i| format!("t{i}")));
        world.create_agent("alice").unwrap();
        let drawn = world.agent_draw_cards("alice", 5, false).unwrap();
        assert_eq!(drawn.len(), 5);
        assert_eq!(world.stack.as_ref().unwrap().len(), 5);
        let mut seen = std::collections::HashSet::new();
        for (id, _) in world.locations() {
            assert!(seen.insert(*id), "token {id} appears in more than one tracked location");
        }
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn token_uniqueness_holds_for_any_stack_size_and_draw_count(
            stack_size in 0u64..32, draw_count in 0usize..40
        ) {
            let mut world = WorldDocument::default();
            world.attach_stack((0..stack_size).map(|i| format!("t{i}")));
            world.create_agent("alice").unwrap();
            let _ = world.agent_draw_cards("alice", draw_count, false);
            let mut seen = std::collections::HashSet::new();
            for (id, _) in world.locations() {
                prop_assert!(seen.insert(*id), "token {} appears in more than one tracked location", id);
            }
        }
    }

    #[test]
    fn trade_is_atomic_on_insufficient_balance() {
        let mut world = WorldDocument::default();
        world.create_agent("alice").unwrap();
        world.create_agent("bob").unwrap();
        world.agent_mut("alice").unwrap().give_resource("gold", 30);
        world.agent_mut("bob").unwrap().give_resource("wood", 200);
        let mut offer1 = BTreeMap::new();
        offer1.insert("gold".to_string(), 50);
        let mut offer2 = BTreeMap::new();
        offer2.insert("wood".to_string(), 100);
        let result = world.trade("alice", "bob", &offer1, &offer2);
        assert!(result.is_err());
        assert_eq!(world.agent("alice").unwrap().resource("gold"), 30);
        assert_eq!(world.agent("bob").unwrap().resource("wood"), 200);
    }

    #[test]
    fn merge_then_split_restores_cardinality() {
        let mut world = WorldDocument::default();
        let a = world.spawn_token("a");
        let b = world.spawn_token("b");
        let c = world.spawn_token("c");
        let merged = world.merge_tokens(&[a, b, c], None, false).unwrap();
        let produced = world.split_token(merged, 3, None, 0).unwrap();
        assert_eq!(produced.len(), 3);
    }
}
