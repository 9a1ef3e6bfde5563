// SPDX-License-Identifier: Apache-2.0
//! Native handlers for the closed-set `category:verb` action types
//! (spec.md §4.3). Each function takes the already-split verb and a raw
//! JSON payload, deserializes into the matching typed payload struct, and
//! calls straight into the already-built [`WorldDocument`] API.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::de::DeserializeOwned;

use crate::action::ActionResult;
use crate::dispatcher::payloads::{
    AddStackPayload, AgentNamePayload, AgentTokenPayload, AttachPayload, BatchDrawPayload,
    BatchShufflePayload, CollectPayload, CountPayload, CreateAgentPayload, CreateZonePayload,
    CutPayload, DetachPayload, DiscardCardsPayload, DrawCardsPayload, DrawSource, EndGamePayload,
    FanZonePayload, FilterPayload, FindPayload, FlipPayload, InsertAtPayload, LockZonePayload,
    MapPayload, MergePayload, MovePayload, NextPhasePayload, PeekPayload, PlacePayload,
    PositionPayload, RemoveTokenPayload, ResourceAmountPayload, SeedPayload, SetActivePayload,
    SetPropertyPayload, ShuffleZonePayload, SplitPayload, StackIndexPayload, StackZonePayload,
    SpreadZonePayload, SwapPayload, TokenOperation, TokenSelector, TradePayload,
    TransferResourcePayload, TransferTokenPayload, TransferZonePayload, TransformPayload,
    ZoneNamePayload, ZonePlacementPayload,
};
use crate::world::{WorldDocument, WorldError};

/// Context a handler may need beyond the world document itself. `now` is a
/// logical timestamp supplied by the [`crate::engine::Engine`], never
/// sampled from the wall clock inside this crate.
#[derive(Debug, Clone, Copy)]
pub struct DispatchContext {
    /// Logical timestamp for operations that record provenance (e.g. `token:split`).
    pub now: i64,
}

/// Deserializes a handler payload, treating an absent/`null` payload as an
/// empty object so structs whose fields are all `#[serde(default)]` can be
/// dispatched with no payload at all. Structs with required fields still
/// reject a missing payload, via the ordinary missing-field error.
fn parse<T: DeserializeOwned>(action: &str, payload: &serde_json::Value) -> Result<T, WorldError> {
    let value = if payload.is_null() {
        serde_json::json!({})
    } else {
        payload.clone()
    };
    serde_json::from_value(value).map_err(|e| WorldError::InvalidPayload {
        action: action.to_string(),
        reason: e.to_string(),
    })
}

fn parse_required<T: DeserializeOwned>(action: &str, payload: &serde_json::Value) -> Result<T, WorldError> {
    parse(action, payload)
}

/// Dispatches a `stack:*` action.
pub fn dispatch_stack(
    world: &mut WorldDocument,
    verb: &str,
    payload: &serde_json::Value,
) -> Result<ActionResult, WorldError> {
    let full = format!("stack:{verb}");
    match verb {
        "shuffle" => {
            let p: SeedPayload = parse(&full, payload)?;
            world.stack.as_mut().ok_or(WorldError::NoStack)?.shuffle(p.seed);
            Ok(ActionResult::Unit)
        }
        "draw" => {
            let p: CountPayload = parse(&full, payload)?;
            Ok(ActionResult::Tokens(world.stack_draw(p.count)?))
        }
        "peek" => {
            let p: PeekPayload = parse(&full, payload)?;
            Ok(ActionResult::Tokens(world.stack.as_ref().ok_or(WorldError::NoStack)?.peek(p.count)))
        }
        "burn" => {
            let p: CountPayload = parse(&full, payload)?;
            Ok(ActionResult::Tokens(world.stack_burn(p.count)?))
        }
        "reset" => {
            world.stack.as_mut().ok_or(WorldError::NoStack)?.reset();
            Ok(ActionResult::Unit)
        }
        "cut" => {
            let p: CutPayload = parse_required(&full, payload)?;
            world.stack.as_mut().ok_or(WorldError::NoStack)?.cut(p.position, p.top_to_bottom)?;
            Ok(ActionResult::Unit)
        }
        "insertAt" => {
            let p: InsertAtPayload = parse_required(&full, payload)?;
            world.stack_insert_at(p.card, p.position)?;
            Ok(ActionResult::Unit)
        }
        "removeAt" => {
            let p: PositionPayload = parse(&full, payload)?;
            Ok(ActionResult::Token(world.stack_remove_at(p.position)?))
        }
        "swap" => {
            let p: SwapPayload = parse_required(&full, payload)?;
            world.stack.as_mut().ok_or(WorldError::NoStack)?.swap(p.position1, p.position2)?;
            Ok(ActionResult::Unit)
        }
        "reverse" => {
            world.stack.as_mut().ok_or(WorldError::NoStack)?.reverse();
            Ok(ActionResult::Unit)
        }
        other => Err(WorldError::UnknownAction(format!("stack:{other}"))),
    }
}

/// Dispatches a `space:*` action.
pub fn dispatch_space(
    world: &mut WorldDocument,
    verb: &str,
    payload: &serde_json::Value,
) -> Result<ActionResult, WorldError> {
    let full = format!("space:{verb}");
    match verb {
        "createZone" => {
            let p: CreateZonePayload = parse_required(&full, payload)?;
            world.create_zone(p.name)?;
            Ok(ActionResult::Unit)
        }
        "deleteZone" => {
            let p: ZoneNamePayload = parse_required(&full, payload)?;
            Ok(ActionResult::Tokens(world.delete_zone(&p.name)?))
        }
        "clearZone" => {
            let p: ZoneNamePayload = parse_required(&full, payload)?;
            Ok(ActionResult::Tokens(world.clear_zone(&p.name)?))
        }
        "clear" => Ok(ActionResult::Tokens(world.clear_all_zones())),
        "lockZone" => {
            let p: LockZonePayload = parse_required(&full, payload)?;
            world.space.lock_zone(&p.zone, p.locked)?;
            Ok(ActionResult::Unit)
        }
        "place" => {
            let p: PlacePayload = parse_required(&full, payload)?;
            Ok(ActionResult::Placement(world.place_in_zone(
                &p.zone, p.token, p.x, p.y, p.face_up, p.label,
            )?))
        }
        "move" => {
            let p: MovePayload = parse_required(&full, payload)?;
            Ok(ActionResult::Placement(world.move_placement(&p.from, &p.to, p.placement, p.x, p.y)?))
        }
        "flip" => {
            let p: FlipPayload = parse_required(&full, payload)?;
            Ok(ActionResult::Placement(world.space.flip(&p.zone, p.placement, p.face_up)?))
        }
        "remove" => {
            let p: ZonePlacementPayload = parse_required(&full, payload)?;
            Ok(ActionResult::Placement(world.remove_from_zone(&p.zone, p.placement)?))
        }
        "shuffleZone" => {
            let p: ShuffleZonePayload = parse_required(&full, payload)?;
            world.space.shuffle_zone(&p.zone, p.seed)?;
            Ok(ActionResult::Unit)
        }
        "transferZone" => {
            let p: TransferZonePayload = parse_required(&full, payload)?;
            Ok(ActionResult::Tokens(world.transfer_zone(&p.from, &p.to)?))
        }
        "fanZone" => {
            let p: FanZonePayload = parse_required(&full, payload)?;
            world.space.fan_zone(&p.zone, p.center_x, p.center_y, p.radius, p.arc_angle)?;
            Ok(ActionResult::Unit)
        }
        "stackZone" => {
            let p: StackZonePayload = parse_required(&full, payload)?;
            world.space.stack_zone(&p.zone, p.x, p.y, p.offset_y)?;
            Ok(ActionResult::Unit)
        }
        "spreadZone" => {
            let p: SpreadZonePayload = parse_required(&full, payload)?;
            world.space.spread_zone(&p.zone, p.start_x, p.start_y, p.spacing, p.horizontal)?;
            Ok(ActionResult::Unit)
        }
        other => Err(WorldError::UnknownAction(format!("space:{other}"))),
    }
}

/// Dispatches a `source:*` action.
pub fn dispatch_source(
    world: &mut WorldDocument,
    verb: &str,
    payload: &serde_json::Value,
) -> Result<ActionResult, WorldError> {
    let full = format!("source:{verb}");
    match verb {
        "addStack" => {
            let p: AddStackPayload = parse_required(&full, payload)?;
            world.source_add_stack(p.stack);
            Ok(ActionResult::Unit)
        }
        "removeStack" => {
            let p: StackIndexPayload = parse_required(&full, payload)?;
            let removed = world.source_remove_stack(p.index)?;
            Ok(ActionResult::Tokens(removed.contents().to_vec()))
        }
        "draw" => Ok(ActionResult::OptionToken(world.source_draw()?)),
        "burn" => {
            let p: CountPayload = parse(&full, payload)?;
            Ok(ActionResult::Tokens(world.source_burn(p.count)?))
        }
        "reset" => {
            world.source.as_mut().ok_or(WorldError::NoSource)?.reset();
            Ok(ActionResult::Unit)
        }
        "shuffle" => {
            let p: SeedPayload = parse(&full, payload)?;
            world.source.as_mut().ok_or(WorldError::NoSource)?.shuffle(p.seed);
            Ok(ActionResult::Unit)
        }
        "inspect" => Ok(ActionResult::SourceInspection(
            world.source.as_ref().ok_or(WorldError::NoSource)?.inspect(),
        )),
        other => Err(WorldError::UnknownAction(format!("source:{other}"))),
    }
}

/// Dispatches an `agent:*` action.
pub fn dispatch_agent(
    world: &mut WorldDocument,
    verb: &str,
    payload: &serde_json::Value,
) -> Result<ActionResult, WorldError> {
    let full = format!("agent:{verb}");
    match verb {
        "create" => {
            let p: CreateAgentPayload = parse_required(&full, payload)?;
            world.create_agent(p.name.clone())?;
            if let Some(meta) = p.meta {
                if let Some(agent) = world.agent_mut(&p.name) {
                    agent.meta.extend(meta);
                }
            }
            Ok(ActionResult::Unit)
        }
        "remove" => {
            let p: AgentNamePayload = parse_required(&full, payload)?;
            world.remove_agent(&p.name)?;
            Ok(ActionResult::Unit)
        }
        "setActive" => {
            let p: SetActivePayload = parse_required(&full, payload)?;
            world
                .agent_mut(&p.name)
                .ok_or_else(|| WorldError::UnknownAgent(p.name.clone()))?
                .active = p.active;
            Ok(ActionResult::Unit)
        }
        "giveResource" => {
            let p: ResourceAmountPayload = parse_required(&full, payload)?;
            world
                .agent_mut(&p.name)
                .ok_or_else(|| WorldError::UnknownAgent(p.name.clone()))?
                .give_resource(&p.resource, p.amount);
            Ok(ActionResult::Unit)
        }
        "takeResource" => {
            let p: ResourceAmountPayload = parse_required(&full, payload)?;
            let taken = world
                .agent_mut(&p.name)
                .ok_or_else(|| WorldError::UnknownAgent(p.name.clone()))?
                .take_resource(&p.resource, p.amount);
            Ok(ActionResult::Count(taken as usize))
        }
        "addToken" => {
            let p: AgentTokenPayload = parse_required(&full, payload)?;
            world.agent_add_token(&p.name, p.token)?;
            Ok(ActionResult::Unit)
        }
        "removeToken" => {
            let p: RemoveTokenPayload = parse_required(&full, payload)?;
            Ok(ActionResult::OptionToken(world.agent_remove_token(&p.name, p.token_id)?))
        }
        "drawCards" => {
            let p: DrawCardsPayload = parse_required(&full, payload)?;
            Ok(ActionResult::Tokens(world.agent_draw_cards(&p.name, p.count, p.source == DrawSource::Source)?))
        }
        "discardCards" => {
            let p: DiscardCardsPayload = parse_required(&full, payload)?;
            world.agent_discard_cards(&p.name, &p.cards)?;
            Ok(ActionResult::Unit)
        }
        "transferResource" => {
            let p: TransferResourcePayload = parse_required(&full, payload)?;
            Ok(ActionResult::Transaction(world.transfer_resource(&p.from, &p.to, &p.resource, p.amount)?))
        }
        "stealResource" => {
            let p: TransferResourcePayload = parse_required(&full, payload)?;
            Ok(ActionResult::Transaction(world.steal_resource(&p.from, &p.to, &p.resource, p.amount)?))
        }
        "transferToken" => {
            let p: TransferTokenPayload = parse_required(&full, payload)?;
            Ok(ActionResult::Transaction(world.transfer_token(&p.from, &p.to, p.token_id)?))
        }
        "stealToken" => {
            let p: TransferTokenPayload = parse_required(&full, payload)?;
            Ok(ActionResult::Transaction(world.steal_token(&p.from, &p.to, p.token_id)?))
        }
        "trade" => {
            let p: TradePayload = parse_required(&full, payload)?;
            Ok(ActionResult::Transaction(world.trade(&p.agent1, &p.agent2, &p.offer1, &p.offer2)?))
        }
        "get" => {
            let p: AgentNamePayload = parse_required(&full, payload)?;
            Ok(ActionResult::Agent(
                world.agent(&p.name).cloned().ok_or_else(|| WorldError::UnknownAgent(p.name))?,
            ))
        }
        "getAll" => Ok(ActionResult::Agents(world.agents().cloned().collect())),
        other => Err(WorldError::UnknownAction(format!("agent:{other}"))),
    }
}

/// Dispatches a `token:*` action.
pub fn dispatch_token(
    ctx: DispatchContext,
    world: &mut WorldDocument,
    verb: &str,
    payload: &serde_json::Value,
) -> Result<ActionResult, WorldError> {
    let full = format!("token:{verb}");
    match verb {
        "transform" => {
            let p: TransformPayload = parse_required(&full, payload)?;
            world
                .token_mut(p.token)
                .ok_or(WorldError::UnknownToken(p.token))?
                .meta
                .extend(p.properties);
            Ok(ActionResult::Unit)
        }
        "attach" => {
            let p: AttachPayload = parse_required(&full, payload)?;
            world.attach_with_type(p.host, p.attachment, &p.attachment_type)?;
            Ok(ActionResult::Unit)
        }
        "detach" => {
            let p: DetachPayload = parse_required(&full, payload)?;
            let attachment = p
                .attachment
                .or(p.attachment_id)
                .ok_or_else(|| WorldError::InvalidPayload {
                    action: full.clone(),
                    reason: "missing 'attachment' or 'attachmentId'".to_string(),
                })?;
            world.detach(p.host, attachment)?;
            Ok(ActionResult::Unit)
        }
        "merge" => {
            let p: MergePayload = parse_required(&full, payload)?;
            Ok(ActionResult::Token(world.merge_tokens(&p.tokens, p.result_properties, p.keep_originals)?))
        }
        "split" => {
            let p: SplitPayload = parse_required(&full, payload)?;
            Ok(ActionResult::Tokens(world.split_token(p.token, p.count, p.properties, ctx.now)?))
        }
        other => Err(WorldError::UnknownAction(format!("token:{other}"))),
    }
}

/// Dispatches a `game:*` action.
pub fn dispatch_game(
    ctx: DispatchContext,
    world: &mut WorldDocument,
    verb: &str,
    payload: &serde_json::Value,
) -> Result<ActionResult, WorldError> {
    let full = format!("game:{verb}");
    match verb {
        "start" => {
            world.game_state.start(ctx.now);
            Ok(ActionResult::Unit)
        }
        "end" => {
            let p: EndGamePayload = parse(&full, payload)?;
            world.game_state.end(p.winner, p.reason);
            Ok(ActionResult::Unit)
        }
        "nextPhase" => {
            let p: NextPhasePayload = parse(&full, payload)?;
            world.game_state.next_phase(p.phase);
            Ok(ActionResult::Unit)
        }
        "setProperty" => {
            let p: SetPropertyPayload = parse_required(&full, payload)?;
            world.game_state.extra.insert(p.key, p.value);
            Ok(ActionResult::Unit)
        }
        "pause" => {
            world.game_state.paused = true;
            Ok(ActionResult::Unit)
        }
        "resume" => {
            world.game_state.paused = false;
            Ok(ActionResult::Unit)
        }
        "reset" => {
            world.game_state.reset();
            Ok(ActionResult::Unit)
        }
        "getState" => Ok(ActionResult::GameState(world.game_state.clone())),
        other => Err(WorldError::UnknownAction(format!("game:{other}"))),
    }
}

fn select_tokens(world: &WorldDocument, selector: &TokenSelector) -> Vec<crate::ident::TokenId> {
    if let Some(tokens) = &selector.tokens {
        return tokens.clone();
    }
    if selector.source {
        return world
            .source
            .as_ref()
            .map(|s| s.stacks().flat_map(|st| st.contents().to_vec()).collect())
            .unwrap_or_default();
    }
    world.all_token_ids().collect()
}

/// Dispatches a `tokens:*` or `batch:*` action.
pub fn dispatch_batch(
    world: &mut WorldDocument,
    category: &str,
    verb: &str,
    payload: &serde_json::Value,
) -> Result<ActionResult, WorldError> {
    let full = format!("{category}:{verb}");
    match (category, verb) {
        ("tokens", "filter") => {
            let p: FilterPayload = parse(&full, payload)?;
            let matched: Vec<_> = select_tokens(world, &p.selector)
                .into_iter()
                .filter(|id| {
                    world
                        .token(*id)
                        .is_some_and(|t| p.predicate.as_ref().is_none_or(|pred| pred.matches(t)))
                })
                .collect();
            Ok(ActionResult::Tokens(matched))
        }
        ("tokens", "count") => {
            let p: FilterPayload = parse(&full, payload)?;
            let matched = select_tokens(world, &p.selector)
                .into_iter()
                .filter(|id| {
                    world
                        .token(*id)
                        .is_some_and(|t| p.predicate.as_ref().is_none_or(|pred| pred.matches(t)))
                })
                .count();
            Ok(ActionResult::Count(matched))
        }
        ("tokens", "find") => {
            let p: FindPayload = parse_required(&full, payload)?;
            let found = select_tokens(world, &p.selector)
                .into_iter()
                .find(|id| world.token(*id).is_some_and(|t| p.predicate.matches(t)));
            Ok(ActionResult::OptionToken(found))
        }
        ("tokens", "map" | "forEach") => {
            let p: MapPayload = parse_required(&full, payload)?;
            match p.operation {
                TokenOperation::Flip => {
                    for id in &p.tokens {
                        if let Some(tok) = world.token_mut(*id) {
                            tok.face = Some(match tok.face {
                                Some(crate::world::Face::Up) => crate::world::Face::Down,
                                _ => crate::world::Face::Up,
                            });
                        }
                    }
                    Ok(ActionResult::Tokens(p.tokens))
                }
                TokenOperation::Merge => Ok(ActionResult::Token(world.merge_tokens(&p.tokens, None, false)?)),
                TokenOperation::Unmerge => {
                    let mut restored = Vec::new();
                    for id in &p.tokens {
                        let merged_from = world.token(*id).map(|t| t.merged_from.clone()).unwrap_or_default();
                        for src in &merged_from {
                            if let Some(t) = world.token_mut(*src) {
                                t.merged_into = None;
                            }
                        }
                        restored.extend(merged_from);
                    }
                    Ok(ActionResult::Tokens(restored))
                }
            }
        }
        ("tokens", "collect") => {
            let p: CollectPayload = parse_required(&full, payload)?;
            let mut collected = Vec::new();
            for selector in &p.sources {
                collected.extend(select_tokens(world, selector));
            }
            if p.include_attachments {
                let attached: Vec<_> = collected
                    .iter()
                    .flat_map(|id| world.token(*id).map(|t| t.attachments.clone()).unwrap_or_default())
                    .collect();
                collected.extend(attached);
            }
            Ok(ActionResult::Tokens(collected))
        }
        ("batch", "shuffle") => {
            let p: BatchShufflePayload = parse_required(&full, payload)?;
            let shuffled: Vec<_> = p
                .decks
                .into_iter()
                .enumerate()
                .map(|(i, mut deck)| {
                    match p.seed_prefix {
                        Some(seed) => {
                            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                            deck.shuffle(&mut rng);
                        }
                        None => {
                            let mut rng = rand::thread_rng();
                            deck.shuffle(&mut rng);
                        }
                    }
                    deck
                })
                .collect();
            Ok(ActionResult::Decks(shuffled))
        }
        ("batch", "draw") => {
            let p: BatchDrawPayload = parse_required(&full, payload)?;
            let mut drawn = Vec::with_capacity(p.decks.len());
            let mut remaining = Vec::with_capacity(p.decks.len());
            for (i, mut deck) in p.decks.into_iter().enumerate() {
                let count = p.counts.get(i).or_else(|| p.counts.first()).copied().unwrap_or(0);
                let n = count.min(deck.len());
                let taken = deck.split_off(deck.len() - n);
                drawn.push(taken);
                remaining.push(deck);
            }
            Ok(ActionResult::BatchDraw { drawn, decks: remaining })
        }
        (cat, other) => Err(WorldError::UnknownAction(format!("{cat}:{other}"))),
    }
}

/// Dispatches `debug:inspect`: a read-only diagnostics dump, supplemented
/// per the ambient-stack expansion (not part of the native wire contract's
/// testable surface, but useful for operators and integration tests alike).
pub fn dispatch_debug(world: &WorldDocument, verb: &str) -> Result<ActionResult, WorldError> {
    match verb {
        "inspect" => Ok(ActionResult::Json(serde_json::json!({
            "tokenCount": world.all_token_ids().count(),
            "agentCount": world.agents().count(),
            "stackLen": world.stack.as_ref().map(crate::world::Stack::len),
            "sourceStacks": world.source.as_ref().map(|s| s.inspect().stack_count).unwrap_or(0),
            "gameStarted": world.game_state.started,
            "gameEnded": world.game_state.ended,
        }))),
        other => Err(WorldError::UnknownAction(format!("debug:{other}"))),
    }
}
