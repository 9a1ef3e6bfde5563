// SPDX-License-Identifier: Apache-2.0
//! Action Dispatcher: routes a `category:verb` action type to either one of
//! the closed-set native handlers or a caller-registered fallback (spec.md
//! §4.3/§4.4). Native handlers cover the ~68 action types spec.md
//! enumerates; the fallback registry exists for host-defined game-specific
//! actions the native set deliberately doesn't try to anticipate.

pub mod native;
pub mod payloads;

use std::collections::HashMap;
use std::sync::Arc;

use crate::action::ActionResult;
use crate::world::{WorldDocument, WorldError};
pub use native::DispatchContext;

/// A caller-registered handler for an action type the native set doesn't
/// cover. Takes the same `(world, payload)` shape as a native handler.
pub type FallbackHandler =
    Arc<dyn Fn(&mut WorldDocument, &serde_json::Value) -> Result<ActionResult, WorldError> + Send + Sync>;

/// Routes dispatched actions to native or fallback handlers.
///
/// Holds no world state itself — every call takes the [`WorldDocument`] to
/// mutate as an argument, so the [`crate::engine::Engine`] stays the only
/// owner of the Chronicle the document lives in.
#[derive(Default, Clone)]
pub struct Dispatcher {
    fallback: HashMap<String, FallbackHandler>,
}

impl Dispatcher {
    /// Creates a dispatcher with no fallback handlers registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a fallback handler for `action_type`. Native
    /// action types may be shadowed this way, though doing so is unusual.
    pub fn register<F>(&mut self, action_type: impl Into<String>, handler: F)
    where
        F: Fn(&mut WorldDocument, &serde_json::Value) -> Result<ActionResult, WorldError> + Send + Sync + 'static,
    {
        self.fallback.insert(action_type.into(), Arc::new(handler));
    }

    /// `true` if `action_type` is handled natively or via a registered fallback.
    pub fn is_registered(&self, action_type: &str) -> bool {
        self.fallback.contains_key(action_type) || is_native(action_type)
    }

    /// Every currently dispatchable action type: the full native set plus
    /// whatever fallback handlers have been registered.
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = NATIVE_ACTIONS.iter().map(|s| (*s).to_string()).collect();
        types.extend(self.fallback.keys().cloned());
        types
    }

    /// Dispatches `action_type` with `payload` against `world`.
    ///
    /// A caller-registered fallback takes priority when it shadows a native
    /// type; otherwise the native handler runs, and an unrecognized type
    /// falls through to the fallback registry before finally producing
    /// [`WorldError::UnknownAction`].
    pub fn dispatch(
        &self,
        ctx: DispatchContext,
        world: &mut WorldDocument,
        action_type: &str,
        payload: &serde_json::Value,
    ) -> Result<ActionResult, WorldError> {
        if let Some(handler) = self.fallback.get(action_type) {
            return handler(world, payload);
        }
        match dispatch_native(ctx, world, action_type, payload) {
            Some(result) => result,
            None => self
                .fallback
                .get(action_type)
                .ok_or_else(|| WorldError::UnknownAction(action_type.to_string()))
                .and_then(|handler| handler(world, payload)),
        }
    }
}

fn dispatch_native(
    ctx: DispatchContext,
    world: &mut WorldDocument,
    action_type: &str,
    payload: &serde_json::Value,
) -> Option<Result<ActionResult, WorldError>> {
    let (category, verb) = action_type.split_once(':')?;
    if !is_native(action_type) {
        return None;
    }
    Some(match category {
        "stack" => native::dispatch_stack(world, verb, payload),
        "space" => native::dispatch_space(world, verb, payload),
        "source" => native::dispatch_source(world, verb, payload),
        "agent" => native::dispatch_agent(world, verb, payload),
        "token" => native::dispatch_token(ctx, world, verb, payload),
        "game" => native::dispatch_game(ctx, world, verb, payload),
        "tokens" | "batch" => native::dispatch_batch(world, category, verb, payload),
        "debug" => native::dispatch_debug(world, verb),
        _ => return None,
    })
}

impl Dispatcher {
    /// Advisory default payload for `action_type`, used by
    /// [`crate::engine::Engine::available_actions`] to show callers an
    /// example shape. Returns an empty object for action types with no
    /// required fields and for unknown/fallback types.
    #[must_use]
    pub fn default_payload(action_type: &str) -> serde_json::Value {
        default_payload_for(action_type)
    }

    /// Whether `action_type`'s native handler performs a mutation that is
    /// meaningful to undo (used to populate [`crate::action::Action::reversible`]).
    /// Fallback handlers are always considered reversible, since the engine
    /// has no way to know otherwise.
    #[must_use]
    pub fn is_reversible(action_type: &str) -> bool {
        !matches!(
            action_type,
            "stack:peek"
                | "source:inspect"
                | "agent:get"
                | "agent:getAll"
                | "game:getState"
                | "tokens:filter"
                | "tokens:count"
                | "tokens:find"
                | "tokens:collect"
                | "batch:shuffle"
                | "batch:draw"
                | "debug:inspect"
        )
    }
}

fn is_native(action_type: &str) -> bool {
    NATIVE_ACTIONS.contains(&action_type)
}

/// The full closed-set of native action types (spec.md §4.3), used by
/// [`Dispatcher::registered_types`] and [`is_native`].
pub const NATIVE_ACTIONS: &[&str] = &[
    "stack:shuffle",
    "stack:draw",
    "stack:peek",
    "stack:burn",
    "stack:reset",
    "stack:cut",
    "stack:insertAt",
    "stack:removeAt",
    "stack:swap",
    "stack:reverse",
    "space:createZone",
    "space:deleteZone",
    "space:clearZone",
    "space:clear",
    "space:lockZone",
    "space:place",
    "space:move",
    "space:flip",
    "space:remove",
    "space:shuffleZone",
    "space:transferZone",
    "space:fanZone",
    "space:stackZone",
    "space:spreadZone",
    "source:addStack",
    "source:removeStack",
    "source:draw",
    "source:burn",
    "source:reset",
    "source:shuffle",
    "source:inspect",
    "agent:create",
    "agent:remove",
    "agent:setActive",
    "agent:giveResource",
    "agent:takeResource",
    "agent:addToken",
    "agent:removeToken",
    "agent:drawCards",
    "agent:discardCards",
    "agent:transferResource",
    "agent:stealResource",
    "agent:transferToken",
    "agent:stealToken",
    "agent:trade",
    "agent:get",
    "agent:getAll",
    "token:transform",
    "token:attach",
    "token:detach",
    "token:merge",
    "token:split",
    "game:start",
    "game:end",
    "game:nextPhase",
    "game:setProperty",
    "game:pause",
    "game:resume",
    "game:reset",
    "game:getState",
    "tokens:filter",
    "tokens:count",
    "tokens:find",
    "tokens:map",
    "tokens:forEach",
    "tokens:collect",
    "batch:shuffle",
    "batch:draw",
    "debug:inspect",
];

fn default_payload_for(action_type: &str) -> serde_json::Value {
    use serde_json::json;
    match action_type {
        "stack:shuffle" | "source:shuffle" => json!({"seed": null}),
        "stack:draw" | "stack:burn" | "source:burn" => json!({"count": 1}),
        "stack:peek" => json!({"count": 1}),
        "stack:cut" => json!({"position": 0, "top_to_bottom": true}),
        "stack:insertAt" => json!({"card": 0, "position": 0}),
        "stack:removeAt" => json!({"position": 0}),
        "stack:swap" => json!({"position1": 0, "position2": 1}),
        "space:createZone" => json!({"name": "zone"}),
        "space:deleteZone" | "space:clearZone" | "space:lockZone" => json!({"name": "zone"}),
        "space:place" => json!({"zone": "zone", "token": 0, "face_up": true}),
        "space:move" => json!({"from": "zone", "to": "zone", "placement": 0}),
        "space:flip" | "space:remove" => json!({"zone": "zone", "placement": 0}),
        "space:shuffleZone" => json!({"zone": "zone"}),
        "space:transferZone" => json!({"from": "zone", "to": "zone"}),
        "space:fanZone" => json!({"zone": "zone", "center_x": 0.0, "center_y": 0.0}),
        "space:stackZone" => json!({"zone": "zone", "x": 0.0, "y": 0.0}),
        "space:spreadZone" => json!({"zone": "zone", "start_x": 0.0, "start_y": 0.0}),
        "source:addStack" => json!({"stack": []}),
        "source:removeStack" => json!({"index": 0}),
        "agent:create" => json!({"name": "agent"}),
        "agent:remove" | "agent:get" => json!({"name": "agent"}),
        "agent:setActive" => json!({"name": "agent", "active": true}),
        "agent:giveResource" | "agent:takeResource" => json!({"name": "agent", "resource": "gold", "amount": 1}),
        "agent:addToken" => json!({"name": "agent", "token": 0}),
        "agent:removeToken" => json!({"name": "agent", "token_id": 0}),
        "agent:drawCards" => json!({"name": "agent", "count": 1, "source": "stack"}),
        "agent:discardCards" => json!({"name": "agent", "cards": []}),
        "agent:transferResource" | "agent:stealResource" => {
            json!({"from": "agent1", "to": "agent2", "resource": "gold", "amount": 1})
        }
        "agent:transferToken" | "agent:stealToken" => json!({"from": "agent1", "to": "agent2", "tokenId": 0}),
        "agent:trade" => json!({"agent1": "agent1", "agent2": "agent2", "offer1": {}, "offer2": {}}),
        "token:transform" => json!({"token": 0, "properties": {}}),
        "token:attach" => json!({"host": 0, "attachment": 1}),
        "token:detach" => json!({"host": 0, "attachment": 1}),
        "token:merge" => json!({"tokens": [0, 1]}),
        "token:split" => json!({"token": 0, "count": 2}),
        "game:end" => json!({}),
        "game:nextPhase" => json!({}),
        "game:setProperty" => json!({"key": "key", "value": null}),
        "tokens:filter" | "tokens:count" => json!({}),
        "tokens:find" => json!({"predicate": {"kind": "any"}}),
        "tokens:map" | "tokens:forEach" => json!({"tokens": [], "operation": "flip"}),
        "tokens:collect" => json!({"sources": []}),
        "batch:shuffle" => json!({"decks": []}),
        "batch:draw" => json!({"decks": [], "counts": []}),
        _ => json!({}),
    }
}
