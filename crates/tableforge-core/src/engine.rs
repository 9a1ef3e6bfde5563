// SPDX-License-Identifier: Apache-2.0
//! Engine: the façade every caller mutates game state through. Owns the
//! [`Chronicle`], the [`Dispatcher`], the [`EventBus`], and the
//! Policy/Rule lists, and is the only code that records action history.
//!
//! # Undo/redo
//!
//! `undo` restores the Chronicle to the full [`WorldDocument`] snapshot
//! taken immediately before the undone action was dispatched; `redo`
//! re-dispatches that action's original type/payload against whatever is
//! *currently* in the Chronicle. Absent any intervening dispatch, that's
//! exactly the state `undo` just restored, so `undo` then `redo` reproduces
//! the original post-action state byte-for-byte. Dispatching a new action
//! between an `undo` and a `redo` leaves the redo's result explicitly
//! undefined — re-dispatch semantics are intentionally last-write, not a
//! rewound replay, matching the engine's JS-parity design note.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::action::{Action, ActionSpec};
use crate::chronicle::{Chronicle, ChronicleError};
use crate::dispatcher::{DispatchContext, Dispatcher};
use crate::event_bus::{Event, EventBus};
use crate::ident::IdCounter;
use crate::policy::{Effect, Policy};
use crate::rule::Rule;
use crate::world::WorldError;

/// One entry in the undo/redo history. Distinct from the wire-level
/// [`Action`] record: it additionally carries a full pre-action document
/// clone, which is what makes undo an exact restore rather than a best
/// effort inverse.
#[derive(Clone)]
struct HistoryEntry {
    action: Action,
    before: crate::world::WorldDocument,
}

/// Construction-time knobs for an [`Engine`]. The only knob today is the
/// logical clock used to stamp dispatched actions; tests inject a fixed
/// clock to keep fixtures deterministic.
#[derive(Clone)]
pub struct EngineConfig {
    /// Supplies the logical timestamp stamped onto each dispatched action.
    pub clock: Arc<dyn Fn() -> i64 + Send + Sync>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            clock: Arc::new(wall_clock_millis),
        }
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig").finish_non_exhaustive()
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn wall_clock_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// One entry in [`Engine::available_actions`]'s advisory catalogue.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AvailableAction {
    /// The `category:verb` type callers pass to [`Engine::dispatch`].
    pub action_type: String,
    /// Advisory reversibility used to populate [`Action::reversible`].
    pub reversible: bool,
    /// An example payload shape, populated with each field's documented default.
    pub example_payload: serde_json::Value,
}

/// The simulation runtime façade. Construct one per room/session.
pub struct Engine {
    chronicle: Chronicle,
    dispatcher: Dispatcher,
    events: EventBus,
    policies: Vec<Policy>,
    rules: Vec<Rule>,
    history: Vec<HistoryEntry>,
    future: Vec<HistoryEntry>,
    action_ids: IdCounter,
    config: EngineConfig,
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

impl Engine {
    /// Creates an engine over a fresh, empty world, using the wall clock to
    /// stamp action timestamps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with an explicit [`EngineConfig`] (most commonly
    /// to inject a deterministic clock in tests).
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            chronicle: Chronicle::new(),
            dispatcher: Dispatcher::new(),
            events: EventBus::new(),
            policies: Vec::new(),
            rules: Vec::new(),
            history: Vec::new(),
            future: Vec::new(),
            action_ids: IdCounter::default(),
            config,
        }
    }

    /// Read-only view of the Chronicle (and, through it, the world state).
    pub fn chronicle(&self) -> &Chronicle {
        &self.chronicle
    }

    /// Mutable access to the dispatcher's fallback registry, for registering
    /// host-defined action types the native set doesn't cover.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// Mutable access to the event bus, for subscribing to engine events
    /// (used by [`crate::recorder::Recorder`] and [`crate::script::Script`]).
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Registers a policy. Policies are evaluated, highest `priority` first,
    /// after every successful [`Engine::dispatch`].
    pub fn register_policy(&mut self, policy: Policy) {
        self.policies.push(policy);
    }

    /// Removes every registered policy.
    pub fn clear_policies(&mut self) {
        self.policies.clear();
    }

    /// Registers a rule. Rules are evaluated, highest `priority` first,
    /// after every successful [`Engine::dispatch`] and after policies.
    pub fn register_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Removes every registered rule.
    pub fn clear_rules(&mut self) {
        self.rules.clear();
    }

    /// Dispatches `action_type` with `payload`, recording it to history
    /// (clearing any pending redo stack) and running policies/rules
    /// afterward. This is the entry point every external caller — the room
    /// server, a script step, a policy effect — should use.
    pub fn dispatch(&mut self, action_type: &str, payload: serde_json::Value) -> Result<Action, ChronicleError> {
        let action = self.dispatch_internal(action_type, payload, true, false)?;
        self.run_policies();
        self.run_rules();
        Ok(action)
    }

    /// Dispatches an action without going through history, policies, or
    /// rules — used by [`crate::recorder::Recorder::replay`] so replaying a
    /// captured log can't double-trigger effects that already fired on the
    /// original run.
    pub fn apply_raw(&mut self, action_type: &str, payload: serde_json::Value) -> Result<serde_json::Value, WorldError> {
        let ctx = DispatchContext { now: (self.config.clock)() };
        let dispatcher = self.dispatcher.clone();
        let label = format!("replay:{action_type}");
        let type_owned = action_type.to_string();
        let result = self.chronicle.change(label, move |world| {
            dispatcher.dispatch(ctx, world, &type_owned, &payload)
        });
        match result {
            Ok(value) => Ok(serde_json::to_value(value).unwrap_or(serde_json::Value::Null)),
            Err(ChronicleError::MutatorFailed { source, .. }) => Err(source),
            Err(other) => Err(WorldError::InvalidPayload {
                action: action_type.to_string(),
                reason: other.to_string(),
            }),
        }
    }

    /// Reverts the most recently dispatched (reversible) action, restoring
    /// the exact pre-action document. Returns the undone action, or `None`
    /// if there is nothing to undo.
    pub fn undo(&mut self) -> Option<Action> {
        let entry = self.history.pop()?;
        let before = entry.before.clone();
        let restored = self.chronicle.change("engine:undo", move |world| {
            *world = before;
            Ok::<(), WorldError>(())
        });
        if restored.is_err() {
            self.history.push(entry);
            return None;
        }
        self.events.publish(Event::new(
            "engine:undo",
            serde_json::json!({"actionId": entry.action.id}),
        ));
        let action = entry.action.clone();
        self.future.push(entry);
        Some(action)
    }

    /// Re-dispatches the most recently undone action against current state.
    /// See the module docs for exactly what this guarantees.
    pub fn redo(&mut self) -> Option<Action> {
        let entry = self.future.pop()?;
        match self.dispatch_internal(&entry.action.kind, entry.action.payload.clone(), true, true) {
            Ok(action) => {
                self.run_policies();
                self.run_rules();
                self.events
                    .publish(Event::new("engine:redo", serde_json::json!({"actionId": action.id})));
                Some(action)
            }
            Err(_) => {
                self.future.push(entry);
                None
            }
        }
    }

    /// Serializes current state to a content-addressed, base64-encoded snapshot.
    pub fn snapshot(&self) -> Result<String, ChronicleError> {
        self.chronicle.save_to_base64()
    }

    /// Restores state from a snapshot produced by [`Engine::snapshot`],
    /// clearing the undo/redo history (it no longer corresponds to the
    /// restored document).
    pub fn restore(&mut self, encoded: &str) -> Result<(), ChronicleError> {
        self.chronicle.load_from_base64(encoded)?;
        self.history.clear();
        self.future.clear();
        self.events
            .publish(Event::new("state:changed", serde_json::json!({"seq": self.chronicle.seq()})));
        Ok(())
    }

    /// Adopts a remote peer's snapshot wholesale (single-authority "merge",
    /// not a CRDT join — see [`Chronicle::merge_remote`]), clearing local
    /// undo/redo history.
    pub fn merge_remote(&mut self, encoded: &str) -> Result<(), ChronicleError> {
        self.chronicle.merge_remote(encoded)?;
        self.history.clear();
        self.future.clear();
        self.events.publish(Event::new(
            "state:changed",
            serde_json::json!({"seq": self.chronicle.seq(), "source": "remote"}),
        ));
        Ok(())
    }

    /// Advisory catalogue of every dispatchable action type (native plus
    /// registered fallback), each with an example payload.
    pub fn available_actions(&self) -> Vec<AvailableAction> {
        self.dispatcher
            .registered_types()
            .into_iter()
            .map(|action_type| AvailableAction {
                reversible: Dispatcher::is_reversible(&action_type),
                example_payload: Dispatcher::default_payload(&action_type),
                action_type,
            })
            .collect()
    }

    fn dispatch_internal(
        &mut self,
        action_type: &str,
        payload: serde_json::Value,
        push_history: bool,
        is_redo: bool,
    ) -> Result<Action, ChronicleError> {
        let id = format!("action-{}", self.action_ids.next());
        let timestamp = (self.config.clock)();
        let seed = payload.get("seed").and_then(serde_json::Value::as_u64);
        let reversible = Dispatcher::is_reversible(action_type);
        let before = self.chronicle.state().clone();
        let ctx = DispatchContext { now: timestamp };
        let dispatcher = self.dispatcher.clone();
        let label = action_type.to_string();
        let type_for_closure = label.clone();
        let payload_for_closure = payload.clone();

        let dispatched = self
            .chronicle
            .change(label, move |world| dispatcher.dispatch(ctx, world, &type_for_closure, &payload_for_closure));

        let result = match dispatched {
            Ok(value) => value,
            Err(err) => {
                self.events.publish(Event::new(
                    "engine:error",
                    serde_json::json!({"type": action_type, "error": err.to_string()}),
                ));
                return Err(err);
            }
        };

        let action = Action {
            id,
            kind: action_type.to_string(),
            payload,
            seed,
            reversible,
            timestamp,
            result: Some(result),
        };

        if push_history && reversible {
            self.history.push(HistoryEntry {
                action: action.clone(),
                before,
            });
        }
        if !is_redo {
            self.future.clear();
        }

        self.events.publish(Event::new("engine:action", &action));
        self.events.publish(Event::new(
            "state:changed",
            serde_json::json!({"seq": self.chronicle.seq()}),
        ));
        Ok(action)
    }

    fn run_policies(&mut self) {
        let mut policies = std::mem::take(&mut self.policies);
        policies.sort_by(|a, b| b.priority.cmp(&a.priority));
        for policy in &mut policies {
            if !policy.enabled || (policy.once && policy.fired) {
                continue;
            }
            if (policy.condition)(self) {
                policy.fired = true;
                if let Err(reason) = self.apply_effect(&policy.effect) {
                    tracing::warn!(policy = %policy.name, %reason, "policy effect failed");
                }
            }
        }
        self.policies = policies;
    }

    fn run_rules(&mut self) {
        let mut rules = std::mem::take(&mut self.rules);
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        for rule in &rules {
            if !rule.enabled {
                continue;
            }
            let already_fired = rule.once && self.chronicle.state().rules_fired.contains_key(&rule.name);
            if already_fired {
                continue;
            }
            if (rule.condition)(self) {
                if rule.once {
                    let name = rule.name.clone();
                    let now = (self.config.clock)();
                    if let Err(reason) = self.chronicle.change(format!("rule:{name}:fired"), move |world| {
                        world.rules_fired.insert(name.clone(), now);
                        Ok::<(), WorldError>(())
                    }) {
                        tracing::warn!(rule = %rule.name, %reason, "failed to record rule firing");
                        continue;
                    }
                }
                self.events
                    .publish(Event::new("rule:triggered", serde_json::json!({"rule": rule.name})));
                if let Err(reason) = self.apply_effect(&rule.effect) {
                    tracing::warn!(rule = %rule.name, %reason, "rule effect failed");
                }
            }
        }
        self.rules = rules;
    }

    fn apply_effect(&mut self, effect: &Effect) -> Result<(), String> {
        match effect {
            Effect::Action(spec) => self.dispatch_spec(spec),
            Effect::Actions(specs) => {
                for spec in specs {
                    self.dispatch_spec(spec)?;
                }
                Ok(())
            }
            Effect::Script(script) => {
                for step in &script.steps {
                    self.dispatch_spec(step)?;
                }
                Ok(())
            }
            Effect::Function(f) => f(self),
        }
    }

    fn dispatch_spec(&mut self, spec: &ActionSpec) -> Result<(), String> {
        self.dispatch_internal(&spec.kind, spec.payload.clone(), true, false)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_advances_state_and_history() {
        let mut engine = Engine::new();
        engine.dispatch("agent:create", serde_json::json!({"name": "alice"})).unwrap();
        let action = engine
            .dispatch("agent:giveResource", serde_json::json!({"name": "alice", "resource": "gold", "amount": 10}))
            .unwrap();
        assert!(action.reversible);
        assert_eq!(engine.chronicle().state().agent("alice").unwrap().resource("gold"), 10);
    }

    #[test]
    fn undo_then_redo_reproduces_post_action_state() {
        let mut engine = Engine::new();
        engine.dispatch("agent:create", serde_json::json!({"name": "alice"})).unwrap();
        engine
            .dispatch("agent:giveResource", serde_json::json!({"name": "alice", "resource": "gold", "amount": 10}))
            .unwrap();
        let before_undo = serde_json::to_string(engine.chronicle().state()).unwrap();
        engine.undo();
        assert_eq!(engine.chronicle().state().agent("alice").unwrap().resource("gold"), 0);
        engine.redo();
        let after_redo = serde_json::to_string(engine.chronicle().state()).unwrap();
        assert_eq!(before_undo, after_redo);
    }

    #[test]
    fn future_is_cleared_after_a_non_redo_dispatch_even_if_read_only() {
        let mut engine = Engine::new();
        engine.dispatch("agent:create", serde_json::json!({"name": "alice"})).unwrap();
        engine
            .dispatch("agent:giveResource", serde_json::json!({"name": "alice", "resource": "gold", "amount": 10}))
            .unwrap();
        engine.undo();
        engine.dispatch("agent:getAll", serde_json::json!({})).unwrap();
        assert!(engine.redo().is_none());
    }

    #[test]
    fn redo_preserves_older_entries_still_pending_on_the_future_stack() {
        let mut engine = Engine::new();
        engine.dispatch("agent:create", serde_json::json!({"name": "alice"})).unwrap();
        engine
            .dispatch("agent:giveResource", serde_json::json!({"name": "alice", "resource": "gold", "amount": 10}))
            .unwrap();
        engine
            .dispatch("agent:giveResource", serde_json::json!({"name": "alice", "resource": "wood", "amount": 5}))
            .unwrap();
        engine.undo();
        engine.undo();
        assert!(engine.redo().is_some());
        assert_eq!(engine.chronicle().state().agent("alice").unwrap().resource("gold"), 10);
        assert!(engine.redo().is_some());
        assert_eq!(engine.chronicle().state().agent("alice").unwrap().resource("wood"), 5);
    }

    #[test]
    fn failed_dispatch_does_not_touch_history() {
        let mut engine = Engine::new();
        engine.dispatch("agent:create", serde_json::json!({"name": "alice"})).unwrap();
        let result = engine.dispatch("agent:setActive", serde_json::json!({"name": "nobody"}));
        assert!(result.is_err());
        assert!(engine.undo().is_some());
        assert!(engine.undo().is_none());
    }

    #[test]
    fn policy_effect_fires_once_when_marked_once() {
        let mut engine = Engine::new();
        engine.dispatch("agent:create", serde_json::json!({"name": "alice"})).unwrap();
        engine.register_policy(
            Policy::new(
                "auto-active",
                |engine: &Engine| {
                    engine
                        .chronicle()
                        .state()
                        .agent("alice")
                        .map(|a| a.resource("gold") > 0)
                        .unwrap_or(false)
                },
                Effect::Action(ActionSpec {
                    kind: "agent:giveResource".to_string(),
                    payload: serde_json::json!({"name": "alice", "resource": "wood", "amount": 1}),
                    delay_ms: None,
                }),
            )
            .once(),
        );
        engine
            .dispatch("agent:giveResource", serde_json::json!({"name": "alice", "resource": "gold", "amount": 1}))
            .unwrap();
        assert_eq!(engine.chronicle().state().agent("alice").unwrap().resource("wood"), 1);
        engine
            .dispatch("agent:giveResource", serde_json::json!({"name": "alice", "resource": "gold", "amount": 1}))
            .unwrap();
        assert_eq!(engine.chronicle().state().agent("alice").unwrap().resource("wood"), 1);
    }

    #[test]
    fn rule_once_state_is_recorded_in_chronicle() {
        let mut engine = Engine::new();
        engine.dispatch("agent:create", serde_json::json!({"name": "alice"})).unwrap();
        engine.register_rule(
            Rule::new(
                "welcome-bonus",
                |_engine: &Engine| true,
                Effect::Action(ActionSpec {
                    kind: "agent:giveResource".to_string(),
                    payload: serde_json::json!({"name": "alice", "resource": "wood", "amount": 1}),
                    delay_ms: None,
                }),
            )
            .once(),
        );
        engine
            .dispatch("agent:giveResource", serde_json::json!({"name": "alice", "resource": "gold", "amount": 1}))
            .unwrap();
        assert!(engine.chronicle().state().rules_fired.contains_key("welcome-bonus"));
        let wood_after_first = engine.chronicle().state().agent("alice").unwrap().resource("wood");
        engine
            .dispatch("agent:giveResource", serde_json::json!({"name": "alice", "resource": "gold", "amount": 1}))
            .unwrap();
        assert_eq!(engine.chronicle().state().agent("alice").unwrap().resource("wood"), wood_after_first);
    }

    #[test]
    fn available_actions_covers_the_native_set() {
        let engine = Engine::new();
        let actions = engine.available_actions();
        assert!(actions.iter().any(|a| a.action_type == "stack:shuffle"));
        assert!(actions.iter().any(|a| a.action_type == "agent:trade"));
    }
}
