// SPDX-License-Identifier: Apache-2.0
//! Policy: a transient condition/effect pair evaluated after every dispatch.
//!
//! Policies are local to one process — their `once`-firing state
//! ([`Policy::fired`]) lives only on the struct itself and does not survive
//! a snapshot round-trip or get reconciled with a peer. Convergent,
//! cross-peer once-semantics are [`crate::rule::Rule`]'s job.

use crate::action::ActionSpec;
use crate::engine::Engine;
use crate::script::Script;

/// What happens when a [`Policy`] or [`crate::rule::Rule`] fires.
pub enum Effect {
    /// Dispatch a single action.
    Action(ActionSpec),
    /// Dispatch several actions in order, each against the state the
    /// previous one left behind.
    Actions(Vec<ActionSpec>),
    /// Run a scripted sequence synchronously (step delays are honored, but
    /// the effect does not return until the script finishes or fails).
    Script(Script),
    /// Run arbitrary host logic against the engine. Follows the crate's
    /// explicit-`Result`-over-panic convention for callback isolation (see
    /// [`crate::event_bus`]).
    Function(Box<dyn Fn(&mut Engine) -> Result<(), String> + Send + Sync>),
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::Action(spec) => f.debug_tuple("Action").field(spec).finish(),
            Effect::Actions(specs) => f.debug_tuple("Actions").field(specs).finish(),
            Effect::Script(script) => f.debug_tuple("Script").field(script).finish(),
            Effect::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// A transient, process-local condition/effect pair. Evaluated, in
/// descending `priority` order, after every successful [`Engine::dispatch`].
pub struct Policy {
    /// Display name, used in logs and diagnostics.
    pub name: String,
    /// Higher-priority policies are evaluated first within one pass.
    pub priority: i32,
    /// If `true`, the policy fires at most once per process lifetime.
    pub once: bool,
    /// Policies with `enabled == false` are skipped entirely.
    pub enabled: bool,
    /// Whether `once` firing has already happened.
    pub fired: bool,
    /// Predicate over the current engine state.
    pub condition: Box<dyn Fn(&Engine) -> bool + Send + Sync>,
    /// What to do when `condition` holds.
    pub effect: Effect,
}

impl Policy {
    /// Builds an always-enabled, repeatable policy with priority 0.
    pub fn new(
        name: impl Into<String>,
        condition: impl Fn(&Engine) -> bool + Send + Sync + 'static,
        effect: Effect,
    ) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            once: false,
            enabled: true,
            fired: false,
            condition: Box::new(condition),
            effect,
        }
    }

    /// Marks the policy as firing at most once.
    #[must_use]
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// Sets the evaluation priority (higher runs first).
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Starts the policy disabled; callers enable it via direct field access.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
