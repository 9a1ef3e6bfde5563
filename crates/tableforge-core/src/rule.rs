// SPDX-License-Identifier: Apache-2.0
//! Rule: a condition/effect pair whose `once`-firing state is convergent —
//! recorded into the Chronicle itself (`WorldDocument::rules_fired`) rather
//! than kept on the process, so two peers that each evaluate the same rule
//! against the same state agree on whether it already fired.

use crate::policy::Effect;
use crate::engine::Engine;

/// A condition/effect pair whose firing is recorded in shared state. See the
/// module docs for how this differs from [`crate::policy::Policy`].
pub struct Rule {
    /// Stable name — also the key under `WorldDocument::rules_fired`.
    pub name: String,
    /// Higher-priority rules are evaluated first within one pass.
    pub priority: i32,
    /// If `true`, the rule fires at most once, convergently across peers.
    pub once: bool,
    /// Rules with `enabled == false` are skipped entirely.
    pub enabled: bool,
    /// Predicate over the current engine state.
    pub condition: Box<dyn Fn(&Engine) -> bool + Send + Sync>,
    /// What to do when `condition` holds.
    pub effect: Effect,
}

impl Rule {
    /// Builds an always-enabled, repeatable rule with priority 0.
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
            condition: Box::new(condition),
            effect,
        }
    }

    /// Marks the rule as firing at most once, convergently.
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

    /// Starts the rule disabled; callers enable it via direct field access.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
