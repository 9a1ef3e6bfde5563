// SPDX-License-Identifier: Apache-2.0
//! Script: a cooperatively-abortable sequence of actions with per-step
//! delays, dispatched one at a time through the owning [`Engine`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::action::ActionSpec;
use crate::engine::Engine;
use crate::event_bus::Event;

/// A shared, cloneable abort flag. Cloning shares the same underlying
/// signal — call [`AbortSignal::abort`] on any clone to stop the run.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    /// Creates a fresh, not-yet-aborted signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the running script stop at its next checkpoint.
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// `true` once [`AbortSignal::abort`] has been called.
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a [`Script::run`] call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutcome {
    /// Every step dispatched successfully.
    Completed,
    /// Stopped early via [`AbortSignal::abort`], having completed this many steps.
    Aborted {
        /// Number of steps that had already dispatched.
        completed: usize,
    },
    /// A step's dispatch failed; the script stops at that point.
    Failed {
        /// Number of steps that had already dispatched successfully.
        completed: usize,
        /// The dispatch error, rendered for diagnostics.
        error: String,
    },
}

/// An ordered sequence of action specs, each optionally delayed before
/// dispatch. Scripts are data — building a [`Script`] does not touch an
/// engine; only [`Script::run`] does.
#[derive(Debug, Clone)]
pub struct Script {
    /// The steps to dispatch, in order.
    pub steps: Vec<ActionSpec>,
}

impl Script {
    /// Builds a script from an ordered list of steps.
    pub fn new(steps: Vec<ActionSpec>) -> Self {
        Self { steps }
    }

    /// Runs the script against `engine`, honoring each step's `delay_ms`
    /// and checking `signal` before and after every await point. Emits
    /// `script:start`, then either `script:stop` (aborted), `script:error`
    /// (a step failed), or `script:complete`.
    pub async fn run(&self, engine: &mut Engine, signal: &AbortSignal) -> ScriptOutcome {
        engine
            .events_mut()
            .publish(Event::new("script:start", serde_json::json!({"steps": self.steps.len()})));
        for (index, step) in self.steps.iter().enumerate() {
            if signal.is_aborted() {
                engine
                    .events_mut()
                    .publish(Event::new("script:stop", serde_json::json!({"at": index})));
                return ScriptOutcome::Aborted { completed: index };
            }
            if let Some(delay) = step.delay_ms {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if signal.is_aborted() {
                engine
                    .events_mut()
                    .publish(Event::new("script:stop", serde_json::json!({"at": index})));
                return ScriptOutcome::Aborted { completed: index };
            }
            if let Err(err) = engine.dispatch(&step.kind, step.payload.clone()) {
                let error = err.to_string();
                engine.events_mut().publish(Event::new(
                    "script:error",
                    serde_json::json!({"at": index, "error": error}),
                ));
                return ScriptOutcome::Failed { completed: index, error };
            }
        }
        engine
            .events_mut()
            .publish(Event::new("script:complete", serde_json::json!({"steps": self.steps.len()})));
        ScriptOutcome::Completed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_script_completes_immediately() {
        let mut engine = Engine::new();
        let script = Script::new(vec![]);
        let signal = AbortSignal::new();
        assert_eq!(script.run(&mut engine, &signal).await, ScriptOutcome::Completed);
    }

    #[tokio::test]
    async fn aborting_before_run_stops_at_step_zero() {
        let mut engine = Engine::new();
        engine
            .dispatch("agent:create", serde_json::json!({"name": "alice"}))
            .unwrap();
        let script = Script::new(vec![ActionSpec {
            kind: "agent:setActive".to_string(),
            payload: serde_json::json!({"name": "alice", "active": false}),
            delay_ms: None,
        }]);
        let signal = AbortSignal::new();
        signal.abort();
        let outcome = script.run(&mut engine, &signal).await;
        assert_eq!(outcome, ScriptOutcome::Aborted { completed: 0 });
    }

    #[tokio::test]
    async fn failing_step_reports_failed_outcome() {
        let mut engine = Engine::new();
        let script = Script::new(vec![ActionSpec {
            kind: "agent:setActive".to_string(),
            payload: serde_json::json!({"name": "nobody", "active": false}),
            delay_ms: None,
        }]);
        let signal = AbortSignal::new();
        let outcome = script.run(&mut engine, &signal).await;
        assert!(matches!(outcome, ScriptOutcome::Failed { completed: 0, .. }));
    }
}
