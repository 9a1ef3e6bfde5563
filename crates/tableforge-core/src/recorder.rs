// SPDX-License-Identifier: Apache-2.0
//! Recorder: captures every dispatched action by subscribing to
//! `engine:action`, and can replay the captured log into a (typically
//! fresh) engine via [`Engine::apply_raw`] — bypassing policy/rule
//! evaluation and history bookkeeping so replay is idempotent and doesn't
//! re-trigger effects that already fired during the original run.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::action::Action;
use crate::engine::Engine;
use crate::event_bus::Event;

/// A shared, cloneable action log fed by an `engine:action` subscription.
#[derive(Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Vec<Action>>>,
}

impl Recorder {
    /// Subscribes a fresh recorder to `engine`'s event bus and returns it.
    /// Emits `recorder:start`.
    pub fn attach(engine: &mut Engine) -> Self {
        let recorder = Self::default();
        let log = Arc::clone(&recorder.log);
        engine.events_mut().subscribe("recorder", move |event| {
            if event.name == "engine:action" {
                let action: Action =
                    serde_json::from_value(event.payload.clone()).map_err(|e| e.to_string())?;
                log.lock().map_err(|e| e.to_string())?.push(action);
            }
            Ok(())
        });
        engine
            .events_mut()
            .publish(Event::new("recorder:start", serde_json::json!({})));
        recorder
    }

    /// Snapshot of every action captured so far, in dispatch order.
    pub fn export(&self) -> Vec<Action> {
        self.log.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    /// Discards the captured log. Emits `recorder:clear`.
    pub fn clear(&self, engine: &mut Engine) {
        if let Ok(mut guard) = self.log.lock() {
            guard.clear();
        }
        engine
            .events_mut()
            .publish(Event::new("recorder:clear", serde_json::json!({})));
    }

    /// Replays the captured log into `target` via [`Engine::apply_raw`],
    /// waiting `delay_ms` between steps. Stops early on the first failed
    /// step when `stop_on_error` is set; otherwise skips the failure and
    /// continues. Returns the number of steps successfully applied. Emits
    /// `recorder:replay:start`, `recorder:replay:error` per failure, and
    /// `recorder:replay:complete`.
    pub async fn replay(&self, target: &mut Engine, delay_ms: u64, stop_on_error: bool) -> usize {
        let actions = self.export();
        target.events_mut().publish(Event::new(
            "recorder:replay:start",
            serde_json::json!({"count": actions.len()}),
        ));
        let mut replayed = 0;
        for action in &actions {
            if delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            match target.apply_raw(&action.kind, action.payload.clone()) {
                Ok(_) => replayed += 1,
                Err(err) => {
                    target.events_mut().publish(Event::new(
                        "recorder:replay:error",
                        serde_json::json!({"action": action.id, "error": err.to_string()}),
                    ));
                    if stop_on_error {
                        break;
                    }
                }
            }
        }
        target.events_mut().publish(Event::new(
            "recorder:replay:complete",
            serde_json::json!({"replayed": replayed}),
        ));
        replayed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replay_reproduces_captured_actions() {
        let mut source = Engine::new();
        let recorder = Recorder::attach(&mut source);
        source
            .dispatch("agent:create", serde_json::json!({"name": "alice"}))
            .unwrap();
        source
            .dispatch("agent:giveResource", serde_json::json!({"name": "alice", "resource": "gold", "amount": 5}))
            .unwrap();

        let mut target = Engine::new();
        let replayed = recorder.replay(&mut target, 0, true).await;
        assert_eq!(replayed, 2);
        assert_eq!(target.chronicle().state().agent("alice").unwrap().resource("gold"), 5);
    }

    #[tokio::test]
    async fn replay_stops_on_error_when_requested() {
        let mut source = Engine::new();
        let recorder = Recorder::attach(&mut source);
        source
            .dispatch("agent:create", serde_json::json!({"name": "alice"}))
            .unwrap();

        // Manually seed a failing step into the captured log.
        recorder.log.lock().unwrap().push(Action {
            id: "bogus".to_string(),
            kind: "agent:setActive".to_string(),
            payload: serde_json::json!({"name": "nobody"}),
            seed: None,
            reversible: true,
            timestamp: 0,
            result: None,
        });

        let mut target = Engine::new();
        let replayed = recorder.replay(&mut target, 0, true).await;
        assert_eq!(replayed, 1);
    }
}
