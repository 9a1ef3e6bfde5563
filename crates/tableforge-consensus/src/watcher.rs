// SPDX-License-Identifier: Apache-2.0
//! Adapts [`tableforge_core::EventBus`]'s synchronous `state:changed`
//! notifications into an async stream a [`crate::ConsensusBridge`] publish
//! loop can `.await` on.

use tableforge_core::{Engine, Event};
use tokio::sync::mpsc;

/// Forwards every `state:changed` event's sequence number onto an unbounded
/// channel. A caller typically does:
///
/// ```ignore
/// let mut changes = ChangeWatcher::attach(&mut engine);
/// while changes.recv().await.is_some() {
///     bridge.publish(&engine).await?;
/// }
/// ```
pub struct ChangeWatcher {
    rx: mpsc::UnboundedReceiver<u64>,
}

impl ChangeWatcher {
    /// Subscribes to `engine`'s event bus and returns a watcher that yields
    /// once per `state:changed` event (carrying the Chronicle sequence
    /// number at the time, though callers typically just re-snapshot the
    /// engine's *current* state rather than trust the carried value).
    pub fn attach(engine: &mut Engine) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        engine.events_mut().subscribe("consensus:watcher", move |event: &Event| {
            if event.name == "state:changed" {
                let seq = event.payload.get("seq").and_then(serde_json::Value::as_u64).unwrap_or(0);
                let _ = tx.send(seq);
            }
            Ok(())
        });
        Self { rx }
    }

    /// Waits for the next `state:changed` notification. Returns `None` once
    /// the owning engine (and its event bus) has been dropped.
    pub async fn recv(&mut self) -> Option<u64> {
        self.rx.recv().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn watcher_yields_once_per_state_change() {
        let mut engine = Engine::new();
        let mut watcher = ChangeWatcher::attach(&mut engine);
        engine.dispatch("agent:create", serde_json::json!({"name": "alice"})).unwrap();
        let seq = watcher.recv().await.unwrap();
        assert_eq!(seq, 1);
    }
}
