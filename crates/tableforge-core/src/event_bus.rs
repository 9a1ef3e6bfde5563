// SPDX-License-Identifier: Apache-2.0
//! In-process publish/subscribe, delivering events synchronously to
//! subscribers in registration order (spec §4.6).
//!
//! Every component's notifications (`engine:action`, `state:changed`,
//! `rule:triggered`, ...) flow through one `EventBus` owned by the
//! [`crate::engine::Engine`]. Delivery is synchronous and in-order: a
//! `publish` call returns only after every subscriber has run.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// A named event with a JSON payload, mirroring the normative event names
/// in spec.md §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event name (e.g. `"engine:action"`, `"state:changed"`).
    pub name: String,
    /// Event body. Always present, per spec.md §4.6 ("Events always carry
    /// a `payload` field").
    pub payload: serde_json::Value,
}

impl Event {
    /// Builds an event from a name and a serializable payload.
    pub fn new(name: impl Into<String>, payload: impl Serialize) -> Self {
        Self {
            name: name.into(),
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// A subscriber callback. Subscribers that fail are logged and isolated —
/// they never abort delivery to subscribers registered after them. Rust
/// has no safe way to intercept a panic at this boundary the way a
/// JS `try/catch` around each listener would, so subscribers are expected
/// to report failure via `Err` rather than panicking.
type Subscriber = Box<dyn FnMut(&Event) -> Result<(), String> + Send>;

/// Synchronous, in-process, single-process event bus.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<(String, Subscriber)>,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber for every published event. Registration
    /// order is delivery order.
    pub fn subscribe<F>(&mut self, label: impl Into<String>, handler: F)
    where
        F: FnMut(&Event) -> Result<(), String> + Send + 'static,
    {
        self.subscribers.push((label.into(), Box::new(handler)));
    }

    /// Delivers `event` to every subscriber in registration order. A
    /// subscriber returning `Err` is logged and does not prevent delivery
    /// to the rest.
    pub fn publish(&mut self, event: Event) {
        for (label, subscriber) in &mut self.subscribers {
            if let Err(reason) = subscriber(&event) {
                warn!(subscriber = %label, event = %event.name, %reason, "event subscriber failed");
            }
        }
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn subscribers_fire_in_registration_order() {
        let mut bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = Arc::clone(&order);
            bus.subscribe(format!("sub{i}"), move |_event| {
                order.lock().unwrap_or_else(|e| e.into_inner()).push(i);
                Ok(())
            });
        }
        bus.publish(Event::new("engine:action", serde_json::json!({})));
        assert_eq!(*order.lock().unwrap_or_else(|e| e.into_inner()), vec![0, 1, 2]);
    }

    #[test]
    fn failing_subscriber_does_not_block_the_rest() {
        let mut bus = EventBus::new();
        let seen = Arc::new(Mutex::new(false));
        bus.subscribe("bad", |_event| Err("boom".to_string()));
        let seen2 = Arc::clone(&seen);
        bus.subscribe("good", move |_event| {
            *seen2.lock().unwrap_or_else(|e| e.into_inner()) = true;
            Ok(())
        });
        bus.publish(Event::new("engine:error", serde_json::json!({})));
        assert!(*seen.lock().unwrap_or_else(|e| e.into_inner()));
    }
}
