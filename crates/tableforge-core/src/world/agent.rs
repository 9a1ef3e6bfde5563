// SPDX-License-Identifier: Apache-2.0
//! Agent: a seat in the simulation with resources and an inventory.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ident::TokenId;

/// A seated participant. Distinct from a connected client, which may occupy
/// an agent's seat (the room server owns that distinction, not this type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Stable display name; also the key used to look the agent up.
    pub name: String,
    /// Whether the agent is currently participating.
    pub active: bool,
    /// Resource counters. Never negative — see [`Agent::take_resource`].
    resources: BTreeMap<String, u64>,
    /// Tokens owned outright by this agent (inventory, not placed in Space).
    inventory: Vec<TokenId>,
    /// Name of a linked hand-zone in a `Space`, if any.
    pub hand_zone: Option<String>,
    /// Number of turns this agent has taken.
    pub turn: u64,
    /// Free-form metadata.
    pub meta: BTreeMap<String, serde_json::Value>,
}

impl Agent {
    /// Creates a new, inactive-by-default agent with no resources or inventory.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            resources: BTreeMap::new(),
            inventory: Vec::new(),
            hand_zone: None,
            turn: 0,
            meta: BTreeMap::new(),
        }
    }

    /// Current amount of `resource` (zero if never granted).
    pub fn resource(&self, resource: &str) -> u64 {
        self.resources.get(resource).copied().unwrap_or(0)
    }

    /// Read-only view of every resource balance.
    pub fn resources(&self) -> &BTreeMap<String, u64> {
        &self.resources
    }

    /// Grants `amount` of `resource`.
    pub fn give_resource(&mut self, resource: &str, amount: u64) {
        *self.resources.entry(resource.to_string()).or_insert(0) += amount;
    }

    /// Removes up to `amount` of `resource`, clamping at zero — the balance
    /// never goes negative (the resource non-negativity invariant).
    ///
    /// Returns the amount actually removed.
    pub fn take_resource(&mut self, resource: &str, amount: u64) -> u64 {
        let entry = self.resources.entry(resource.to_string()).or_insert(0);
        let taken = (*entry).min(amount);
        *entry -= taken;
        taken
    }

    /// `true` if the agent holds at least `amount` of `resource`.
    pub fn has_resource(&self, resource: &str, amount: u64) -> bool {
        self.resource(resource) >= amount
    }

    /// Read-only view of the agent's inventory.
    pub fn inventory(&self) -> &[TokenId] {
        &self.inventory
    }

    /// Adds a token to the inventory.
    pub fn add_token(&mut self, token: TokenId) {
        self.inventory.push(token);
    }

    /// Removes a token from the inventory by id, if present.
    pub fn remove_token(&mut self, token: TokenId) -> Option<TokenId> {
        let idx = self.inventory.iter().position(|t| *t == token)?;
        Some(self.inventory.remove(idx))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn take_resource_clamps_at_zero() {
        let mut a = Agent::new("alice");
        a.give_resource("gold", 10);
        let taken = a.take_resource("gold", 50);
        assert_eq!(taken, 10);
        assert_eq!(a.resource("gold"), 0);
    }

    #[test]
    fn give_and_take_never_go_negative() {
        let mut a = Agent::new("bob");
        assert_eq!(a.take_resource("wood", 5), 0);
        assert_eq!(a.resource("wood"), 0);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn resource_balance_never_exceeds_total_given(
            ops in prop::collection::vec((any::<bool>(), 0u64..1000), 0..50)
        ) {
            let mut a = Agent::new("carol");
            let mut given: u64 = 0;
            for (give, amount) in ops {
                if give {
                    a.give_resource("gold", amount);
                    given += amount;
                } else {
                    let taken = a.take_resource("gold", amount);
                    prop_assert!(taken <= amount);
                }
                prop_assert!(a.resource("gold") <= given);
            }
        }
    }
}
