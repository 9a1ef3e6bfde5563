// SPDX-License-Identifier: Apache-2.0
//! [`ConsensusBridge`]: the snapshot-replace sync loop described in the
//! module docs.

use serde::{Deserialize, Serialize};
use tableforge_core::Engine;
use tableforge_peer::{Connect, PeerChannel};

use crate::ConsensusError;

/// One Chronicle snapshot, tagged with the sequence number it was taken at.
/// Sequence numbers let a receiver detect and log (but not reject —
/// snapshots are self-sufficient) a missed update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delta {
    /// The Chronicle's `seq()` at the time this snapshot was taken.
    pub seq: u64,
    /// A [`Engine::snapshot`]-produced base64 envelope.
    pub snapshot: String,
}

/// Bridges one [`Engine`]'s Chronicle to one [`PeerChannel`] of [`Delta`]s.
pub struct ConsensusBridge<C: Connect> {
    channel: PeerChannel<C, Delta>,
    last_applied_seq: u64,
}

impl<C: Connect> ConsensusBridge<C> {
    /// Wraps an already-constructed peer channel. Call [`ConsensusBridge::connect`]
    /// before publishing or pulling.
    pub fn new(channel: PeerChannel<C, Delta>) -> Self {
        Self {
            channel,
            last_applied_seq: 0,
        }
    }

    /// Establishes the underlying transport.
    pub async fn connect(&mut self) -> Result<(), ConsensusError> {
        self.channel.connect().await.map_err(ConsensusError::from)
    }

    /// Snapshots `engine`'s current state and sends it as a [`Delta`].
    /// Intended to be called once per `state:changed` event — see
    /// [`crate::ChangeWatcher`] for wiring that up.
    pub async fn publish(&mut self, engine: &Engine) -> Result<(), ConsensusError> {
        let delta = Delta {
            seq: engine.chronicle().seq(),
            snapshot: engine.snapshot()?,
        };
        self.channel.send(delta).await?;
        Ok(())
    }

    /// Waits for the next remote [`Delta`] and adopts it into `engine` via
    /// [`Engine::merge_remote`]. Returns `false` (without touching `engine`)
    /// for a delta whose sequence number is not newer than the last one
    /// already applied — this makes `pull` idempotent against retransmits.
    pub async fn pull(&mut self, engine: &mut Engine) -> Result<bool, ConsensusError> {
        let delta = self.channel.recv().await?;
        self.apply(engine, delta)
    }

    fn apply(&mut self, engine: &mut Engine, delta: Delta) -> Result<bool, ConsensusError> {
        if delta.seq <= self.last_applied_seq {
            tracing::warn!(seq = delta.seq, last_applied = self.last_applied_seq, "consensus: ignoring stale delta");
            return Ok(false);
        }
        if delta.seq != self.last_applied_seq + 1 {
            tracing::warn!(
                expected = self.last_applied_seq + 1,
                got = delta.seq,
                "consensus: sequence gap, adopting snapshot anyway"
            );
        }
        engine.merge_remote(&delta.snapshot)?;
        self.last_applied_seq = delta.seq;
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tableforge_peer::codec::JsonCodec;
    use tableforge_peer::transport::in_memory::{pair, InMemoryTransport};
    use tableforge_peer::{PeerChannelConfig, PeerError};

    struct OneShotConnector(Option<InMemoryTransport>);

    impl Connect for OneShotConnector {
        type Transport = InMemoryTransport;

        async fn connect(&mut self) -> Result<InMemoryTransport, PeerError> {
            self.0.take().ok_or(PeerError::TransportClosed)
        }
    }

    fn bridge_pair() -> (ConsensusBridge<OneShotConnector>, ConsensusBridge<OneShotConnector>) {
        let (a, b) = pair(8);
        (
            ConsensusBridge::new(PeerChannel::new(
                OneShotConnector(Some(a)),
                Arc::new(JsonCodec),
                PeerChannelConfig::default(),
            )),
            ConsensusBridge::new(PeerChannel::new(
                OneShotConnector(Some(b)),
                Arc::new(JsonCodec),
                PeerChannelConfig::default(),
            )),
        )
    }

    #[tokio::test]
    async fn publish_then_pull_applies_remote_state() {
        let (mut source_bridge, mut target_bridge) = bridge_pair();
        source_bridge.connect().await.unwrap();
        target_bridge.connect().await.unwrap();

        let mut source = Engine::new();
        source.dispatch("agent:create", serde_json::json!({"name": "alice"})).unwrap();
        source_bridge.publish(&source).await.unwrap();

        let mut target = Engine::new();
        let applied = target_bridge.pull(&mut target).await.unwrap();
        assert!(applied);
        assert!(target.chronicle().state().agent("alice").is_some());
    }

    #[tokio::test]
    async fn stale_delta_is_ignored() {
        let (mut source_bridge, mut target_bridge) = bridge_pair();
        source_bridge.connect().await.unwrap();
        target_bridge.connect().await.unwrap();

        let mut source = Engine::new();
        source.dispatch("agent:create", serde_json::json!({"name": "alice"})).unwrap();
        source_bridge.publish(&source).await.unwrap();
        source
            .dispatch("agent:giveResource", serde_json::json!({"name": "alice", "resource": "gold", "amount": 3}))
            .unwrap();
        source_bridge.publish(&source).await.unwrap();

        let mut target = Engine::new();
        assert!(target_bridge.pull(&mut target).await.unwrap());
        assert!(target_bridge.pull(&mut target).await.unwrap());
        assert_eq!(target_bridge.last_applied_seq, 2);

        // A delta carrying a sequence number already applied is a no-op.
        let stale = Delta { seq: 1, snapshot: target.snapshot().unwrap() };
        assert!(!target_bridge.apply(&mut target, stale).unwrap());
    }
}
