// SPDX-License-Identifier: Apache-2.0
//! Chronicle: the single source of truth, versioned through named changes.
//!
//! A `Chronicle` owns one [`WorldDocument`] and exposes exactly one way to
//! mutate it: [`Chronicle::change`]. A mutator that returns `Err` leaves the
//! document byte-for-byte unchanged — the document is cloned, the mutator
//! runs against the clone, and the clone is only swapped in on success. This
//! mirrors the copy-on-write commit discipline `warp-core` uses for its own
//! tick application (clone-then-swap rather than rollback-on-error).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tableforge_cas::{blob_hash, BlobHash};

use crate::world::WorldDocument;

/// A single named mutation applied to the Chronicle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Monotonic sequence number, starting at 1.
    pub seq: u64,
    /// Human-readable label (typically the dispatched action type).
    pub label: String,
}

/// Errors raised while applying or restoring Chronicle state.
#[derive(Debug, thiserror::Error)]
pub enum ChronicleError {
    /// The supplied mutator returned an error; the document is unchanged.
    #[error("change '{label}' rejected: {source}")]
    MutatorFailed {
        /// The change label that was rejected.
        label: String,
        /// The underlying world error.
        #[source]
        source: crate::world::WorldError,
    },
    /// Base64 decoding of a snapshot failed.
    #[error("invalid base64 snapshot: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    /// JSON decoding of a snapshot failed.
    #[error("invalid snapshot payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    /// A restored snapshot's digest did not match its accompanying hash.
    #[error("snapshot digest mismatch")]
    DigestMismatch,
}

/// A content-addressed snapshot of Chronicle state, suitable for
/// transmission over the wire or for archival.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// BLAKE3 digest of the canonical JSON payload below.
    pub digest: BlobHash,
    /// Sequence number at the time of the snapshot.
    pub seq: u64,
    /// Canonical JSON-encoded [`WorldDocument`].
    payload: String,
}

/// The versioned document plus its append-only change log.
#[derive(Debug, Clone, Default)]
pub struct Chronicle {
    state: WorldDocument,
    log: Vec<ChangeRecord>,
    seq: u64,
}

impl Chronicle {
    /// Creates a Chronicle over a fresh, empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of the current document.
    pub fn state(&self) -> &WorldDocument {
        &self.state
    }

    /// Applies a named, fallible mutation. On success the mutation's return
    /// value is yielded and a [`ChangeRecord`] is appended to the log; on
    /// failure the document is left exactly as it was and the error is
    /// returned without any change being recorded.
    pub fn change<T>(
        &mut self,
        label: impl Into<String>,
        mutator: impl FnOnce(&mut WorldDocument) -> Result<T, crate::world::WorldError>,
    ) -> Result<T, ChronicleError> {
        let label = label.into();
        let mut candidate = self.state.clone();
        match mutator(&mut candidate) {
            Ok(value) => {
                self.state = candidate;
                self.seq += 1;
                self.log.push(ChangeRecord {
                    seq: self.seq,
                    label,
                });
                Ok(value)
            }
            Err(source) => Err(ChronicleError::MutatorFailed { label, source }),
        }
    }

    /// Read-only view of the change log, oldest first.
    pub fn log(&self) -> &[ChangeRecord] {
        &self.log
    }

    /// Current sequence number (0 before any change has been applied).
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Serializes the current state to a content-addressed, base64-encoded
    /// snapshot string.
    pub fn save_to_base64(&self) -> Result<String, ChronicleError> {
        let payload = serde_json::to_string(&self.state)?;
        let digest = blob_hash(payload.as_bytes());
        let snapshot = Snapshot {
            digest,
            seq: self.seq,
            payload,
        };
        let encoded = serde_json::to_vec(&snapshot)?;
        Ok(BASE64.encode(encoded))
    }

    /// Restores state from a snapshot produced by [`Chronicle::save_to_base64`],
    /// verifying the embedded digest before accepting it.
    pub fn load_from_base64(&mut self, encoded: &str) -> Result<(), ChronicleError> {
        let bytes = BASE64.decode(encoded)?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        if blob_hash(snapshot.payload.as_bytes()) != snapshot.digest {
            return Err(ChronicleError::DigestMismatch);
        }
        let state: WorldDocument = serde_json::from_str(&snapshot.payload)?;
        self.state = state;
        self.seq = snapshot.seq;
        Ok(())
    }

    /// Merges a remote peer's snapshot by replacing local state outright.
    ///
    /// Tableforge rooms are single-authority (see the room server): remote
    /// updates only ever originate from the authoritative side, so "merge"
    /// here means "adopt", not a CRDT-style join. A richer merge strategy is
    /// an open question — see `DESIGN.md`.
    pub fn merge_remote(&mut self, encoded: &str) -> Result<(), ChronicleError> {
        self.load_from_base64(encoded)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn failed_mutation_leaves_state_untouched() {
        let mut chronicle = Chronicle::new();
        chronicle
            .change("world:createAgent", |world| world.create_agent("alice"))
            .unwrap();
        let before = serde_json::to_string(chronicle.state()).unwrap();
        let result = chronicle.change("agent:transferToken", |world| {
            world.transfer_token("alice", "bob", crate::ident::TokenId(1))
        });
        assert!(result.is_err());
        let after = serde_json::to_string(chronicle.state()).unwrap();
        assert_eq!(before, after);
        assert_eq!(chronicle.seq(), 1);
    }

    #[test]
    fn same_change_sequence_yields_identical_state() {
        let mut a = Chronicle::new();
        let mut b = Chronicle::new();
        for chronicle in [&mut a, &mut b] {
            chronicle
                .change("world:createAgent", |world| world.create_agent("alice"))
                .unwrap();
            chronicle
                .change("world:attachStack", |world| {
                    world.attach_stack(["c1".to_string(), "c2".to_string()]);
                    Ok(())
                })
                .unwrap();
        }
        assert_eq!(
            serde_json::to_string(a.state()).unwrap(),
            serde_json::to_string(b.state()).unwrap()
        );
    }

    #[test]
    fn snapshot_round_trips_through_base64() {
        let mut chronicle = Chronicle::new();
        chronicle
            .change("world:createAgent", |world| world.create_agent("alice"))
            .unwrap();
        let encoded = chronicle.save_to_base64().unwrap();
        let mut restored = Chronicle::new();
        restored.load_from_base64(&encoded).unwrap();
        assert_eq!(
            serde_json::to_string(chronicle.state()).unwrap(),
            serde_json::to_string(restored.state()).unwrap()
        );
    }

    #[test]
    fn tampered_snapshot_digest_is_rejected() {
        let mut chronicle = Chronicle::new();
        chronicle
            .change("world:createAgent", |world| world.create_agent("alice"))
            .unwrap();
        let encoded = chronicle.save_to_base64().unwrap();
        let bytes = BASE64.decode(&encoded).unwrap();
        let mut snapshot: Snapshot = serde_json::from_slice(&bytes).unwrap();
        snapshot.seq = 99;
        let tampered = BASE64.encode(serde_json::to_vec(&snapshot).unwrap());
        let mut restored = Chronicle::new();
        assert!(matches!(
            restored.load_from_base64(&tampered),
            Err(ChronicleError::DigestMismatch)
        ));
    }
}
