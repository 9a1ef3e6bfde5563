// SPDX-License-Identifier: Apache-2.0
//! Bridges a [`tableforge_core::Engine`]'s Chronicle to a
//! [`tableforge_peer::PeerChannel`] (spec.md §4.9): on each local
//! `state:changed`, the current state is snapshotted and sent as a
//! [`Delta`]; on each remote `Delta`, the snapshot is adopted via
//! [`tableforge_core::Engine::merge_remote`].
//!
//! Tableforge rooms are single-authority (see `tableforge-room-server`), so
//! this bridge does not attempt a CRDT-style join — a `Delta` with a higher
//! sequence number simply replaces local state outright, exactly like
//! [`tableforge_core::Chronicle::merge_remote`] itself.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo,
    clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::todo,
    clippy::unimplemented, clippy::dbg_macro, clippy::print_stdout, clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate, clippy::missing_errors_doc, clippy::missing_panics_doc,
    clippy::module_name_repetitions, clippy::multiple_crate_versions
)]

mod bridge;
mod watcher;

pub use bridge::{ConsensusBridge, Delta};
pub use watcher::ChangeWatcher;

use tableforge_core::ChronicleError;
use tableforge_peer::PeerError;

/// Errors surfaced while bridging Chronicle state to a peer channel.
#[derive(Debug, thiserror::Error)]
pub enum ConsensusError {
    /// Producing or adopting a snapshot failed.
    #[error(transparent)]
    Chronicle(#[from] ChronicleError),
    /// The underlying peer channel could not send or receive.
    #[error(transparent)]
    Peer(#[from] PeerError),
}
