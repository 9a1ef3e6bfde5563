// SPDX-License-Identifier: Apache-2.0
//! Abstract bidirectional framed peer channel: a pluggable [`codec::Codec`],
//! a generic [`transport::Transport`], exponential-backoff reconnection, and
//! a bounded drop-oldest outbound buffer (spec.md §4.8).
//!
//! This crate has no opinion about what runs on top of it — [`channel::PeerChannel`]
//! moves opaque messages `M` end to end. `tableforge-consensus` is the
//! concrete user: it frames Chronicle deltas as `M`.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo,
    clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::todo,
    clippy::unimplemented, clippy::dbg_macro, clippy::print_stdout, clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate, clippy::return_self_not_must_use, clippy::missing_errors_doc,
    clippy::missing_panics_doc, clippy::module_name_repetitions, clippy::similar_names,
    clippy::multiple_crate_versions
)]

pub mod backoff;
pub mod channel;
pub mod codec;
pub mod transport;

pub use backoff::ReconnectPolicy;
pub use channel::{PeerChannel, PeerChannelConfig};
pub use codec::{Codec, CodecError, JsonCodec};
pub use transport::{Connect, Transport};

/// Errors a [`channel::PeerChannel`] can surface to its caller. Transport and
/// codec failures during normal send/recv are absorbed into `net:error`
/// events and a reconnect attempt rather than propagated here — this enum is
/// only returned when the channel cannot make progress at all.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// The underlying transport reported a permanent failure.
    #[error("transport closed")]
    TransportClosed,
    /// Encoding or decoding a frame failed.
    #[error(transparent)]
    Codec(#[from] codec::CodecError),
    /// The reconnect policy's attempt budget was exhausted.
    #[error("reconnect attempts exhausted")]
    ReconnectExhausted,
}
