// SPDX-License-Identifier: Apache-2.0
//! Multi-room authoritative host (spec.md §4.10): one process owns N
//! independent rooms, each wrapping exactly one [`tableforge_core::Engine`].
//! Clients connect once over a single transport; all room operations —
//! create, join, leave, list, dispatch — are multiplexed on that
//! connection and keyed by a stable, client-supplied `clientId`.
//!
//! This crate owns the parts of the system spec.md explicitly assigns to
//! the room server and nowhere else: seat allocation, admission control,
//! disconnect/reconnect grace periods, and per-seat valid-action/broadcast
//! framing. It never interprets game rules; those are supplied by
//! whatever actions/policies/rules an embedder registers on the room's
//! `Engine` before handing it to [`registry::RoomRegistry`].
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::multiple_crate_versions,
    clippy::similar_names
)]

pub mod protocol;
pub mod registry;
pub mod room;
pub mod seat_view;
pub mod server;

pub use protocol::{ClientMessage, ServerMessage};
pub use registry::{RoomRegistry, RoomRegistryConfig};
pub use room::{Room, RoomError, Seat};
pub use seat_view::{IdentitySeatView, SeatView};
