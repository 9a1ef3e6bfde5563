// SPDX-License-Identifier: Apache-2.0
//! Deterministic, replayable simulation runtime: a Chronicle-backed world,
//! an Action Dispatcher, an Engine façade, and a Rule/Policy layer above it.
//!
//! This crate is THE CORE of tableforge: every other crate in the workspace
//! (`tableforge-peer`, `tableforge-consensus`, `tableforge-room-server`)
//! treats an [`engine::Engine`] as the only legal mutator of game state.
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
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::use_self,
    clippy::too_many_lines,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::similar_names
)]

pub mod action;
pub mod chronicle;
pub mod dispatcher;
pub mod engine;
pub mod event_bus;
pub mod ident;
pub mod policy;
pub mod recorder;
pub mod rule;
pub mod script;
pub mod world;

pub use action::{Action, ActionResult, ActionSpec};
pub use chronicle::{Chronicle, ChronicleError};
pub use dispatcher::Dispatcher;
pub use engine::{Engine, EngineConfig};
pub use event_bus::{Event, EventBus};
pub use ident::{PlacementId, TokenId};
pub use policy::Policy;
pub use recorder::Recorder;
pub use rule::Rule;
pub use script::Script;
pub use world::{WorldDocument, WorldError};
