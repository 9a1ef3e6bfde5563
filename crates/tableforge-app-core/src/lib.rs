// SPDX-License-Identifier: Apache-2.0
//! Shared application services for tableforge tools (config, prefs).
//! Keeps server/CLI adapters thin and framework-agnostic.

pub mod config;
pub mod config_port;
pub mod prefs;
