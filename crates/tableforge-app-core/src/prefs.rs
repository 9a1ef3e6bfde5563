// SPDX-License-Identifier: Apache-2.0
//! Saved preferences for the room server and its CLI tools.

use serde::{Deserialize, Serialize};

/// Saved preferences for an authoritative room server instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomServerPrefs {
    /// TCP port the server listens on.
    pub port: u16,
    /// Verbose (debug-level) logging.
    pub verbose: bool,
    /// Maximum number of concurrently open rooms.
    pub max_rooms: usize,
}

impl Default for RoomServerPrefs {
    fn default() -> Self {
        Self {
            port: 8787,
            verbose: false,
            max_rooms: 256,
        }
    }
}
