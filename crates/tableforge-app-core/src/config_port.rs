// SPDX-License-Identifier: Apache-2.0
//! Config port shared across tableforge tools (room server, CLI, etc.).

use crate::config::{ConfigService, ConfigStore};
use crate::prefs::RoomServerPrefs;

/// Config-facing port for loading/saving room server preferences (and similar blobs).
pub trait ConfigPort {
    /// Load room server preferences (returns None if missing or unreadable).
    fn load_prefs(&self) -> Option<RoomServerPrefs>;
    /// Persist room server preferences (best-effort; impl may log errors internally).
    fn save_prefs(&self, prefs: &RoomServerPrefs);
}

impl<S: ConfigStore> ConfigPort for ConfigService<S> {
    fn load_prefs(&self) -> Option<RoomServerPrefs> {
        self.load::<RoomServerPrefs>("room_server_prefs").ok().flatten()
    }

    fn save_prefs(&self, prefs: &RoomServerPrefs) {
        let _ = self.save("room_server_prefs", prefs);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct MemStore(RefCell<HashMap<String, Vec<u8>>>);

    impl ConfigStore for MemStore {
        fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
            self.0.borrow().get(key).cloned().ok_or(ConfigError::NotFound)
        }

        fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
            self.0.borrow_mut().insert(key.to_string(), data.to_vec());
            Ok(())
        }
    }

    #[test]
    fn round_trips_prefs_through_a_store() {
        let service = ConfigService::new(MemStore(RefCell::new(HashMap::new())));
        assert!(service.load_prefs().is_none());

        let prefs = RoomServerPrefs { port: 9999, verbose: true, max_rooms: 4 };
        service.save_prefs(&prefs);

        let loaded = service.load_prefs().unwrap();
        assert_eq!(loaded.port, 9999);
        assert!(loaded.verbose);
        assert_eq!(loaded.max_rooms, 4);
    }
}
