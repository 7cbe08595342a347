use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::traits::prefs::Preferences;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct PrefState {
    #[serde(default)]
    preferred_quality: Option<String>,
    #[serde(default)]
    loop_enabled: bool,
}

/// In-memory preference store. Useful for tests and for hosts that manage
/// persistence themselves.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    state: Mutex<PrefState>,
}

impl MemoryPreferences {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Preferences for MemoryPreferences {
    fn preferred_quality(&self) -> Option<String> {
        self.state.lock().preferred_quality.clone()
    }

    fn set_preferred_quality(&self, label: &str) {
        self.state.lock().preferred_quality = Some(label.to_owned());
    }

    fn loop_enabled(&self) -> bool {
        self.state.lock().loop_enabled
    }

    fn set_loop_enabled(&self, enabled: bool) {
        self.state.lock().loop_enabled = enabled;
    }
}

/// JSON-file-backed preference store.
///
/// Reads the file once at open; every mutation rewrites it. An unreadable or
/// malformed file degrades to defaults rather than failing the session.
#[derive(Debug)]
pub struct JsonFilePreferences {
    path: PathBuf,
    state: Mutex<PrefState>,
}

impl JsonFilePreferences {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(path = %path.display(), %err, "malformed preference file, using defaults");
                PrefState::default()
            }),
            Err(_) => PrefState::default(),
        };
        Self {
            path,
            state: Mutex::new(state),
        }
    }

    fn persist(&self, state: &PrefState) {
        match serde_json::to_string_pretty(state) {
            Ok(raw) => {
                if let Err(err) = std::fs::write(&self.path, raw) {
                    warn!(path = %self.path.display(), %err, "failed to write preferences");
                }
            }
            Err(err) => warn!(%err, "failed to encode preferences"),
        }
    }
}

impl Preferences for JsonFilePreferences {
    fn preferred_quality(&self) -> Option<String> {
        self.state.lock().preferred_quality.clone()
    }

    fn set_preferred_quality(&self, label: &str) {
        let mut state = self.state.lock();
        state.preferred_quality = Some(label.to_owned());
        self.persist(&state);
    }

    fn loop_enabled(&self) -> bool {
        self.state.lock().loop_enabled
    }

    fn set_loop_enabled(&self, enabled: bool) {
        let mut state = self.state.lock();
        state.loop_enabled = enabled;
        self.persist(&state);
    }
}
