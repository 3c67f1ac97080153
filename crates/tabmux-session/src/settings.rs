use std::collections::HashMap;

use crate::emulator::{DEFAULT_FONT_SIZE, FONT_SIZE_RANGE};
use crate::error::Result;

/// Settings key holding the persisted terminal font size.
pub const FONT_SIZE_KEY: &str = "terminal-font-size";

/// Key-value persistence for user settings.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Font size to give new sessions: the persisted value if it parses and is
/// in range, otherwise the default.
pub fn stored_font_size(store: &dyn SettingsStore) -> u16 {
    store
        .get(FONT_SIZE_KEY)
        .and_then(|v| v.trim().parse::<u16>().ok())
        .filter(|size| FONT_SIZE_RANGE.contains(size))
        .unwrap_or(DEFAULT_FONT_SIZE)
}

/// Non-persistent store, for tests and for running without a database.
#[derive(Debug, Default, Clone)]
pub struct MemorySettings {
    values: HashMap<String, String>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_round_trip() {
        let mut store = MemorySettings::new();
        assert_eq!(store.get("k"), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k"), Some("v".to_string()));
    }

    #[test]
    fn test_font_size_default_and_validation() {
        let mut store = MemorySettings::new();
        assert_eq!(stored_font_size(&store), DEFAULT_FONT_SIZE);

        store.set(FONT_SIZE_KEY, "18").unwrap();
        assert_eq!(stored_font_size(&store), 18);

        store.set(FONT_SIZE_KEY, "99").unwrap();
        assert_eq!(stored_font_size(&store), DEFAULT_FONT_SIZE);

        store.set(FONT_SIZE_KEY, "big").unwrap();
        assert_eq!(stored_font_size(&store), DEFAULT_FONT_SIZE);
    }
}
