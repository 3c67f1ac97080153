//! Settings persistence backed by the SQLite database.

use rusqlite::Connection;

use tabmux_db::settings;
use tabmux_session::{MuxError, SettingsStore, FONT_SIZE_KEY, FONT_SIZE_RANGE};

pub struct DbSettings {
    conn: Connection,
}

impl DbSettings {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Store `default` as the font size unless a usable one is already
    /// there. Unparsable or out-of-range values are replaced.
    pub fn seed_font_size(&self, default: u16) -> rusqlite::Result<()> {
        let stored = settings::get_parsed::<u16>(&self.conn, FONT_SIZE_KEY)?;
        if stored.is_some_and(|size| FONT_SIZE_RANGE.contains(&size)) {
            return Ok(());
        }
        if let Some(bad) = settings::get(&self.conn, FONT_SIZE_KEY)? {
            log::warn!("Replacing invalid stored font size {:?} with {}", bad, default);
        }
        settings::set(&self.conn, FONT_SIZE_KEY, &default.to_string())
    }
}

impl SettingsStore for DbSettings {
    fn get(&self, key: &str) -> Option<String> {
        match settings::get(&self.conn, key) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Failed to read setting {}: {}", key, e);
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> tabmux_session::Result<()> {
        settings::set(&self.conn, key, value).map_err(|e| MuxError::Settings(e.to_string()))
    }
}
