//! tabmux-db: SQLite persistence for user settings.

pub mod schema;
pub mod settings;

use rusqlite::Connection;
use std::path::Path;

pub fn open(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    schema::initialize(&conn)?;
    Ok(conn)
}

/// Database that lives only as long as the connection.
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    schema::initialize(&conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tabmux.db");

        {
            let conn = open(&path).unwrap();
            settings::set(&conn, "terminal-font-size", "18").unwrap();
        }

        let conn = open(&path).unwrap();
        assert_eq!(
            settings::get(&conn, "terminal-font-size").unwrap().as_deref(),
            Some("18")
        );
        assert_eq!(schema::version(&conn).unwrap(), schema::CURRENT_VERSION);
    }
}
