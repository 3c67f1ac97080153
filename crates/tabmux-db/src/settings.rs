use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};

pub fn get(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

/// Read a setting and parse it; values that fail to parse read as unset.
pub fn get_parsed<T: FromStr>(conn: &Connection, key: &str) -> rusqlite::Result<Option<T>> {
    Ok(get(conn, key)?.and_then(|v| v.trim().parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::open_in_memory;

    #[test]
    fn test_missing_key() {
        let conn = open_in_memory().unwrap();
        assert_eq!(get(&conn, "nope").unwrap(), None);
    }

    #[test]
    fn test_set_overwrites() {
        let conn = open_in_memory().unwrap();
        set(&conn, "terminal-font-size", "12").unwrap();
        set(&conn, "terminal-font-size", "16").unwrap();
        assert_eq!(
            get(&conn, "terminal-font-size").unwrap().as_deref(),
            Some("16")
        );
    }

    #[test]
    fn test_get_parsed() {
        let conn = open_in_memory().unwrap();
        set(&conn, "size", " 20 ").unwrap();
        set(&conn, "junk", "abc").unwrap();
        assert_eq!(get_parsed::<u16>(&conn, "size").unwrap(), Some(20));
        assert_eq!(get_parsed::<u16>(&conn, "junk").unwrap(), None);
        assert_eq!(get_parsed::<u16>(&conn, "missing").unwrap(), None);
    }
}
