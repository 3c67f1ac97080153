//! Per-session command history and up/down recall.

use unicode_width::UnicodeWidthStr;

/// Default number of commands kept per session.
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Which way to move through history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Towards the oldest entry (up arrow).
    Older,
    /// Towards the fresh buffer (down arrow).
    Newer,
}

/// Result of a successful navigation step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recall {
    /// Buffer contents after the step.
    pub buffer: String,
    /// Cursor after the step, `history.len()` meaning "fresh buffer".
    pub cursor: usize,
    /// Terminal cells the previous buffer occupied; this many must be
    /// erased on screen.
    pub erase: usize,
}

/// Move `cursor` one step in `direction`.
///
/// Returns `None` when the step would leave `0..=history.len()`; cursor and
/// buffer are then unchanged.
pub fn navigate<S: AsRef<str>>(
    history: &[S],
    cursor: usize,
    buffer: &str,
    direction: Direction,
) -> Option<Recall> {
    if history.is_empty() {
        return None;
    }
    let cursor = cursor.min(history.len());

    let next = match direction {
        Direction::Older => cursor.checked_sub(1)?,
        Direction::Newer if cursor < history.len() => cursor + 1,
        Direction::Newer => return None,
    };

    let buffer_next = if next == history.len() {
        String::new()
    } else {
        history[next].as_ref().to_string()
    };

    Some(Recall {
        buffer: buffer_next,
        cursor: next,
        erase: buffer.width(),
    })
}

/// Bytes that blank out the last `n` cells of the visible line and leave
/// the cursor where the first of them was.
pub fn erase_sequence(n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let mut seq = String::with_capacity(n * 3);
    seq.push_str(&"\x08".repeat(n));
    seq.push_str(&" ".repeat(n));
    seq.push_str(&"\x08".repeat(n));
    seq
}

/// Submitted commands, oldest first, capped at `limit` entries.
#[derive(Clone, Debug)]
pub struct History {
    entries: Vec<String>,
    cursor: usize,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            limit: limit.max(1),
        }
    }

    /// Append a command, evicting the oldest entries past the limit, and
    /// reset the cursor to the fresh-buffer position.
    pub fn push(&mut self, command: impl Into<String>) {
        self.entries.push(command.into());
        if self.entries.len() > self.limit {
            let excess = self.entries.len() - self.limit;
            self.entries.drain(..excess);
        }
        self.cursor = self.entries.len();
    }

    /// Step through history; applies the new cursor on success.
    pub fn navigate(&mut self, buffer: &str, direction: Direction) -> Option<Recall> {
        let recall = navigate(&self.entries, self.cursor, buffer, direction)?;
        self.cursor = recall.cursor;
        Some(recall)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
