//! Local line editing for sessions without a connected remote.
//!
//! Input is decoded lossily and split into units (one character or one
//! escape sequence). Each unit is classified as a [`Key`] and applied to the
//! session's buffer, history and emulator so the visible line always matches
//! the buffer.

use unicode_width::UnicodeWidthChar;

use crate::emulator::Emulator;
use crate::history::{erase_sequence, Direction, History};

/// Written before every local input line.
pub const PROMPT: &str = "\r\n\x1b[32m$\x1b[0m ";

const ESC: char = '\x1b';

/// One classified input unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Key {
    Printable(char),
    Backspace,
    Enter,
    Interrupt,
    ClearScreen,
    HistoryOlder,
    HistoryNewer,
    /// Unhandled control character or escape sequence.
    Ignored,
}

/// Split decoded input into characters and escape sequences.
///
/// Recognized sequences are `ESC [ params final`, `ESC O x` and a lone
/// `ESC`. An unterminated CSI at the end of input is kept as one unit.
pub fn split_units(text: &str) -> Vec<String> {
    let mut units = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != ESC {
            units.push(c.to_string());
            continue;
        }
        let mut unit = String::from(ESC);
        match chars.peek().copied() {
            Some('[') => {
                unit.push('[');
                chars.next();
                for next in chars.by_ref() {
                    unit.push(next);
                    if ('\x40'..='\x7e').contains(&next) {
                        break;
                    }
                }
            }
            Some('O') => {
                unit.push('O');
                chars.next();
                if let Some(next) = chars.next() {
                    unit.push(next);
                }
            }
            _ => {}
        }
        units.push(unit);
    }
    units
}

/// Classify one unit from [`split_units`].
pub fn classify(unit: &str) -> Key {
    let mut chars = unit.chars();
    let Some(first) = chars.next() else {
        return Key::Ignored;
    };
    if first == ESC {
        return match unit {
            "\x1b[A" | "\x1bOA" => Key::HistoryOlder,
            "\x1b[B" | "\x1bOB" => Key::HistoryNewer,
            _ => Key::Ignored,
        };
    }
    match first {
        '\r' => Key::Enter,
        '\x7f' => Key::Backspace,
        '\x03' => Key::Interrupt,
        '\x0c' => Key::ClearScreen,
        c if c < ' ' => Key::Ignored,
        c => Key::Printable(c),
    }
}

/// Decode and classify a chunk of input bytes.
pub fn keys(bytes: &[u8]) -> Vec<Key> {
    split_units(&String::from_utf8_lossy(bytes))
        .iter()
        .map(|unit| classify(unit))
        .collect()
}

/// Result of applying one key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Edit {
    /// Buffer and screen were updated; nothing else to do.
    Handled,
    /// A non-empty line was submitted (already trimmed and in history).
    /// The caller decides whether it is a local command.
    Submitted(String),
}

/// Apply `key` to one session's line state.
pub fn apply<E: Emulator + ?Sized>(
    key: Key,
    buffer: &mut String,
    history: &mut History,
    emulator: &mut E,
) -> Edit {
    match key {
        Key::Printable(c) => {
            buffer.push(c);
            let mut encoded = [0u8; 4];
            emulator.write(c.encode_utf8(&mut encoded).as_bytes());
        }
        Key::Backspace => {
            if let Some(c) = buffer.pop() {
                let cells = c.width().unwrap_or(0);
                emulator.write(erase_sequence(cells).as_bytes());
            }
        }
        Key::Enter => {
            emulator.write_line("");
            let line = buffer.trim().to_string();
            buffer.clear();
            if line.is_empty() {
                emulator.write(PROMPT.as_bytes());
            } else {
                history.push(line.clone());
                return Edit::Submitted(line);
            }
        }
        Key::Interrupt => {
            emulator.write_line("^C");
            emulator.write(PROMPT.as_bytes());
            buffer.clear();
        }
        Key::ClearScreen => {
            emulator.clear();
            emulator.write(PROMPT.as_bytes());
            emulator.write(buffer.as_bytes());
        }
        Key::HistoryOlder | Key::HistoryNewer => {
            let direction = if key == Key::HistoryOlder {
                Direction::Older
            } else {
                Direction::Newer
            };
            if let Some(recall) = history.navigate(buffer, direction) {
                emulator.write(erase_sequence(recall.erase).as_bytes());
                emulator.write(recall.buffer.as_bytes());
                *buffer = recall.buffer;
            }
        }
        Key::Ignored => {}
    }
    Edit::Handled
}
