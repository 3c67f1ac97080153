//! Slash commands understood by the local line editor.

use crate::emulator::FONT_SIZE_RANGE;

/// A recognized local command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocalCommand {
    Help,
    Clear,
    Exit,
    Status,
    /// `/font` with its raw argument, if one was given.
    Font(Option<String>),
}

impl LocalCommand {
    /// Parse a submitted line. The first word selects the command and is
    /// matched case-insensitively; anything unrecognized yields `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let name = words.next()?.to_ascii_lowercase();
        match name.as_str() {
            "/help" => Some(Self::Help),
            "/clear" => Some(Self::Clear),
            "/exit" => Some(Self::Exit),
            "/status" => Some(Self::Status),
            "/font" => Some(Self::Font(words.next().map(str::to_string))),
            _ => None,
        }
    }
}

/// Outcome of validating a `/font` argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontArg {
    Valid(u16),
    OutOfRange,
}

/// Parse a `/font` argument. Leading digits are taken the way a lenient
/// integer parse would ("12px" is 12); anything without digits is out of
/// range.
pub fn parse_font_size(arg: &str) -> FontArg {
    let digits: String = arg
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    match digits.parse::<u16>() {
        Ok(size) if FONT_SIZE_RANGE.contains(&size) => FontArg::Valid(size),
        _ => FontArg::OutOfRange,
    }
}

pub const HELP_LINES: &[&str] = &[
    "\r\n\x1b[36mTerminal Commands:\x1b[0m",
    "  /help     - Show this help message",
    "  /clear    - Clear terminal screen",
    "  /exit     - Close terminal",
    "  /status   - Show terminal status",
    "  /font     - Change font size",
    "\r\n\x1b[36mKeyboard Shortcuts:\x1b[0m",
    "  Ctrl+C    - Interrupt current command",
    "  Ctrl+L    - Clear screen",
    "  Up/Down   - Navigate command history",
    "  Ctrl+B c  - New session",
    "  Ctrl+B s  - Split (same remote)",
    "  Ctrl+B x  - Close session",
    "  Ctrl+B n/p - Next / previous session",
    "  Ctrl+B 1-9 - Go to session",
    "  Ctrl+B q  - Quit",
];
