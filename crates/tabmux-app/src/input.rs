//! Translation of crossterm key events into session input and host shortcuts.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Key that introduces a host shortcut, e.g. `ctrl-b`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrefixKey {
    pub ch: char,
    pub ctrl: bool,
}

impl PrefixKey {
    /// Accepts `ctrl-b`, `ctrl+b`, `C-b` or a bare character.
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim().to_ascii_lowercase();
        let (ctrl, rest) = ["ctrl-", "ctrl+", "c-"]
            .iter()
            .find_map(|p| spec.strip_prefix(p).map(|rest| (true, rest)))
            .unwrap_or((false, spec.as_str()));

        let mut chars = rest.chars();
        let ch = chars.next()?;
        if chars.next().is_some() || !ch.is_ascii_graphic() {
            return None;
        }
        if ctrl && !ch.is_ascii_alphabetic() {
            return None;
        }
        Some(Self { ch, ctrl })
    }

    pub fn matches(&self, key: &KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char(c) => ctrl == self.ctrl && c.to_ascii_lowercase() == self.ch,
            _ => false,
        }
    }

    /// Bytes the prefix itself produces when typed twice.
    pub fn bytes(&self) -> Vec<u8> {
        if self.ctrl {
            vec![(self.ch as u8) & 0x1f]
        } else {
            self.ch.to_string().into_bytes()
        }
    }
}

impl Default for PrefixKey {
    fn default() -> Self {
        Self { ch: 'b', ctrl: true }
    }
}

/// Host-level action bound to `prefix` + key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shortcut {
    NewSession,
    Split,
    Close,
    Next,
    Previous,
    /// Zero-based tab index.
    GoTo(usize),
    Clear,
    Quit,
}

impl Shortcut {
    fn from_key(key: &KeyEvent) -> Option<Self> {
        let KeyCode::Char(c) = key.code else {
            return None;
        };
        match c {
            'c' => Some(Self::NewSession),
            's' => Some(Self::Split),
            'x' => Some(Self::Close),
            'n' => Some(Self::Next),
            'p' => Some(Self::Previous),
            'l' => Some(Self::Clear),
            'q' => Some(Self::Quit),
            '1'..='9' => Some(Self::GoTo(c as usize - '1' as usize)),
            _ => None,
        }
    }
}

/// What to do with one key event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Send these bytes to the active session.
    Input(Vec<u8>),
    Shortcut(Shortcut),
    /// Swallowed (prefix pressed, unbound shortcut, unencodable key).
    None,
}

/// Tracks whether the prefix key is pending.
#[derive(Debug)]
pub struct KeyRouter {
    prefix: PrefixKey,
    pending: bool,
}

impl KeyRouter {
    pub fn new(prefix: PrefixKey) -> Self {
        Self {
            prefix,
            pending: false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn feed(&mut self, key: &KeyEvent) -> Action {
        if std::mem::take(&mut self.pending) {
            if self.prefix.matches(key) {
                return Action::Input(self.prefix.bytes());
            }
            return match Shortcut::from_key(key) {
                Some(shortcut) => Action::Shortcut(shortcut),
                None => Action::None,
            };
        }
        if self.prefix.matches(key) {
            self.pending = true;
            return Action::None;
        }
        match encode_key(key) {
            Some(bytes) => Action::Input(bytes),
            None => Action::None,
        }
    }
}

/// Bytes an xterm-compatible terminal sends for `key`.
pub fn encode_key(key: &KeyEvent) -> Option<Vec<u8>> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    let mut bytes = match key.code {
        KeyCode::Char(c) if ctrl => vec![control_byte(c)?],
        KeyCode::Char(c) => c.to_string().into_bytes(),
        KeyCode::Enter => vec![b'\r'],
        KeyCode::Backspace => vec![0x7f],
        KeyCode::Tab => vec![b'\t'],
        KeyCode::BackTab => b"\x1b[Z".to_vec(),
        KeyCode::Esc => vec![0x1b],
        KeyCode::Up => b"\x1b[A".to_vec(),
        KeyCode::Down => b"\x1b[B".to_vec(),
        KeyCode::Right => b"\x1b[C".to_vec(),
        KeyCode::Left => b"\x1b[D".to_vec(),
        KeyCode::Home => b"\x1b[H".to_vec(),
        KeyCode::End => b"\x1b[F".to_vec(),
        KeyCode::PageUp => b"\x1b[5~".to_vec(),
        KeyCode::PageDown => b"\x1b[6~".to_vec(),
        KeyCode::Insert => b"\x1b[2~".to_vec(),
        KeyCode::Delete => b"\x1b[3~".to_vec(),
        KeyCode::F(n) => function_key(n)?,
        _ => return None,
    };
    if alt {
        bytes.insert(0, 0x1b);
    }
    Some(bytes)
}

fn control_byte(c: char) -> Option<u8> {
    match c {
        'a'..='z' | 'A'..='Z' => Some((c.to_ascii_lowercase() as u8) & 0x1f),
        ' ' | '@' | '2' => Some(0),
        '[' | '3' => Some(0x1b),
        '\\' | '4' => Some(0x1c),
        ']' | '5' => Some(0x1d),
        '^' | '6' => Some(0x1e),
        '_' | '7' | '/' => Some(0x1f),
        '?' | '8' => Some(0x7f),
        _ => None,
    }
}

fn function_key(n: u8) -> Option<Vec<u8>> {
    let seq: &[u8] = match n {
        1 => b"\x1bOP",
        2 => b"\x1bOQ",
        3 => b"\x1bOR",
        4 => b"\x1bOS",
        5 => b"\x1b[15~",
        6 => b"\x1b[17~",
        7 => b"\x1b[18~",
        8 => b"\x1b[19~",
        9 => b"\x1b[20~",
        10 => b"\x1b[21~",
        11 => b"\x1b[23~",
        12 => b"\x1b[24~",
        _ => return None,
    };
    Some(seq.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_parse_prefix() {
        assert_eq!(PrefixKey::parse("ctrl-b"), Some(PrefixKey::default()));
        assert_eq!(
            PrefixKey::parse("C-a"),
            Some(PrefixKey { ch: 'a', ctrl: true })
        );
        assert_eq!(
            PrefixKey::parse("`"),
            Some(PrefixKey { ch: '`', ctrl: false })
        );
        assert_eq!(PrefixKey::parse("ctrl-"), None);
        assert_eq!(PrefixKey::parse("ctrl-ab"), None);
        assert_eq!(PrefixKey::parse("ctrl-1"), None);
    }

    #[test]
    fn test_encode_basic_keys() {
        assert_eq!(encode_key(&key(KeyCode::Char('x'))), Some(b"x".to_vec()));
        assert_eq!(encode_key(&key(KeyCode::Enter)), Some(b"\r".to_vec()));
        assert_eq!(encode_key(&key(KeyCode::Backspace)), Some(vec![0x7f]));
        assert_eq!(encode_key(&key(KeyCode::Up)), Some(b"\x1b[A".to_vec()));
        assert_eq!(encode_key(&key(KeyCode::F(1))), Some(b"\x1bOP".to_vec()));
        assert_eq!(encode_key(&key(KeyCode::F(20))), None);
    }

    #[test]
    fn test_encode_modifiers() {
        assert_eq!(encode_key(&ctrl('c')), Some(vec![0x03]));
        assert_eq!(encode_key(&ctrl('l')), Some(vec![0x0c]));
        let alt_x = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::ALT);
        assert_eq!(encode_key(&alt_x), Some(b"\x1bx".to_vec()));
    }

    #[test]
    fn test_encode_utf8() {
        assert_eq!(
            encode_key(&key(KeyCode::Char('é'))),
            Some("é".as_bytes().to_vec())
        );
    }

    #[test]
    fn test_prefix_then_shortcut() {
        let mut router = KeyRouter::new(PrefixKey::default());
        assert_eq!(router.feed(&ctrl('b')), Action::None);
        assert!(router.is_pending());
        assert_eq!(
            router.feed(&key(KeyCode::Char('n'))),
            Action::Shortcut(Shortcut::Next)
        );
        assert!(!router.is_pending());

        router.feed(&ctrl('b'));
        assert_eq!(
            router.feed(&key(KeyCode::Char('3'))),
            Action::Shortcut(Shortcut::GoTo(2))
        );
    }

    #[test]
    fn test_double_prefix_sends_literal() {
        let mut router = KeyRouter::new(PrefixKey::default());
        router.feed(&ctrl('b'));
        assert_eq!(router.feed(&ctrl('b')), Action::Input(vec![0x02]));
    }

    #[test]
    fn test_unbound_after_prefix_is_swallowed() {
        let mut router = KeyRouter::new(PrefixKey::default());
        router.feed(&ctrl('b'));
        assert_eq!(router.feed(&key(KeyCode::Char('z'))), Action::None);
        assert_eq!(
            router.feed(&key(KeyCode::Char('z'))),
            Action::Input(b"z".to_vec())
        );
    }
}
