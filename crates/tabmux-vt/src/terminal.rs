use std::sync::{Arc, Mutex};

use alacritty_terminal::event::{Event, EventListener};
use alacritty_terminal::grid::Dimensions;
use alacritty_terminal::index::{Column, Line, Point, Side};
use alacritty_terminal::selection::{Selection, SelectionType};
use alacritty_terminal::term::{Config, Term};
use alacritty_terminal::vte::ansi;

use crate::screen::{convert_cursor_shape, CursorState, ScreenView};

/// Cursor home, erase display, erase scrollback.
const CLEAR_SEQUENCE: &[u8] = b"\x1b[H\x1b[2J\x1b[3J";

/// Scrollback kept per session.
const SCROLLBACK_LINES: usize = 1000;

#[derive(Default)]
struct EventState {
    title: Option<String>,
    replies: Vec<String>,
}

/// Collects the terminal events tabmux cares about: title changes and
/// replies the emulator wants sent back to the process (DSR, DA, ...).
#[derive(Clone)]
pub struct EventProxy {
    state: Arc<Mutex<EventState>>,
}

impl EventProxy {
    fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(EventState::default())),
        }
    }
}

impl EventListener for EventProxy {
    fn send_event(&self, event: Event) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        match event {
            Event::Title(title) => state.title = Some(title),
            Event::ResetTitle => state.title = None,
            Event::PtyWrite(data) => state.replies.push(data),
            _ => {}
        }
    }
}

struct TermSize {
    columns: usize,
    screen_lines: usize,
}

impl TermSize {
    fn new(cols: u16, rows: u16) -> Self {
        Self {
            columns: cols.max(1) as usize,
            screen_lines: rows.max(1) as usize,
        }
    }
}

impl Dimensions for TermSize {
    fn total_lines(&self) -> usize {
        self.screen_lines
    }

    fn screen_lines(&self) -> usize {
        self.screen_lines
    }

    fn columns(&self) -> usize {
        self.columns
    }
}

/// Terminal state for one session: grid, cursor, scrollback, title.
pub struct VtTerminal {
    term: Term<EventProxy>,
    parser: ansi::Processor,
    events: EventProxy,
}

impl VtTerminal {
    /// Create a terminal of `cols` x `rows` (each clamped to at least 1).
    pub fn new(cols: u16, rows: u16) -> Self {
        let config = Config {
            scrolling_history: SCROLLBACK_LINES,
            ..Config::default()
        };
        let events = EventProxy::new();
        let term = Term::new(config, &TermSize::new(cols, rows), events.clone());

        Self {
            term,
            parser: ansi::Processor::new(),
            events,
        }
    }

    /// Feed output bytes through the parser into the grid.
    pub fn write(&mut self, bytes: &[u8]) {
        self.parser.advance(&mut self.term, bytes);
    }

    /// Wipe the visible screen and scrollback, cursor to the top-left.
    pub fn clear(&mut self) {
        self.term.selection = None;
        self.write(CLEAR_SEQUENCE);
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.term.resize(TermSize::new(cols, rows));
    }

    /// Current `(cols, rows)`.
    pub fn size(&self) -> (u16, u16) {
        (self.term.columns() as u16, self.term.screen_lines() as u16)
    }

    pub fn screen(&self) -> ScreenView<'_> {
        ScreenView::new(&self.term)
    }

    pub fn cursor(&self) -> CursorState {
        let content = self.term.renderable_content();
        let cursor = &content.cursor;

        CursorState {
            row: cursor.point.line.0.max(0) as u16,
            col: cursor.point.column.0 as u16,
            shape: convert_cursor_shape(cursor.shape),
            visible: cursor.shape != ansi::CursorShape::Hidden,
        }
    }

    /// Title set through OSC 0/2, if any.
    pub fn title(&self) -> Option<String> {
        self.events.state.lock().ok().and_then(|s| s.title.clone())
    }

    /// Drain replies the emulator produced while parsing (e.g. the answer
    /// to a cursor position report). They belong to the process on the
    /// other end, not to the screen.
    pub fn take_replies(&mut self) -> Vec<String> {
        match self.events.state.lock() {
            Ok(mut state) => std::mem::take(&mut state.replies),
            Err(_) => Vec::new(),
        }
    }

    /// Select a simple (stream) range between two visible cells, inclusive.
    pub fn select(&mut self, start: (u16, u16), end: (u16, u16)) {
        let point = |(row, col): (u16, u16)| Point::new(Line(row as i32), Column(col as usize));
        let mut selection = Selection::new(SelectionType::Simple, point(start), Side::Left);
        selection.update(point(end), Side::Right);
        self.term.selection = Some(selection);
    }

    pub fn clear_selection(&mut self) {
        self.term.selection = None;
    }

    /// Text under the current selection, `None` when nothing is selected.
    pub fn selected_text(&self) -> Option<String> {
        self.term
            .selection_to_string()
            .filter(|text| !text.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{CellColor, CellFlags};

    #[test]
    fn test_new_terminal_dimensions() {
        let term = VtTerminal::new(80, 24);
        assert_eq!(term.size(), (80, 24));
        assert_eq!(term.screen().cols(), 80);
        assert_eq!(term.screen().rows(), 24);
    }

    #[test]
    fn test_zero_size_is_clamped() {
        let term = VtTerminal::new(0, 0);
        assert_eq!(term.size(), (1, 1));
    }

    #[test]
    fn test_write_text() {
        let mut term = VtTerminal::new(80, 24);
        term.write(b"hello");

        assert_eq!(term.screen().row_text(0), "hello");
        assert_eq!(term.screen().cell(0, 5).codepoint, ' ');
    }

    #[test]
    fn test_crlf_moves_to_next_row() {
        let mut term = VtTerminal::new(20, 5);
        term.write(b"one\r\ntwo");

        let lines = term.screen().lines();
        assert_eq!(lines[0], "one");
        assert_eq!(lines[1], "two");
    }

    #[test]
    fn test_erase_sequence_removes_char() {
        let mut term = VtTerminal::new(20, 5);
        term.write(b"abc\x08 \x08");

        assert_eq!(term.screen().row_text(0), "ab");
        assert_eq!(term.cursor().col, 2);
    }

    #[test]
    fn test_indexed_foreground() {
        let mut term = VtTerminal::new(80, 24);
        term.write(b"\x1b[31mR");

        let cell = term.screen().cell(0, 0);
        assert_eq!(cell.codepoint, 'R');
        assert_eq!(cell.fg, CellColor::Indexed(1));
        assert_eq!(cell.bg, CellColor::Default);
    }

    #[test]
    fn test_truecolor_foreground() {
        let mut term = VtTerminal::new(80, 24);
        term.write(b"\x1b[38;2;10;20;30mX");

        let cell = term.screen().cell(0, 0);
        assert_eq!(cell.fg, CellColor::Rgb(crate::cell::Rgb::new(10, 20, 30)));
    }

    #[test]
    fn test_bold_flag() {
        let mut term = VtTerminal::new(80, 24);
        term.write(b"\x1b[1mB");

        assert!(term.screen().cell(0, 0).flags.contains(CellFlags::BOLD));
    }

    #[test]
    fn test_resize() {
        let mut term = VtTerminal::new(80, 24);
        term.resize(120, 40);
        assert_eq!(term.size(), (120, 40));
    }

    #[test]
    fn test_cursor_wraps() {
        let mut term = VtTerminal::new(10, 5);
        term.write(b"0123456789AB");

        let cursor = term.cursor();
        assert_eq!((cursor.row, cursor.col), (1, 2));
        assert!(cursor.visible);
    }

    #[test]
    fn test_clear_wipes_screen() {
        let mut term = VtTerminal::new(20, 5);
        term.write(b"first\r\nsecond");
        term.clear();

        assert!(term.screen().lines().iter().all(|l| l.is_empty()));
        let cursor = term.cursor();
        assert_eq!((cursor.row, cursor.col), (0, 0));
    }

    #[test]
    fn test_title_from_osc() {
        let mut term = VtTerminal::new(80, 24);
        assert_eq!(term.title(), None);

        term.write(b"\x1b]0;build shell\x07");
        assert_eq!(term.title(), Some("build shell".to_string()));
    }

    #[test]
    fn test_cursor_report_reply() {
        let mut term = VtTerminal::new(80, 24);
        term.write(b"\x1b[6n");

        let replies = term.take_replies();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].starts_with("\x1b["));
        assert!(term.take_replies().is_empty());
    }

    #[test]
    fn test_selection_text() {
        let mut term = VtTerminal::new(20, 5);
        term.write(b"copy me please");
        assert_eq!(term.selected_text(), None);

        term.select((0, 0), (0, 6));
        assert_eq!(term.selected_text(), Some("copy me".to_string()));

        term.clear_selection();
        assert_eq!(term.selected_text(), None);
    }
}
