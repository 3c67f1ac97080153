//! The emulator-widget capability and its VT-backed implementation.

use std::cell::Cell;
use std::rc::Rc;

use tabmux_vt::VtTerminal;

use crate::error::Result;
use crate::session::SessionId;

/// Font size used when nothing has been persisted.
pub const DEFAULT_FONT_SIZE: u16 = 14;

/// Accepted font sizes, inclusive.
pub const FONT_SIZE_RANGE: std::ops::RangeInclusive<u16> = 8..=32;

/// What the multiplexer needs from the thing that renders a session.
///
/// Input and resize notifications flow the other way, as events delivered
/// through [`crate::Multiplexer::send_input`] and
/// [`crate::Multiplexer::resize_session`].
pub trait Emulator {
    /// Write raw output (bytes may contain control sequences).
    fn write(&mut self, bytes: &[u8]);

    /// Write `text` followed by CRLF.
    fn write_line(&mut self, text: &str) {
        self.write(text.as_bytes());
        self.write(b"\r\n");
    }

    fn clear(&mut self);

    fn focus(&mut self);

    /// Mark the widget as the visible one (or not).
    fn set_active(&mut self, active: bool);

    /// Resize to the container; returns the new `(cols, rows)` if it changed.
    fn fit(&mut self) -> Option<(u16, u16)>;

    fn resize(&mut self, cols: u16, rows: u16);

    fn size(&self) -> (u16, u16);

    fn set_font_size(&mut self, size: u16);

    fn font_size(&self) -> u16;

    fn selected_text(&self) -> Option<String>;

    fn title(&self) -> Option<String> {
        None
    }

    /// Replies generated while interpreting output (cursor reports etc.)
    /// that belong to the remote process.
    fn take_replies(&mut self) -> Vec<Vec<u8>> {
        Vec::new()
    }

    fn dispose(&mut self);
}

/// Builds one emulator per session.
pub trait EmulatorFactory {
    type Emulator: Emulator;

    fn create(&mut self, id: SessionId, font_size: u16) -> Result<Self::Emulator>;
}

/// Size of the area emulators are fitted into, shared between the host
/// (which updates it on terminal resize) and every emulator.
#[derive(Clone, Debug)]
pub struct Viewport(Rc<Cell<(u16, u16)>>);

impl Viewport {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self(Rc::new(Cell::new((cols, rows))))
    }

    pub fn set(&self, cols: u16, rows: u16) {
        self.0.set((cols, rows));
    }

    pub fn get(&self) -> (u16, u16) {
        self.0.get()
    }
}

/// Emulator backed by a [`VtTerminal`] grid.
///
/// The host renders it by reading [`VtEmulator::terminal`] whenever
/// [`VtEmulator::take_dirty`] reports a change.
pub struct VtEmulator {
    term: VtTerminal,
    viewport: Viewport,
    font_size: u16,
    focused: bool,
    active: bool,
    dirty: bool,
    disposed: bool,
}

impl VtEmulator {
    pub fn new(viewport: Viewport, font_size: u16) -> Self {
        let (cols, rows) = viewport.get();
        Self {
            term: VtTerminal::new(cols, rows),
            viewport,
            font_size,
            focused: false,
            active: false,
            dirty: true,
            disposed: false,
        }
    }

    pub fn terminal(&self) -> &VtTerminal {
        &self.term
    }

    pub fn terminal_mut(&mut self) -> &mut VtTerminal {
        self.dirty = true;
        &mut self.term
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Returns whether the grid changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

impl Emulator for VtEmulator {
    fn write(&mut self, bytes: &[u8]) {
        if self.disposed {
            return;
        }
        self.term.write(bytes);
        self.dirty = true;
    }

    fn clear(&mut self) {
        self.term.clear();
        self.dirty = true;
    }

    fn focus(&mut self) {
        self.focused = true;
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
        if !active {
            self.focused = false;
        }
        self.dirty = true;
    }

    fn fit(&mut self) -> Option<(u16, u16)> {
        let target = self.viewport.get();
        if target == self.term.size() {
            return None;
        }
        self.resize(target.0, target.1);
        Some(self.term.size())
    }

    fn resize(&mut self, cols: u16, rows: u16) {
        self.term.resize(cols, rows);
        self.dirty = true;
    }

    fn size(&self) -> (u16, u16) {
        self.term.size()
    }

    fn set_font_size(&mut self, size: u16) {
        self.font_size = size;
        self.dirty = true;
    }

    fn font_size(&self) -> u16 {
        self.font_size
    }

    fn selected_text(&self) -> Option<String> {
        self.term.selected_text()
    }

    fn title(&self) -> Option<String> {
        self.term.title()
    }

    fn take_replies(&mut self) -> Vec<Vec<u8>> {
        self.term
            .take_replies()
            .into_iter()
            .map(String::into_bytes)
            .collect()
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.focused = false;
        self.active = false;
    }
}

/// Creates [`VtEmulator`]s fitted to a shared viewport.
pub struct VtEmulatorFactory {
    viewport: Viewport,
}

impl VtEmulatorFactory {
    pub fn new(viewport: Viewport) -> Self {
        Self { viewport }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }
}

impl EmulatorFactory for VtEmulatorFactory {
    type Emulator = VtEmulator;

    fn create(&mut self, _id: SessionId, font_size: u16) -> Result<VtEmulator> {
        Ok(VtEmulator::new(self.viewport.clone(), font_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_follows_viewport() {
        let viewport = Viewport::new(80, 24);
        let mut emu = VtEmulator::new(viewport.clone(), DEFAULT_FONT_SIZE);
        assert_eq!(emu.fit(), None);

        viewport.set(100, 30);
        assert_eq!(emu.fit(), Some((100, 30)));
        assert_eq!(emu.size(), (100, 30));
        assert_eq!(emu.fit(), None);
    }

    #[test]
    fn test_write_line_appends_crlf() {
        let mut emu = VtEmulator::new(Viewport::new(20, 5), DEFAULT_FONT_SIZE);
        emu.write_line("first");
        emu.write(b"second");

        let lines = emu.terminal().screen().lines();
        assert_eq!(lines[0], "first");
        assert_eq!(lines[1], "second");
    }

    #[test]
    fn test_dirty_tracking() {
        let mut emu = VtEmulator::new(Viewport::new(20, 5), DEFAULT_FONT_SIZE);
        assert!(emu.take_dirty());
        assert!(!emu.take_dirty());

        emu.write(b"x");
        assert!(emu.take_dirty());
    }

    #[test]
    fn test_disposed_ignores_writes() {
        let mut emu = VtEmulator::new(Viewport::new(20, 5), DEFAULT_FONT_SIZE);
        emu.set_active(true);
        emu.focus();
        emu.dispose();

        emu.write(b"late output");
        assert!(emu.is_disposed());
        assert!(!emu.is_focused());
        assert_eq!(emu.terminal().screen().row_text(0), "");
    }

    #[test]
    fn test_deactivate_drops_focus() {
        let mut emu = VtEmulator::new(Viewport::new(20, 5), DEFAULT_FONT_SIZE);
        emu.set_active(true);
        emu.focus();
        assert!(emu.is_focused());

        emu.set_active(false);
        assert!(!emu.is_focused());
        assert!(!emu.is_active());
    }

    #[test]
    fn test_replies_as_bytes() {
        let mut emu = VtEmulator::new(Viewport::new(20, 5), DEFAULT_FONT_SIZE);
        emu.write(b"\x1b[6n");
        let replies = emu.take_replies();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0][0], 0x1b);
    }
}
