//! Draws the active session and the status line onto the host terminal.
//!
//! The host loop calls [`Renderer::render`] on every tick; a frame is only
//! produced when the active emulator reports damage, the active session
//! changed, or the status line text changed.

use std::io::{self, Write};

use crossterm::cursor::{Hide, MoveTo, SetCursorStyle, Show};
use crossterm::style::{
    Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use crossterm::terminal::{Clear, ClearType};
use crossterm::queue;

use tabmux_session::{Mode, SessionId, SessionInfo};
use tabmux_vt::{CellColor, CellFlags, CursorShape, VtCell, VtTerminal};

pub fn to_color(color: CellColor) -> Color {
    match color {
        CellColor::Default => Color::Reset,
        CellColor::Indexed(i) => Color::AnsiValue(i),
        CellColor::Rgb(rgb) => Color::Rgb {
            r: rgb.r,
            g: rgb.g,
            b: rgb.b,
        },
    }
}

const ATTRIBUTES: [(CellFlags, Attribute); 6] = [
    (CellFlags::BOLD, Attribute::Bold),
    (CellFlags::ITALIC, Attribute::Italic),
    (CellFlags::UNDERLINE, Attribute::Underlined),
    (CellFlags::STRIKETHROUGH, Attribute::CrossedOut),
    (CellFlags::INVERSE, Attribute::Reverse),
    (CellFlags::DIM, Attribute::Dim),
];

#[derive(Clone, Copy, PartialEq, Eq)]
struct Style {
    fg: CellColor,
    bg: CellColor,
    flags: CellFlags,
}

impl Style {
    fn of(cell: &VtCell) -> Self {
        Self {
            fg: cell.fg,
            bg: cell.bg,
            flags: cell.flags,
        }
    }

    fn apply<W: Write>(&self, out: &mut W) -> io::Result<()> {
        queue!(
            out,
            SetAttribute(Attribute::Reset),
            SetForegroundColor(to_color(self.fg)),
            SetBackgroundColor(to_color(self.bg))
        )?;
        for (flag, attr) in ATTRIBUTES {
            if self.flags.contains(flag) {
                queue!(out, SetAttribute(attr))?;
            }
        }
        Ok(())
    }
}

/// Queue one full frame of `term` at the top of the screen.
pub fn draw_screen<W: Write>(out: &mut W, term: &VtTerminal) -> io::Result<()> {
    let screen = term.screen();
    let mut current: Option<Style> = None;

    for row in 0..screen.rows() {
        queue!(out, MoveTo(0, row))?;
        for cell in screen.row_cells(row) {
            if cell.is_spacer() {
                continue;
            }
            let style = Style::of(&cell);
            if current != Some(style) {
                style.apply(out)?;
                current = Some(style);
            }
            let ch = if cell.flags.contains(CellFlags::HIDDEN) {
                ' '
            } else {
                cell.codepoint
            };
            queue!(out, Print(ch))?;
        }
    }
    queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
    Ok(())
}

fn draw_cursor<W: Write>(out: &mut W, term: &VtTerminal) -> io::Result<()> {
    let cursor = term.cursor();
    if !cursor.visible || cursor.shape == CursorShape::Hidden {
        return queue!(out, Hide);
    }
    let style = match cursor.shape {
        CursorShape::Underline => SetCursorStyle::SteadyUnderScore,
        CursorShape::Bar => SetCursorStyle::SteadyBar,
        _ => SetCursorStyle::SteadyBlock,
    };
    queue!(out, MoveTo(cursor.col, cursor.row), style, Show)
}

/// Label shown for the active session's connection.
pub fn connection_label(info: &SessionInfo) -> String {
    match (&info.remote_key, info.mode) {
        (Some(key), Mode::Remote) => match info.remote_status {
            Some(status) => format!("{} {}", key, status.label()),
            None => format!("{} connected", key),
        },
        (Some(key), Mode::Local) => format!("{} offline", key),
        (None, _) => "local".to_string(),
    }
}

/// Status line text padded or cut to exactly `width` characters.
///
/// Tabs are listed left to right as `N:title`, the active one marked with
/// `*`; `right` is right-aligned and wins when space runs out.
pub fn status_line(sessions: &[SessionInfo], right: &str, width: usize) -> String {
    let tabs = sessions
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let marker = if s.active { "*" } else { "" };
            format!("{}:{}{}", i + 1, s.title, marker)
        })
        .collect::<Vec<_>>()
        .join(" ");

    let right: String = right.chars().take(width).collect();
    let right_len = right.chars().count();
    let room = width.saturating_sub(right_len + 1);
    let mut left: String = format!(" {}", tabs).chars().take(room).collect();

    let pad = width.saturating_sub(left.chars().count() + right_len);
    left.extend(std::iter::repeat(' ').take(pad));
    left.push_str(&right);
    left
}

/// Redraws on change.
pub struct Renderer<W: Write> {
    out: W,
    last_active: Option<SessionId>,
    last_status: String,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_active: None,
            last_status: String::new(),
        }
    }

    /// Forget what is on screen so the next frame is drawn in full.
    pub fn invalidate(&mut self) {
        self.last_active = None;
        self.last_status.clear();
    }

    /// Draw `term` (the active session, if any) and the status line on the
    /// last row. `dirty` is the emulator's damage flag.
    pub fn render(
        &mut self,
        active: Option<(SessionId, &VtTerminal)>,
        dirty: bool,
        status: &str,
        status_row: u16,
    ) -> io::Result<()> {
        let active_id = active.map(|(id, _)| id);
        let switched = active_id != self.last_active;
        let status_changed = status != self.last_status;
        if !dirty && !switched && !status_changed {
            return Ok(());
        }

        queue!(self.out, Hide)?;
        if switched {
            queue!(self.out, Clear(ClearType::All))?;
        }
        if let Some((_, term)) = active {
            if dirty || switched {
                draw_screen(&mut self.out, term)?;
            }
        }

        queue!(
            self.out,
            MoveTo(0, status_row),
            SetAttribute(Attribute::Reverse),
            Print(status),
            SetAttribute(Attribute::Reset)
        )?;

        if let Some((_, term)) = active {
            draw_cursor(&mut self.out, term)?;
        }
        self.out.flush()?;

        self.last_active = active_id;
        self.last_status = status.to_string();
        Ok(())
    }

    /// Queue raw bytes for the host terminal (clipboard requests etc.).
    pub fn passthrough(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes)?;
        self.out.flush()
    }

    #[cfg(test)]
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabmux_session::RemoteStatus;
    use tabmux_vt::Rgb;

    fn info(id: SessionId, title: &str, active: bool) -> SessionInfo {
        SessionInfo {
            id,
            remote_key: None,
            mode: Mode::Local,
            active,
            title: title.to_string(),
            history_len: 0,
            remote_status: None,
        }
    }

    #[test]
    fn test_color_mapping() {
        assert_eq!(to_color(CellColor::Default), Color::Reset);
        assert_eq!(to_color(CellColor::Indexed(9)), Color::AnsiValue(9));
        assert_eq!(
            to_color(CellColor::Rgb(Rgb::new(1, 2, 3))),
            Color::Rgb { r: 1, g: 2, b: 3 }
        );
    }

    #[test]
    fn test_status_line_layout() {
        let sessions = vec![info(1, "Terminal 1", false), info(2, "api", true)];
        let line = status_line(&sessions, "local | 14px | 09:30", 50);

        assert_eq!(line.chars().count(), 50);
        assert!(line.starts_with(" 1:Terminal 1 2:api*"));
        assert!(line.ends_with("local | 14px | 09:30"));
    }

    #[test]
    fn test_status_line_truncates_tabs_first() {
        let sessions = vec![info(1, "a-very-long-session-title", true)];
        let line = status_line(&sessions, "12:00", 12);
        assert_eq!(line.chars().count(), 12);
        assert!(line.ends_with("12:00"));
    }

    #[test]
    fn test_connection_label() {
        let mut s = info(1, "api", true);
        assert_eq!(connection_label(&s), "local");

        s.remote_key = Some("api".into());
        assert_eq!(connection_label(&s), "api offline");

        s.mode = Mode::Remote;
        s.remote_status = Some(RemoteStatus::Started);
        assert_eq!(connection_label(&s), "api running");
    }

    #[test]
    fn test_render_skips_unchanged_frames() {
        let mut term = VtTerminal::new(10, 2);
        term.write(b"hi");
        let mut renderer = Renderer::new(Vec::new());

        renderer.render(Some((1, &term)), true, "status", 2).unwrap();
        let first = renderer.get_mut().len();
        assert!(first > 0);
        assert!(String::from_utf8_lossy(renderer.get_mut()).contains("status"));

        renderer.render(Some((1, &term)), false, "status", 2).unwrap();
        assert_eq!(renderer.get_mut().len(), first);

        renderer.render(Some((1, &term)), false, "status 2", 2).unwrap();
        assert!(renderer.get_mut().len() > first);
    }
}
