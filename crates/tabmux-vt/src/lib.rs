//! tabmux-vt: terminal emulation engine backing each tabmux session.
//!
//! Wraps `alacritty_terminal` so the rest of tabmux only deals with a small
//! API: feed bytes in, read cells, cursor and title out. Nothing here parses
//! escape sequences by hand.

pub mod cell;
pub mod screen;
pub mod terminal;

pub use cell::{CellColor, CellFlags, Rgb, VtCell};
pub use screen::{CursorShape, CursorState, ScreenView};
pub use terminal::VtTerminal;
