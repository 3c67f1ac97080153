//! tabmux-session: the terminal session multiplexer.
//!
//! Owns any number of terminal sessions, routes keystrokes either to a remote
//! process through a [`Transport`] or to a local line editor, and keeps
//! exactly one session active for focus, input and rendering.
//!
//! # Architecture
//!
//! - [`Multiplexer`] — session lifecycle, the active session, transport fan-out.
//! - [`Registry`] — id → session map in tab order.
//! - [`router`] — per-event choice between remote and local input.
//! - [`editor`] / [`command`] / [`history`] — local line editing, slash
//!   commands and history recall.
//! - Capabilities: [`Emulator`] (with [`VtEmulator`] over `tabmux-vt`),
//!   [`Transport`] (with [`PtyTransport`] over portable-pty) and
//!   [`SettingsStore`].

pub mod command;
pub mod dispose;
pub mod editor;
pub mod emulator;
pub mod error;
pub mod history;
pub mod multiplexer;
pub mod pty;
pub mod registry;
pub mod router;
pub mod session;
pub mod settings;
pub mod transport;

#[cfg(test)]
mod testing;

pub use dispose::{Disposables, Subscription};
pub use emulator::{
    Emulator, EmulatorFactory, Viewport, VtEmulator, VtEmulatorFactory, DEFAULT_FONT_SIZE,
    FONT_SIZE_RANGE,
};
pub use error::{MuxError, Result, TransportError};
pub use history::{History, DEFAULT_HISTORY_LIMIT};
pub use multiplexer::{Multiplexer, MuxConfig, Notification};
pub use pty::{default_shell, PtyHandle, RemoteSpec};
pub use registry::Registry;
pub use session::{Lifecycle, Mode, Session, SessionId, SessionInfo};
pub use settings::{MemorySettings, SettingsStore, FONT_SIZE_KEY};
pub use transport::{PtyTransport, RemoteStatus, Transport, TransportEvent};
