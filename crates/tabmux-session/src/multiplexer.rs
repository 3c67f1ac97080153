use std::fmt::Display;

use crate::command::{self, FontArg, LocalCommand};
use crate::editor::{self, Edit, PROMPT};
use crate::emulator::{Emulator, EmulatorFactory, FONT_SIZE_RANGE};
use crate::error::{MuxError, Result};
use crate::history::{History, DEFAULT_HISTORY_LIMIT};
use crate::registry::Registry;
use crate::router::{self, Route};
use crate::session::{Lifecycle, Mode, Session, SessionId, SessionInfo};
use crate::settings::{stored_font_size, SettingsStore, FONT_SIZE_KEY};
use crate::transport::{RemoteStatus, Transport, TransportEvent};

/// Tunables for a [`Multiplexer`].
#[derive(Clone, Debug)]
pub struct MuxConfig {
    /// Commands kept per session before the oldest is evicted.
    pub history_limit: usize,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Something observers of the multiplexer may want to react to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    SessionCreated {
        id: SessionId,
        remote_key: Option<String>,
    },
    SessionActivated(SessionId),
    SessionClosed(SessionId),
    /// The remote selection should follow the newly active session.
    RemoteFocused(String),
}

/// Owns every session and decides which one is active.
///
/// All methods run to completion on the caller's thread. Transport output
/// arrives through [`Multiplexer::handle_transport_event`], keystrokes through
/// [`Multiplexer::send_input`], and host resizes through
/// [`Multiplexer::resize_session`] / [`Multiplexer::refit_active`].
pub struct Multiplexer<T: Transport, F: EmulatorFactory> {
    registry: Registry<F::Emulator>,
    active: Option<SessionId>,
    transport: T,
    factory: F,
    settings: Box<dyn SettingsStore>,
    focused_remote: Option<String>,
    notifications: Vec<Notification>,
    config: MuxConfig,
}

impl<T: Transport, F: EmulatorFactory> Multiplexer<T, F> {
    pub fn new(transport: T, factory: F, settings: Box<dyn SettingsStore>, config: MuxConfig) -> Self {
        Self {
            registry: Registry::new(),
            active: None,
            transport,
            factory,
            settings,
            focused_remote: None,
            notifications: Vec::new(),
            config,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn settings(&self) -> &dyn SettingsStore {
        self.settings.as_ref()
    }

    /// Create a session, optionally bound to a remote key, and make it active.
    pub fn create_session(&mut self, remote_key: Option<&str>) -> Result<SessionId> {
        let id = self.registry.allocate_id();
        let font_size = stored_font_size(self.settings.as_ref());
        let emulator = self.factory.create(id, font_size)?;
        let size = emulator.size();

        let remote_key = remote_key.map(str::to_string);
        let mut session = Session::new(
            id,
            remote_key.clone(),
            History::new(self.config.history_limit),
            emulator,
            size,
        );
        if let Some(key) = &remote_key {
            session.resources.push(self.transport.subscribe(key));
        }

        // A connected remote draws its own prompt.
        if router::mode(remote_key.as_deref(), &self.transport) == Mode::Local {
            session.emulator.write(PROMPT.as_bytes());
        }

        self.registry.insert(session);
        log::info!(
            "Created session {} (remote: {})",
            id,
            remote_key.as_deref().unwrap_or("none")
        );
        self.notifications
            .push(Notification::SessionCreated { id, remote_key });

        self.activate_session(id)?;
        Ok(id)
    }

    /// Make `id` the active session. Activating the active session is a no-op.
    pub fn activate_session(&mut self, id: SessionId) -> Result<()> {
        if !self.registry.contains(id) {
            return Err(MuxError::NotFound(id));
        }
        if self.active == Some(id) {
            return Ok(());
        }

        if let Some(previous) = self.active.and_then(|prev| self.registry.get_mut(prev)) {
            previous.active = false;
            previous.emulator.set_active(false);
        }

        let session = self.registry.get_mut(id).ok_or(MuxError::NotFound(id))?;
        session.active = true;
        session.emulator.set_active(true);
        let fitted = session.emulator.fit();
        session.emulator.focus();
        let remote_key = session.remote_key.clone();
        self.active = Some(id);

        if let Some((cols, rows)) = fitted {
            self.apply_size(id, cols, rows);
        }

        if let Some(key) = remote_key {
            if self.focused_remote.as_deref() != Some(key.as_str()) {
                self.focused_remote = Some(key.clone());
                self.notifications.push(Notification::RemoteFocused(key));
            }
        }

        log::debug!("Activated session {}", id);
        self.notifications.push(Notification::SessionActivated(id));
        Ok(())
    }

    /// Close a session and release everything it subscribed to. Unknown ids
    /// and sessions already closing are ignored.
    pub fn close_session(&mut self, id: SessionId) {
        let Some(session) = self.registry.get_mut(id) else {
            return;
        };
        if session.lifecycle != Lifecycle::Open {
            return;
        }
        session.lifecycle = Lifecycle::Closing;
        let released = session.resources.release_all();
        session.emulator.dispose();

        if let Some(mut session) = self.registry.remove(id) {
            session.lifecycle = Lifecycle::Closed;
        }
        log::info!("Closed session {} ({} subscriptions released)", id, released);
        self.notifications.push(Notification::SessionClosed(id));

        if self.active == Some(id) {
            self.active = None;
            if let Some(next) = self.registry.id_at(0) {
                if let Err(e) = self.activate_session(next) {
                    log::warn!("Failed to activate session {} after close: {}", next, e);
                }
            }
        }
    }

    /// Route a chunk of input for `id`: straight to the remote when
    /// connected, otherwise through the local line editor.
    pub fn send_input(&mut self, id: SessionId, bytes: &[u8]) -> Result<()> {
        let session = self.registry.get(id).ok_or(MuxError::NotFound(id))?;
        match router::route(session.remote_key.as_deref(), &self.transport) {
            Route::Remote(key) => {
                let key = key.to_string();
                if let Err(e) = self.transport.send(&key, bytes) {
                    log::warn!("Send to remote {} failed: {}", key, e);
                    self.write_error(id, &e.to_string());
                }
            }
            Route::Local => self.edit_local(id, bytes),
        }
        Ok(())
    }

    /// Resize a session's emulator and, when remote, the remote terminal.
    pub fn resize_session(&mut self, id: SessionId, cols: u16, rows: u16) -> Result<()> {
        let session = self.registry.get_mut(id).ok_or(MuxError::NotFound(id))?;
        session.emulator.resize(cols, rows);
        let size = session.emulator.size();
        self.apply_size(id, size.0, size.1);
        Ok(())
    }

    /// Fit the active session to its container. Returns the new size if it
    /// changed.
    pub fn refit_active(&mut self) -> Option<(u16, u16)> {
        let id = self.active?;
        let (cols, rows) = self.registry.get_mut(id)?.emulator.fit()?;
        self.apply_size(id, cols, rows);
        Some((cols, rows))
    }

    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Inbound { key, bytes } => self.inbound(&key, &bytes),
            TransportEvent::Status { key, status } => self.remote_status(&key, status),
        }
    }

    /// Deliver remote output to the oldest session bound to `key`.
    pub fn inbound(&mut self, key: &str, bytes: &[u8]) {
        let Some(id) = self.registry.first_for_remote_key(key) else {
            log::debug!("Dropping {} bytes for remote {} with no session", bytes.len(), key);
            return;
        };
        let Some(session) = self.registry.get_mut(id) else {
            return;
        };
        session.emulator.write(bytes);
        let replies = session.emulator.take_replies();

        if replies.is_empty() || !self.transport.is_connected(key) {
            return;
        }
        for reply in replies {
            if let Err(e) = self.transport.send(key, &reply) {
                log::warn!("Failed to forward reply to remote {}: {}", key, e);
                break;
            }
        }
    }

    /// Record a status change on every session bound to `key`.
    pub fn remote_status(&mut self, key: &str, status: RemoteStatus) {
        let notice = match status {
            RemoteStatus::Started => Some("\r\n\x1b[32mRemote session started\x1b[0m"),
            RemoteStatus::Stopped => Some("\r\n\x1b[33mRemote session stopped\x1b[0m"),
            RemoteStatus::Created | RemoteStatus::Destroyed => None,
        };
        for session in self
            .registry
            .iter_mut()
            .filter(|s| s.remote_key.as_deref() == Some(key))
        {
            session.remote_status = Some(status);
            if let Some(line) = notice {
                session.emulator.write_line(line);
            }
        }
        log::info!("Remote {} is {}", key, status.label());
    }

    /// Change the font size of `id`, persist it for new sessions, and refit
    /// the active session.
    pub fn set_font_size(&mut self, id: SessionId, size: u16) -> Result<()> {
        if !FONT_SIZE_RANGE.contains(&size) {
            return Err(MuxError::InvalidArgument(format!(
                "font size {} outside {}..={}",
                size,
                FONT_SIZE_RANGE.start(),
                FONT_SIZE_RANGE.end()
            )));
        }
        let session = self.registry.get_mut(id).ok_or(MuxError::NotFound(id))?;
        session.emulator.set_font_size(size);

        if let Err(e) = self.settings.set(FONT_SIZE_KEY, &size.to_string()) {
            log::warn!("Failed to persist font size: {}", e);
        }
        self.refit_active();
        Ok(())
    }

    /// Activate the session after the active one, wrapping around.
    pub fn cycle_next(&mut self) {
        self.cycle(1);
    }

    /// Activate the session before the active one, wrapping around.
    pub fn cycle_previous(&mut self) {
        self.cycle(-1);
    }

    fn cycle(&mut self, step: isize) {
        let len = self.registry.len();
        if len == 0 {
            return;
        }
        let target = match self.active.and_then(|id| self.registry.position(id)) {
            Some(pos) => (pos as isize + step).rem_euclid(len as isize) as usize,
            None => 0,
        };
        if let Some(id) = self.registry.id_at(target) {
            if let Err(e) = self.activate_session(id) {
                log::warn!("Failed to activate session {}: {}", id, e);
            }
        }
    }

    /// Activate the session at tab position `index`. Returns false when out
    /// of range.
    pub fn activate_by_index(&mut self, index: usize) -> bool {
        match self.registry.id_at(index) {
            Some(id) => self.activate_session(id).is_ok(),
            None => false,
        }
    }

    /// Open another session on the same remote as the active one (or a
    /// local session when nothing is active or the active one is local).
    pub fn split_active(&mut self) -> Result<SessionId> {
        let key = self
            .active
            .and_then(|id| self.registry.get(id))
            .and_then(|s| s.remote_key.clone());
        self.create_session(key.as_deref())
    }

    pub fn clear_active(&mut self) {
        if let Some(session) = self.active.and_then(|id| self.registry.get_mut(id)) {
            session.emulator.clear();
        }
    }

    pub fn selected_text(&self, id: SessionId) -> Option<String> {
        self.registry.get(id)?.emulator.selected_text()
    }

    pub fn sessions_for_remote(&self, key: &str) -> Vec<SessionId> {
        self.registry.by_remote_key(key).map(|s| s.id).collect()
    }

    /// Close every session bound to `key`. Returns how many were closed.
    pub fn close_sessions_for_remote(&mut self, key: &str) -> usize {
        let ids = self.sessions_for_remote(key);
        for &id in &ids {
            self.close_session(id);
        }
        ids.len()
    }

    /// Close every session.
    pub fn shutdown(&mut self) {
        for id in self.registry.ids() {
            self.close_session(id);
        }
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn list_sessions(&self) -> Vec<SessionInfo> {
        self.registry
            .iter()
            .map(|s| SessionInfo {
                id: s.id,
                remote_key: s.remote_key.clone(),
                mode: router::mode(s.remote_key.as_deref(), &self.transport),
                active: s.active,
                title: session_title(s),
                history_len: s.history.len(),
                remote_status: s.remote_status,
            })
            .collect()
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.active
    }

    pub fn session(&self, id: SessionId) -> Option<&Session<F::Emulator>> {
        self.registry.get(id)
    }

    pub fn emulator(&self, id: SessionId) -> Option<&F::Emulator> {
        self.registry.get(id).map(|s| &s.emulator)
    }

    pub fn emulator_mut(&mut self, id: SessionId) -> Option<&mut F::Emulator> {
        self.registry.get_mut(id).map(|s| &mut s.emulator)
    }

    /// Current input mode of `id`.
    pub fn mode(&self, id: SessionId) -> Option<Mode> {
        let session = self.registry.get(id)?;
        Some(router::mode(session.remote_key.as_deref(), &self.transport))
    }

    /// Font size of the active session, or the persisted default.
    pub fn font_size(&self) -> u16 {
        self.active
            .and_then(|id| self.registry.get(id))
            .map(|s| s.emulator.font_size())
            .unwrap_or_else(|| stored_font_size(self.settings.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    fn apply_size(&mut self, id: SessionId, cols: u16, rows: u16) {
        let Some(session) = self.registry.get_mut(id) else {
            return;
        };
        session.size = (cols, rows);
        if let Route::Remote(key) = router::route(session.remote_key.as_deref(), &self.transport) {
            let key = key.to_string();
            if let Err(e) = self.transport.resize(&key, cols, rows) {
                log::warn!("Failed to resize remote {}: {}", key, e);
            }
        }
    }

    fn edit_local(&mut self, id: SessionId, bytes: &[u8]) {
        for key in editor::keys(bytes) {
            // A submitted `/exit` removes the session mid-chunk.
            let Some(session) = self.registry.get_mut(id) else {
                break;
            };
            let Session {
                input,
                history,
                emulator,
                ..
            } = session;
            if let Edit::Submitted(line) = editor::apply(key, input, history, emulator) {
                self.run_line(id, &line);
            }
        }
    }

    fn run_line(&mut self, id: SessionId, line: &str) {
        let Some(command) = LocalCommand::parse(line) else {
            let remote = self.registry.get(id).and_then(|s| s.remote_key.clone());
            let err = MuxError::NotConnected(remote);
            log::debug!("Session {} cannot run {:?}: {:?}", id, line, err);
            self.with_emulator(id, |emu| emu.write_line(&error_line(&err)));
            return;
        };

        match command {
            LocalCommand::Help => self.with_emulator(id, |emu| {
                for line in command::HELP_LINES {
                    emu.write_line(line);
                }
                emu.write(PROMPT.as_bytes());
            }),
            LocalCommand::Clear => self.with_emulator(id, |emu| {
                emu.clear();
                emu.write(PROMPT.as_bytes());
            }),
            LocalCommand::Exit => self.close_session(id),
            LocalCommand::Status => {
                let lines = self.status_lines(id);
                self.with_emulator(id, |emu| {
                    for line in &lines {
                        emu.write_line(line);
                    }
                    emu.write(PROMPT.as_bytes());
                });
            }
            LocalCommand::Font(None) => self.with_emulator(id, |emu| {
                emu.write_line("\r\nUsage: /font <size>");
                emu.write(PROMPT.as_bytes());
            }),
            LocalCommand::Font(Some(arg)) => {
                let message = match command::parse_font_size(&arg) {
                    FontArg::Valid(size) => match self.set_font_size(id, size) {
                        Ok(()) => format!("\r\nFont size changed to: {}px", size),
                        Err(e) => format!("\r\n{}", error_line(&e)),
                    },
                    FontArg::OutOfRange => format!(
                        "\r\nFont size must be between {} and {}",
                        FONT_SIZE_RANGE.start(),
                        FONT_SIZE_RANGE.end()
                    ),
                };
                self.with_emulator(id, |emu| {
                    emu.write_line(&message);
                    emu.write(PROMPT.as_bytes());
                });
            }
        }
    }

    fn status_lines(&self, id: SessionId) -> Vec<String> {
        let Some(session) = self.registry.get(id) else {
            return Vec::new();
        };
        let key = session.remote_key.as_deref();
        let mode = match router::mode(key, &self.transport) {
            Mode::Remote => "Remote",
            Mode::Local => "Local",
        };
        let connection = match key {
            Some(key) if self.transport.is_connected(key) => "Connected",
            _ => "Disconnected",
        };
        vec![
            "\r\n\x1b[36mTerminal Status:\x1b[0m".to_string(),
            format!("  ID: {}", session.id),
            format!("  Type: {}", mode),
            format!("  Remote: {}", key.unwrap_or("None")),
            format!("  History: {} commands", session.history.len()),
            format!("  Connection: {}", connection),
            format!("  Font: {}px", session.emulator.font_size()),
        ]
    }

    fn write_error(&mut self, id: SessionId, message: &str) {
        let line = format!("\r\n{}", error_line(message));
        self.with_emulator(id, |emu| emu.write_line(&line));
    }

    fn with_emulator(&mut self, id: SessionId, f: impl FnOnce(&mut F::Emulator)) {
        if let Some(session) = self.registry.get_mut(id) {
            f(&mut session.emulator);
        }
    }
}

impl<T: Transport, F: EmulatorFactory> Drop for Multiplexer<T, F> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Red `Error: ...` line as written into a session.
fn error_line(message: impl Display) -> String {
    format!("\x1b[31mError: {}\x1b[0m", message)
}

fn session_title<E: Emulator>(session: &Session<E>) -> String {
    session
        .emulator
        .title()
        .filter(|t| !t.is_empty())
        .or_else(|| session.remote_key.clone())
        .unwrap_or_else(|| format!("Terminal {}", session.id))
}
