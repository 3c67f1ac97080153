//! The host loop: one queue of terminal, transport and tick events, each
//! handled to completion against the multiplexer.

use std::io::{self, Stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use crossterm::event::{KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use tokio::sync::mpsc;

use tabmux_session::{
    Emulator, Multiplexer, MuxConfig, Notification, PtyTransport, SessionId, TransportEvent,
    Viewport, VtEmulatorFactory,
};

use crate::config::{Config, DEFAULT_REMOTE_KEY};
use crate::events::{self, HostEvent};
use crate::input::{Action, KeyRouter, PrefixKey, Shortcut};
use crate::render::{connection_label, status_line, Renderer};
use crate::store::DbSettings;

type Mux = Multiplexer<PtyTransport, VtEmulatorFactory>;

/// Area left for sessions once the status line takes the bottom row.
pub fn viewport_size(cols: u16, rows: u16) -> (u16, u16) {
    (cols.max(1), rows.saturating_sub(1).max(1))
}

/// OSC 52 request asking the host terminal to put `text` on the clipboard.
pub fn clipboard_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

/// Pasted text as a terminal sends it: every line ending becomes `\r`.
pub fn paste_bytes(text: &str) -> Vec<u8> {
    text.replace("\r\n", "\r").replace('\n', "\r").into_bytes()
}

/// Remote keys to open at startup: the command line first, then the
/// configured remotes, then the default shell.
pub fn startup_keys(cli_remotes: &[String], config: &Config) -> Vec<String> {
    if !cli_remotes.is_empty() {
        return cli_remotes.to_vec();
    }
    if !config.remote.is_empty() {
        return config.remote.iter().map(|r| r.key.clone()).collect();
    }
    vec![DEFAULT_REMOTE_KEY.to_string()]
}

pub struct App {
    mux: Mux,
    config: Config,
    keys: KeyRouter,
    renderer: Renderer<Stdout>,
    viewport: Viewport,
    selection_start: Option<(u16, u16)>,
    should_quit: bool,
}

impl App {
    pub fn new(
        config: Config,
        prefix: PrefixKey,
        settings: DbSettings,
        transport_tx: mpsc::UnboundedSender<TransportEvent>,
        host_size: (u16, u16),
    ) -> Self {
        let (cols, rows) = viewport_size(host_size.0, host_size.1);
        let viewport = Viewport::new(cols, rows);
        let mux = Multiplexer::new(
            PtyTransport::new(transport_tx),
            VtEmulatorFactory::new(viewport.clone()),
            Box::new(settings),
            MuxConfig {
                history_limit: config.history_limit,
            },
        );
        Self {
            mux,
            config,
            keys: KeyRouter::new(prefix),
            renderer: Renderer::new(io::stdout()),
            viewport,
            selection_start: None,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Start the process for `key` (if it is not running) and open a
    /// session on it.
    pub fn open_remote(&mut self, key: &str) -> tabmux_session::Result<SessionId> {
        let spec = self.config.remote_spec(key);
        let (cols, rows) = self.viewport.get();
        let connected = self.mux.transport_mut().connect(key, &spec, cols, rows);

        let id = self.mux.create_session(Some(key))?;
        if let Err(e) = connected {
            log::error!("Failed to start remote {}: {}", key, e);
            if let Some(emu) = self.mux.emulator_mut(id) {
                emu.write_line(&format!("\r\n\x1b[31mError: {}\x1b[0m", e));
            }
        }
        Ok(id)
    }

    pub fn activate_first(&mut self) {
        self.mux.activate_by_index(0);
    }

    pub fn handle_host_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::Key(key) => self.handle_key(&key),
            HostEvent::Paste(text) => self.send_to_active(&paste_bytes(&text)),
            HostEvent::Mouse(mouse) => self.handle_mouse(mouse),
            HostEvent::Resize(cols, rows) => self.handle_resize(cols, rows),
        }
    }

    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        self.mux.handle_transport_event(event);
    }

    fn handle_key(&mut self, key: &KeyEvent) {
        match self.keys.feed(key) {
            Action::Input(bytes) => self.send_to_active(&bytes),
            Action::Shortcut(shortcut) => self.run_shortcut(shortcut),
            Action::None => {}
        }
    }

    fn send_to_active(&mut self, bytes: &[u8]) {
        let Some(id) = self.mux.active_session() else {
            return;
        };
        if let Err(e) = self.mux.send_input(id, bytes) {
            log::warn!("Input for session {} dropped: {}", id, e);
        }
    }

    fn run_shortcut(&mut self, shortcut: Shortcut) {
        log::debug!("Shortcut {:?}", shortcut);
        let result = match shortcut {
            Shortcut::NewSession => self.mux.create_session(None).map(drop),
            Shortcut::Split => self.split(),
            Shortcut::Close => {
                if let Some(id) = self.mux.active_session() {
                    self.mux.close_session(id);
                }
                Ok(())
            }
            Shortcut::Next => {
                self.mux.cycle_next();
                Ok(())
            }
            Shortcut::Previous => {
                self.mux.cycle_previous();
                Ok(())
            }
            Shortcut::GoTo(index) => {
                self.mux.activate_by_index(index);
                Ok(())
            }
            Shortcut::Clear => {
                self.mux.clear_active();
                Ok(())
            }
            Shortcut::Quit => {
                self.should_quit = true;
                Ok(())
            }
        };
        if let Err(e) = result {
            log::warn!("Shortcut {:?} failed: {}", shortcut, e);
        }
    }

    /// A split of a remote session restarts its process if it has exited.
    fn split(&mut self) -> tabmux_session::Result<()> {
        let key = self
            .mux
            .active_session()
            .and_then(|id| self.mux.session(id))
            .and_then(|s| s.remote_key().map(str::to_string));
        match key {
            Some(key) => self.open_remote(&key).map(drop),
            None => self.mux.split_active().map(drop),
        }
    }

    fn handle_resize(&mut self, cols: u16, rows: u16) {
        let (cols, rows) = viewport_size(cols, rows);
        self.viewport.set(cols, rows);
        self.mux.refit_active();
        self.renderer.invalidate();
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let (_, rows) = self.viewport.get();
        if mouse.row >= rows {
            return;
        }
        let Some(id) = self.mux.active_session() else {
            return;
        };
        let point = (mouse.row, mouse.column);

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.selection_start = Some(point);
                if let Some(emu) = self.mux.emulator_mut(id) {
                    emu.terminal_mut().clear_selection();
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let (Some(start), Some(emu)) = (self.selection_start, self.mux.emulator_mut(id)) {
                    emu.terminal_mut().select(start, point);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.selection_start = None;
                if let Some(text) = self.mux.selected_text(id).filter(|t| !t.is_empty()) {
                    log::debug!("Copying {} characters to the clipboard", text.chars().count());
                    if let Err(e) = self.renderer.passthrough(clipboard_sequence(&text).as_bytes()) {
                        log::warn!("Clipboard request failed: {}", e);
                    }
                }
            }
            _ => {}
        }
    }

    /// React to what the multiplexer reported since the last event.
    pub fn process_notifications(&mut self) {
        for notification in self.mux.drain_notifications() {
            match notification {
                Notification::SessionCreated { id, remote_key } => {
                    log::debug!("Session {} created (remote: {:?})", id, remote_key);
                }
                Notification::SessionActivated(_) => self.renderer.invalidate(),
                Notification::SessionClosed(id) => {
                    log::debug!("Session {} closed", id);
                    self.reap_idle_remotes();
                    if self.mux.is_empty() {
                        self.should_quit = true;
                    }
                }
                Notification::RemoteFocused(key) => log::info!("Remote {} focused", key),
            }
        }
    }

    /// Stop remote processes no session is looking at anymore, and release
    /// the PTYs of ones that already exited.
    fn reap_idle_remotes(&mut self) {
        for key in self.mux.transport().keys() {
            if self.mux.sessions_for_remote(&key).is_empty() {
                self.mux.transport_mut().disconnect(&key);
            }
        }
    }

    pub fn render(&mut self) -> io::Result<()> {
        let sessions = self.mux.list_sessions();
        let pending = if self.keys.is_pending() { "[prefix] " } else { "" };
        let right = match sessions.iter().find(|s| s.active) {
            Some(active) => format!(
                "{}{} | {}px | {}",
                pending,
                connection_label(active),
                self.mux.font_size(),
                chrono::Local::now().format("%H:%M")
            ),
            None => format!("{}{}", pending, chrono::Local::now().format("%H:%M")),
        };
        let (cols, rows) = self.viewport.get();
        let status = status_line(&sessions, &right, cols as usize);

        let active = self.mux.active_session();
        let dirty = active
            .and_then(|id| self.mux.emulator_mut(id))
            .map(|emu| emu.take_dirty())
            .unwrap_or(false);
        let frame = active.and_then(|id| self.mux.emulator(id).map(|emu| (id, emu.terminal())));
        self.renderer.render(frame, dirty, &status, rows)
    }

    pub fn shutdown(&mut self) {
        self.mux.shutdown();
        for key in self.mux.transport().keys() {
            self.mux.transport_mut().disconnect(&key);
        }
    }
}

/// Run until the user quits or the last session closes.
pub async fn run(
    mut app: App,
    mut transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
) -> anyhow::Result<()> {
    let (host_tx, mut host_rx) = mpsc::channel::<HostEvent>(64);
    let stop = Arc::new(AtomicBool::new(false));
    let reader = events::start_reader_thread(host_tx, Arc::clone(&stop))?;

    let mut tick = tokio::time::interval(Duration::from_millis(16));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result: anyhow::Result<()> = loop {
        tokio::select! {
            _ = tick.tick() => {
                if let Err(e) = app.render() {
                    break Err(e.into());
                }
            }
            Some(event) = host_rx.recv() => app.handle_host_event(event),
            Some(event) = transport_rx.recv() => app.handle_transport_event(event),
        }
        app.process_notifications();
        if app.should_quit() {
            break Ok(());
        }
    };

    stop.store(true, Ordering::Release);
    let _ = reader.join();
    app.shutdown();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteConfig;

    #[test]
    fn test_viewport_reserves_status_row() {
        assert_eq!(viewport_size(80, 24), (80, 23));
        assert_eq!(viewport_size(0, 1), (1, 1));
    }

    #[test]
    fn test_clipboard_sequence() {
        assert_eq!(clipboard_sequence("hi"), "\x1b]52;c;aGk=\x07");
    }

    #[test]
    fn test_paste_line_endings_become_carriage_returns() {
        assert_eq!(paste_bytes("ls\npwd\r\nexit"), b"ls\rpwd\rexit".to_vec());
        assert_eq!(paste_bytes("one\r"), b"one\r".to_vec());
        assert_eq!(paste_bytes("日本"), "日本".as_bytes().to_vec());
    }

    #[test]
    fn test_startup_keys_precedence() {
        let mut config = Config::default();
        assert_eq!(startup_keys(&[], &config), vec!["shell".to_string()]);

        config.remote.push(RemoteConfig {
            key: "api".into(),
            command: None,
            args: Vec::new(),
            cwd: None,
        });
        assert_eq!(startup_keys(&[], &config), vec!["api".to_string()]);
        assert_eq!(
            startup_keys(&["htop".to_string()], &config),
            vec!["htop".to_string()]
        );
    }
}
