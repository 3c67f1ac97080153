//! Recording fakes for the emulator and transport capabilities.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::dispose::Subscription;
use crate::emulator::{Emulator, EmulatorFactory};
use crate::error::{Result, TransportError};
use crate::session::SessionId;
use crate::transport::Transport;

#[derive(Debug, Default)]
pub struct EmulatorLog {
    pub output: Vec<u8>,
    pub clears: usize,
    pub focus_calls: usize,
    pub active: bool,
    pub size: (u16, u16),
    pub pending_fit: Option<(u16, u16)>,
    pub font_size: u16,
    pub disposed: bool,
    pub replies: Vec<Vec<u8>>,
    pub title: Option<String>,
    pub selection: Option<String>,
}

/// Emulator that records everything written to it. Clones share state, so
/// a test can keep a handle after the multiplexer takes ownership.
#[derive(Clone, Debug, Default)]
pub struct RecordingEmulator(Rc<RefCell<EmulatorLog>>);

impl RecordingEmulator {
    pub fn new() -> Self {
        let emu = Self::default();
        emu.0.borrow_mut().size = (80, 24);
        emu.0.borrow_mut().font_size = 14;
        emu
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow().output).into_owned()
    }

    pub fn clear_output(&self) {
        self.0.borrow_mut().output.clear();
    }

    pub fn clears(&self) -> usize {
        self.0.borrow().clears
    }

    pub fn focus_calls(&self) -> usize {
        self.0.borrow().focus_calls
    }

    pub fn is_active(&self) -> bool {
        self.0.borrow().active
    }

    pub fn is_disposed(&self) -> bool {
        self.0.borrow().disposed
    }

    /// Make the next `fit` report a new size.
    pub fn set_pending_fit(&self, cols: u16, rows: u16) {
        self.0.borrow_mut().pending_fit = Some((cols, rows));
    }

    pub fn push_reply(&self, reply: &[u8]) {
        self.0.borrow_mut().replies.push(reply.to_vec());
    }

    pub fn set_title(&self, title: &str) {
        self.0.borrow_mut().title = Some(title.to_string());
    }

    pub fn set_selection(&self, text: &str) {
        self.0.borrow_mut().selection = Some(text.to_string());
    }
}

impl Emulator for RecordingEmulator {
    fn write(&mut self, bytes: &[u8]) {
        self.0.borrow_mut().output.extend_from_slice(bytes);
    }

    fn clear(&mut self) {
        self.0.borrow_mut().clears += 1;
    }

    fn focus(&mut self) {
        self.0.borrow_mut().focus_calls += 1;
    }

    fn set_active(&mut self, active: bool) {
        self.0.borrow_mut().active = active;
    }

    fn fit(&mut self) -> Option<(u16, u16)> {
        let mut log = self.0.borrow_mut();
        let size = log.pending_fit.take()?;
        log.size = size;
        Some(size)
    }

    fn resize(&mut self, cols: u16, rows: u16) {
        self.0.borrow_mut().size = (cols, rows);
    }

    fn size(&self) -> (u16, u16) {
        self.0.borrow().size
    }

    fn set_font_size(&mut self, size: u16) {
        self.0.borrow_mut().font_size = size;
    }

    fn font_size(&self) -> u16 {
        self.0.borrow().font_size
    }

    fn selected_text(&self) -> Option<String> {
        self.0.borrow().selection.clone()
    }

    fn title(&self) -> Option<String> {
        self.0.borrow().title.clone()
    }

    fn take_replies(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.0.borrow_mut().replies)
    }

    fn dispose(&mut self) {
        self.0.borrow_mut().disposed = true;
    }
}

/// Hands out [`RecordingEmulator`]s and keeps a handle to each.
#[derive(Clone, Debug, Default)]
pub struct RecordingFactory {
    created: Rc<RefCell<HashMap<SessionId, RecordingEmulator>>>,
    fail: Rc<RefCell<bool>>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emulator(&self, id: SessionId) -> RecordingEmulator {
        self.created.borrow()[&id].clone()
    }

    pub fn fail_next(&self) {
        *self.fail.borrow_mut() = true;
    }
}

impl EmulatorFactory for RecordingFactory {
    type Emulator = RecordingEmulator;

    fn create(&mut self, id: SessionId, font_size: u16) -> Result<RecordingEmulator> {
        if std::mem::take(&mut *self.fail.borrow_mut()) {
            return Err(crate::MuxError::Emulator("widget unavailable".into()));
        }
        let emu = RecordingEmulator::new();
        emu.0.borrow_mut().font_size = font_size;
        self.created.borrow_mut().insert(id, emu.clone());
        Ok(emu)
    }
}

#[derive(Debug, Default)]
pub struct TransportLog {
    pub connected: HashSet<String>,
    pub sent: Vec<(String, Vec<u8>)>,
    pub resizes: Vec<(String, u16, u16)>,
    pub subscribers: HashMap<String, usize>,
    pub fail_sends: bool,
}

/// Transport whose connection state is set by the test.
#[derive(Clone, Debug, Default)]
pub struct FakeTransport(Rc<RefCell<TransportLog>>);

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_connected(&self, key: &str, connected: bool) {
        let mut log = self.0.borrow_mut();
        if connected {
            log.connected.insert(key.to_string());
        } else {
            log.connected.remove(key);
        }
    }

    pub fn sent(&self) -> Vec<(String, Vec<u8>)> {
        self.0.borrow().sent.clone()
    }

    pub fn resizes(&self) -> Vec<(String, u16, u16)> {
        self.0.borrow().resizes.clone()
    }

    pub fn subscribers(&self, key: &str) -> usize {
        self.0.borrow().subscribers.get(key).copied().unwrap_or(0)
    }

    pub fn total_subscribers(&self) -> usize {
        self.0.borrow().subscribers.values().sum()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.0.borrow_mut().fail_sends = fail;
    }
}

impl Transport for FakeTransport {
    fn is_connected(&self, key: &str) -> bool {
        self.0.borrow().connected.contains(key)
    }

    fn send(&mut self, key: &str, bytes: &[u8]) -> std::result::Result<(), TransportError> {
        let mut log = self.0.borrow_mut();
        if log.fail_sends {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "pipe closed",
            )));
        }
        log.sent.push((key.to_string(), bytes.to_vec()));
        Ok(())
    }

    fn resize(&mut self, key: &str, cols: u16, rows: u16) -> std::result::Result<(), TransportError> {
        self.0.borrow_mut().resizes.push((key.to_string(), cols, rows));
        Ok(())
    }

    fn subscribe(&mut self, key: &str) -> Subscription {
        *self.0.borrow_mut().subscribers.entry(key.to_string()).or_default() += 1;
        let log = Rc::clone(&self.0);
        let key = key.to_string();
        Subscription::new(move || {
            if let Some(count) = log.borrow_mut().subscribers.get_mut(&key) {
                *count -= 1;
            }
        })
    }
}
