//! The transport capability and a PTY-backed implementation.
//!
//! A transport moves bytes between a session and the process identified by
//! its remote key. [`PtyTransport`] runs each remote key as a local process
//! under a pseudo-terminal; its output is read on a dedicated OS thread per
//! key and pushed into the host's event queue as [`TransportEvent`]s, so
//! ordering per key is the order the bytes were read.

use std::collections::HashMap;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::dispose::Subscription;
use crate::error::TransportError;
use crate::pty::{PtyHandle, RemoteSpec};

/// Lifecycle of the process behind a remote key, as reported by the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteStatus {
    /// A PTY was allocated for the remote; its output is not being read yet.
    Created,
    /// The remote process is running.
    Started,
    /// The remote process exited on its own.
    Stopped,
    /// The remote terminal was torn down.
    Destroyed,
}

impl RemoteStatus {
    pub fn label(self) -> &'static str {
        match self {
            RemoteStatus::Created => "created",
            RemoteStatus::Started => "running",
            RemoteStatus::Stopped => "stopped",
            RemoteStatus::Destroyed => "destroyed",
        }
    }
}

/// Something the transport observed, delivered through the host's queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    Inbound { key: String, bytes: Vec<u8> },
    Status { key: String, status: RemoteStatus },
}

/// Byte channel to remote processes, keyed by remote key.
pub trait Transport {
    fn is_connected(&self, key: &str) -> bool;

    fn send(&mut self, key: &str, bytes: &[u8]) -> Result<(), TransportError>;

    fn resize(&mut self, key: &str, cols: u16, rows: u16) -> Result<(), TransportError>;

    /// Register interest in `key`. Output for a key whose every subscription
    /// has been released may be discarded at the source.
    fn subscribe(&mut self, key: &str) -> Subscription;
}

#[derive(Debug, Default)]
struct Listeners {
    count: usize,
    ever_subscribed: bool,
}

type ListenerMap = Arc<Mutex<HashMap<String, Listeners>>>;

struct PtyConnection {
    handle: PtyHandle,
    exited: Arc<AtomicBool>,
}

/// Runs each remote key as a local PTY process.
pub struct PtyTransport {
    connections: HashMap<String, PtyConnection>,
    listeners: ListenerMap,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl PtyTransport {
    pub fn new(events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self {
            connections: HashMap::new(),
            listeners: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    /// Start the process for `key`. Connecting a key that is already
    /// running is a no-op; a key whose process exited is restarted.
    pub fn connect(
        &mut self,
        key: &str,
        spec: &RemoteSpec,
        cols: u16,
        rows: u16,
    ) -> Result<(), TransportError> {
        if self.is_connected(key) {
            return Ok(());
        }

        let mut handle = PtyHandle::spawn(spec, cols, rows).map_err(|e| match e {
            TransportError::Spawn { reason, .. } => TransportError::Spawn {
                key: key.to_string(),
                reason,
            },
            other => other,
        })?;
        let reader = handle.take_reader().ok_or_else(|| TransportError::Spawn {
            key: key.to_string(),
            reason: "PTY reader already taken".to_string(),
        })?;

        // Queue Created and Started before the reader can queue any output.
        for status in [RemoteStatus::Created, RemoteStatus::Started] {
            let _ = self.events.send(TransportEvent::Status {
                key: key.to_string(),
                status,
            });
        }

        let exited = Arc::new(AtomicBool::new(false));
        if let Err(e) = start_reader_thread(
            key.to_string(),
            reader,
            Arc::clone(&exited),
            Arc::clone(&self.listeners),
            self.events.clone(),
        ) {
            let _ = self.events.send(TransportEvent::Status {
                key: key.to_string(),
                status: RemoteStatus::Destroyed,
            });
            return Err(e);
        }

        self.connections
            .insert(key.to_string(), PtyConnection { handle, exited });
        log::info!("remote {key} started");
        Ok(())
    }

    /// Kill the process for `key`, running or already exited, and forget it.
    pub fn disconnect(&mut self, key: &str) -> bool {
        let Some(mut conn) = self.connections.remove(key) else {
            return false;
        };
        match conn.handle.try_wait() {
            Some(code) => log::info!("remote {key} destroyed (exit code {code})"),
            None => log::info!("remote {key} destroyed"),
        }
        drop(conn);
        let _ = self.events.send(TransportEvent::Status {
            key: key.to_string(),
            status: RemoteStatus::Destroyed,
        });
        true
    }

    /// Every key holding a PTY, including those whose process has exited
    /// but was not disconnected yet. Sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.connections.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn listener_count(&self, key: &str) -> usize {
        self.listeners
            .lock()
            .ok()
            .and_then(|map| map.get(key).map(|l| l.count))
            .unwrap_or(0)
    }
}

impl Transport for PtyTransport {
    fn is_connected(&self, key: &str) -> bool {
        self.connections
            .get(key)
            .is_some_and(|c| !c.exited.load(Ordering::Acquire))
    }

    fn send(&mut self, key: &str, bytes: &[u8]) -> Result<(), TransportError> {
        match self.connections.get_mut(key) {
            Some(conn) if !conn.exited.load(Ordering::Acquire) => conn.handle.write(bytes),
            _ => Err(TransportError::NotConnected(key.to_string())),
        }
    }

    fn resize(&mut self, key: &str, cols: u16, rows: u16) -> Result<(), TransportError> {
        match self.connections.get(key) {
            Some(conn) => conn.handle.resize(cols, rows),
            None => Err(TransportError::NotConnected(key.to_string())),
        }
    }

    fn subscribe(&mut self, key: &str) -> Subscription {
        if let Ok(mut map) = self.listeners.lock() {
            let entry = map.entry(key.to_string()).or_default();
            entry.count += 1;
            entry.ever_subscribed = true;
        }

        let listeners = Arc::clone(&self.listeners);
        let key = key.to_string();
        Subscription::new(move || {
            if let Ok(mut map) = listeners.lock() {
                if let Some(entry) = map.get_mut(&key) {
                    entry.count = entry.count.saturating_sub(1);
                }
            }
        })
    }
}

/// Whether output for `key` still has someone to go to. Output produced
/// before the first subscription is kept so the initial prompt is not lost.
fn wanted(listeners: &ListenerMap, key: &str) -> bool {
    match listeners.lock() {
        Ok(map) => map
            .get(key)
            .map_or(true, |l| l.count > 0 || !l.ever_subscribed),
        Err(_) => true,
    }
}

fn start_reader_thread(
    key: String,
    reader: Box<dyn Read + Send>,
    exited: Arc<AtomicBool>,
    listeners: ListenerMap,
    events: mpsc::UnboundedSender<TransportEvent>,
) -> Result<(), TransportError> {
    std::thread::Builder::new()
        .name(format!("pty-io-{key}"))
        .spawn(move || read_loop(key, reader, exited, listeners, events))?;
    Ok(())
}

fn read_loop(
    key: String,
    mut reader: Box<dyn Read + Send>,
    exited: Arc<AtomicBool>,
    listeners: ListenerMap,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let mut buf = [0u8; 16384];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };

        if !wanted(&listeners, &key) {
            log::debug!("dropping {n} bytes for unsubscribed remote {key}");
            continue;
        }

        let event = TransportEvent::Inbound {
            key: key.clone(),
            bytes: buf[..n].to_vec(),
        };
        if events.send(event).is_err() {
            // Host queue is gone; nobody left to deliver to.
            return;
        }
    }

    exited.store(true, Ordering::Release);
    log::info!("remote {key} stopped");
    let _ = events.send(TransportEvent::Status {
        key,
        status: RemoteStatus::Stopped,
    });
}
