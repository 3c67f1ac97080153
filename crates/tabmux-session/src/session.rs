use crate::dispose::Disposables;
use crate::history::History;
use crate::transport::RemoteStatus;

/// Unique identifier for a session. Allocated from 1 upwards, never reused.
pub type SessionId = u64;

/// Where a session's input currently goes. Always derived, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Bytes go straight to the transport; the remote owns echo.
    Remote,
    /// The local line editor handles input.
    Local,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Open,
    Closing,
    Closed,
}

/// One multiplexed terminal: its emulator plus the line-editing state used
/// when there is no connected remote.
pub struct Session<E> {
    pub(crate) id: SessionId,
    pub(crate) remote_key: Option<String>,
    pub(crate) history: History,
    pub(crate) input: String,
    pub(crate) active: bool,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) size: (u16, u16),
    pub(crate) remote_status: Option<RemoteStatus>,
    pub(crate) emulator: E,
    pub(crate) resources: Disposables,
}

impl<E> Session<E> {
    pub(crate) fn new(
        id: SessionId,
        remote_key: Option<String>,
        history: History,
        emulator: E,
        size: (u16, u16),
    ) -> Self {
        Self {
            id,
            remote_key,
            history,
            input: String::new(),
            active: false,
            lifecycle: Lifecycle::Open,
            size,
            remote_status: None,
            emulator,
            resources: Disposables::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn remote_key(&self) -> Option<&str> {
        self.remote_key.as_deref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// The in-progress local line.
    pub fn input_buffer(&self) -> &str {
        &self.input
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn size(&self) -> (u16, u16) {
        self.size
    }

    pub fn remote_status(&self) -> Option<RemoteStatus> {
        self.remote_status
    }

    pub fn emulator(&self) -> &E {
        &self.emulator
    }
}

/// Snapshot of a session for tab bars and listings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub remote_key: Option<String>,
    pub mode: Mode,
    pub active: bool,
    pub title: String,
    pub history_len: usize,
    pub remote_status: Option<RemoteStatus>,
}
