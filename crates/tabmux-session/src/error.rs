use thiserror::Error;

use crate::session::SessionId;

/// Errors raised by the transport capability.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("remote {0} is not connected")]
    NotConnected(String),
    #[error("failed to start remote {key}: {reason}")]
    Spawn { key: String, reason: String },
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("transport resize failed: {0}")]
    Resize(String),
}

/// Errors surfaced by the multiplexer to its callers.
///
/// Only caller-visible failures live here. Expected conditions inside a
/// session (no connection, bad `/font` argument) are written to that
/// session's output instead of being returned.
#[derive(Debug, Error)]
pub enum MuxError {
    #[error("session {0} not found")]
    NotFound(SessionId),
    /// A submitted line needed a remote and none is connected. Holds the
    /// session's remote key, if it has one.
    #[error("Not connected to server")]
    NotConnected(Option<String>),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("emulator error: {0}")]
    Emulator(String),
    #[error("settings error: {0}")]
    Settings(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, MuxError>;
