//! Per-event decision of where input for a session goes.

use crate::session::Mode;
use crate::transport::Transport;

/// Destination for one input event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route<'a> {
    /// Forward the bytes unmodified to this remote key.
    Remote(&'a str),
    /// Hand the bytes to the local line editor.
    Local,
}

impl Route<'_> {
    pub fn mode(&self) -> Mode {
        match self {
            Route::Remote(_) => Mode::Remote,
            Route::Local => Mode::Local,
        }
    }
}

/// Remote iff the session is bound to a key and the transport reports that
/// key connected right now.
pub fn route<'a, T: Transport + ?Sized>(remote_key: Option<&'a str>, transport: &T) -> Route<'a> {
    match remote_key {
        Some(key) if transport.is_connected(key) => Route::Remote(key),
        _ => Route::Local,
    }
}

pub fn mode<T: Transport + ?Sized>(remote_key: Option<&str>, transport: &T) -> Mode {
    route(remote_key, transport).mode()
}
