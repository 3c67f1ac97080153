use std::io::{Read, Write};
use std::path::PathBuf;

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};

use crate::error::TransportError;

/// How to start the process behind a remote key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemoteSpec {
    /// Program to run; the user's shell when `None`.
    pub command: Option<String>,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl RemoteSpec {
    pub fn shell() -> Self {
        Self::default()
    }

    pub fn command(program: impl Into<String>) -> Self {
        Self {
            command: Some(program.into()),
            ..Self::default()
        }
    }
}

/// Owns a portable-pty child process with its master side.
///
/// Dropping the handle kills the child.
pub struct PtyHandle {
    master: Box<dyn MasterPty + Send>,
    reader: Option<Box<dyn Read + Send>>,
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
}

impl PtyHandle {
    pub fn spawn(spec: &RemoteSpec, cols: u16, rows: u16) -> Result<Self, TransportError> {
        let label = spec.command.clone().unwrap_or_else(default_shell);
        let spawn_err = |reason: String| TransportError::Spawn {
            key: label.clone(),
            reason,
        };

        let pair = native_pty_system()
            .openpty(pty_size(cols, rows))
            .map_err(|e| spawn_err(format!("failed to open PTY: {e}")))?;

        let mut cmd = CommandBuilder::new(&label);
        cmd.args(&spec.args);
        if let Some(cwd) = &spec.cwd {
            cmd.cwd(cwd);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| spawn_err(format!("failed to spawn command: {e}")))?;

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| spawn_err(format!("failed to clone reader: {e}")))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| spawn_err(format!("failed to take writer: {e}")))?;

        Ok(Self {
            master: pair.master,
            reader: Some(reader),
            writer,
            child,
        })
    }

    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), TransportError> {
        self.master
            .resize(pty_size(cols, rows))
            .map_err(|e| TransportError::Resize(e.to_string()))
    }

    /// Write input bytes to the child.
    pub fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.writer.write_all(data)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Hand the blocking reader to a dedicated thread. Only the first call
    /// returns it.
    pub fn take_reader(&mut self) -> Option<Box<dyn Read + Send>> {
        self.reader.take()
    }

    /// Exit code, if the child has exited.
    pub fn try_wait(&mut self) -> Option<u32> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(status.exit_code()),
            _ => None,
        }
    }
}

impl Drop for PtyHandle {
    fn drop(&mut self) {
        if self.try_wait().is_none() {
            let _ = self.child.kill();
        }
    }
}

fn pty_size(cols: u16, rows: u16) -> PtySize {
    PtySize {
        rows: rows.max(1),
        cols: cols.max(1),
        pixel_width: 0,
        pixel_height: 0,
    }
}

/// `$SHELL`, falling back to `/bin/sh`.
pub fn default_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
}
