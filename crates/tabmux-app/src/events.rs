//! Dedicated OS thread that reads host terminal events.
//!
//! `crossterm::event::read` blocks, so it runs on its own thread and forwards
//! what it reads into the host loop's queue. The thread polls with a short
//! timeout so it notices the stop flag promptly.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent, KeyEventKind, MouseEvent};
use tokio::sync::mpsc;

/// Something the host terminal reported.
#[derive(Debug)]
pub enum HostEvent {
    Key(KeyEvent),
    Paste(String),
    Mouse(MouseEvent),
    Resize(u16, u16),
}

pub fn start_reader_thread(
    tx: mpsc::Sender<HostEvent>,
    stop: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("host-input".to_string())
        .spawn(move || read_loop(tx, stop))
}

fn read_loop(tx: mpsc::Sender<HostEvent>, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::Acquire) {
        match event::poll(Duration::from_millis(50)) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                log::error!("Polling host terminal failed: {}", e);
                return;
            }
        }
        let event = match event::read() {
            Ok(Event::Key(key)) if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) => {
                HostEvent::Key(key)
            }
            Ok(Event::Paste(text)) => HostEvent::Paste(text),
            Ok(Event::Mouse(mouse)) => HostEvent::Mouse(mouse),
            Ok(Event::Resize(cols, rows)) => HostEvent::Resize(cols, rows),
            Ok(_) => continue,
            Err(e) => {
                log::error!("Reading host terminal failed: {}", e);
                return;
            }
        };
        if tx.blocking_send(event).is_err() {
            return;
        }
    }
}
