mod config;
mod events;
mod host;
mod input;
mod logging;
mod render;
mod store;

use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::host::App;
use crate::store::DbSettings;

/// Terminal session multiplexer.
#[derive(Parser, Debug)]
#[command(name = "tabmux", version, about)]
struct Cli {
    /// Config file (default: ~/.tabmux/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Open a session on this remote key; repeatable
    #[arg(short, long = "remote", value_name = "KEY")]
    remotes: Vec<String>,

    /// Log filter, e.g. `debug` or `tabmux_session=trace`
    #[arg(long)]
    log_level: Option<String>,
}

/// Raw mode and the alternate screen for as long as it lives.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let guard = Self;
        execute!(
            io::stdout(),
            EnterAlternateScreen,
            EnableMouseCapture,
            EnableBracketedPaste
        )?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(
            io::stdout(),
            DisableBracketedPaste,
            DisableMouseCapture,
            LeaveAlternateScreen
        );
        let _ = disable_raw_mode();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let prefix = config.prefix()?;

    logging::init(&config.log_file(), &config.log_level, cli.log_level.as_deref())?;
    log::info!("tabmux {} starting", env!("CARGO_PKG_VERSION"));

    let db_path = config.database();
    if let Some(dir) = db_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let conn = tabmux_db::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;
    let settings = DbSettings::new(conn);
    settings.seed_font_size(config.default_font_size)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to start runtime")?;

    let keys = host::startup_keys(&cli.remotes, &config);
    let host_size = crossterm::terminal::size()?;
    let (transport_tx, transport_rx) = mpsc::unbounded_channel();

    let guard = TerminalGuard::enter()?;
    let mut app = App::new(config, prefix, settings, transport_tx, host_size);
    for key in &keys {
        app.open_remote(key)
            .with_context(|| format!("failed to open session for {}", key))?;
    }
    app.activate_first();

    let result = runtime.block_on(host::run(app, transport_rx));
    drop(guard);

    if let Err(e) = &result {
        log::error!("tabmux exited with error: {:#}", e);
    }
    log::info!("tabmux exiting");
    result
}
