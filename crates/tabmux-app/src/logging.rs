use std::fs::{self, OpenOptions};
use std::path::Path;

use anyhow::Context;
use env_logger::{Env, Target};

/// Send log output to `path`. The terminal itself belongs to the sessions
/// once raw mode is on, so nothing is logged to stderr.
///
/// `RUST_LOG` wins over `default_level` when set; `override_level` (from
/// the command line) wins over both.
pub fn init(path: &Path, default_level: &str, override_level: Option<&str>) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(default_level));
    if let Some(level) = override_level {
        builder.parse_filters(level);
    }
    builder
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()
        .context("logger already initialized")?;
    Ok(())
}
