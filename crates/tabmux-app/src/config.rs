use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use tabmux_session::{RemoteSpec, DEFAULT_FONT_SIZE, DEFAULT_HISTORY_LIMIT, FONT_SIZE_RANGE};

use crate::input::PrefixKey;

/// Key used for the default remote when none is configured.
pub const DEFAULT_REMOTE_KEY: &str = "shell";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid prefix key: {0}")]
    InvalidPrefix(String),
    #[error("default_font_size must be between {min} and {max}")]
    FontSize { min: u16, max: u16 },
}

/// A named remote process.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub key: String,
    /// Program to run. Defaults to the configured shell.
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

/// `~/.tabmux/config.toml`. Every field is optional.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub history_limit: usize,
    pub default_font_size: u16,
    pub prefix_key: String,
    pub shell: Option<String>,
    pub remote: Vec<RemoteConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
            database: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            default_font_size: DEFAULT_FONT_SIZE,
            prefix_key: "ctrl-b".to_string(),
            shell: None,
            remote: Vec::new(),
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location if it exists, or fall
    /// back to defaults. An explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = home_dir().join("config.toml");
                if default_path.exists() {
                    Self::from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        log::info!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Io(e),
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !FONT_SIZE_RANGE.contains(&self.default_font_size) {
            return Err(ConfigError::FontSize {
                min: *FONT_SIZE_RANGE.start(),
                max: *FONT_SIZE_RANGE.end(),
            });
        }
        self.prefix()?;
        Ok(())
    }

    pub fn prefix(&self) -> Result<PrefixKey, ConfigError> {
        PrefixKey::parse(&self.prefix_key)
            .ok_or_else(|| ConfigError::InvalidPrefix(self.prefix_key.clone()))
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| home_dir().join("tabmux.log"))
    }

    pub fn database(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| home_dir().join("tabmux.db"))
    }

    /// How to start the process for `key`. Keys without a `[[remote]]`
    /// entry run as a program of the same name; the default key runs the
    /// shell.
    pub fn remote_spec(&self, key: &str) -> RemoteSpec {
        let shell = || match &self.shell {
            Some(shell) => RemoteSpec::command(shell.clone()),
            None => RemoteSpec::shell(),
        };
        match self.remote.iter().find(|r| r.key == key) {
            Some(remote) => {
                let mut spec = match &remote.command {
                    Some(command) => RemoteSpec::command(command.clone()),
                    None => shell(),
                };
                spec.args = remote.args.clone();
                spec.cwd = remote.cwd.clone();
                spec
            }
            None if key == DEFAULT_REMOTE_KEY => shell(),
            None => RemoteSpec::command(key),
        }
    }
}

/// `~/.tabmux`, or `./.tabmux` when there is no home directory.
pub fn home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tabmux")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.history_limit, 1000);
        assert_eq!(config.default_font_size, 14);
        assert_eq!(config.prefix_key, "ctrl-b");
        assert!(config.remote.is_empty());
        assert!(config.log_file().ends_with("tabmux.log"));
    }

    #[test]
    fn test_parse_full() {
        let config = Config::parse(
            r#"
            log_level = "debug"
            history_limit = 50
            default_font_size = 16
            prefix_key = "ctrl-a"
            shell = "/bin/zsh"

            [[remote]]
            key = "api"
            command = "ssh"
            args = ["api.internal"]

            [[remote]]
            key = "repl"
            cwd = "/tmp"
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.remote.len(), 2);

        let api = config.remote_spec("api");
        assert_eq!(api.command.as_deref(), Some("ssh"));
        assert_eq!(api.args, vec!["api.internal".to_string()]);

        let repl = config.remote_spec("repl");
        assert_eq!(repl.command.as_deref(), Some("/bin/zsh"));
        assert_eq!(repl.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_unknown_key_runs_program_of_that_name() {
        let config = Config::default();
        assert_eq!(config.remote_spec("htop").command.as_deref(), Some("htop"));
        assert_eq!(config.remote_spec(DEFAULT_REMOTE_KEY).command, None);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            Config::parse("default_font_size = 99"),
            Err(ConfigError::FontSize { .. })
        ));
        assert!(matches!(
            Config::parse("prefix_key = \"hyper-z\""),
            Err(ConfigError::InvalidPrefix(_))
        ));
        assert!(matches!(
            Config::parse("history_limit = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            Config::load(Some(&missing)),
            Err(ConfigError::NotFound(_))
        ));

        let path = dir.path().join("config.toml");
        fs::write(&path, "history_limit = 5\n").unwrap();
        assert_eq!(Config::load(Some(&path)).unwrap().history_limit, 5);
    }
}
