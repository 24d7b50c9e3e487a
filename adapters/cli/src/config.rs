use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use sokoban_core::Command;
use thiserror::Error;

/// Config file read when `--config` is not given.
pub(crate) const DEFAULT_CONFIG_PATH: &str = "sokoban.toml";

/// Errors raised while loading the configuration file.
#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid config file {}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Window settings for the graphical front ends.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct WindowConfig {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) vsync: bool,
    pub(crate) show_fps: bool,
    pub(crate) manifest: Option<PathBuf>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 960,
            height: 720,
            vsync: true,
            show_fps: false,
            manifest: None,
        }
    }
}

/// Application settings, every field optional in the file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct AppConfig {
    pub(crate) storage_dir: PathBuf,
    pub(crate) player: String,
    pub(crate) animation_ms: u64,
    pub(crate) max_cell_size: u32,
    pub(crate) log_filter: String,
    pub(crate) window: WindowConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("saves"),
            player: "player".to_owned(),
            animation_ms: 100,
            max_cell_size: 50,
            log_filter: "info".to_owned(),
            window: WindowConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads `path`, or the default file when present.
    ///
    /// An explicitly requested file must exist; a missing default file
    /// yields the defaults.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(error) if !required && error.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        Self::parse(&contents).map_err(|source| ConfigError::Parse { path, source })
    }

    fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Duration of one step animation.
    pub(crate) fn animation(&self) -> Duration {
        Duration::from_millis(self.animation_ms)
    }

    /// Runner tuning expressed as a command.
    pub(crate) fn configure_command(&self) -> Command {
        Command::Configure {
            animation: self.animation(),
            max_cell_size: self.max_cell_size,
        }
    }
}
