//! `cue.toml` runner configuration.
//!
//! ```toml
//! max_frames = 600          # give up after this many frames (default 10000)
//! log_level = "info"        # off | error | warn | info | debug | trace
//! log_file = "cue.log"      # optional; console logging always happens
//!
//! [session]                 # initial session variables
//! chapter = "2"
//! met_bob = "1"
//! ```
//!
//! Lookup order when no explicit path is given: `./cue.toml`, then
//! `cue.toml` in the platform config directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;

/// File name searched for when no `--config` is given.
pub const CONFIG_FILE: &str = "cue.toml";

const DEFAULT_MAX_FRAMES: u64 = 10_000;

/// A config file that could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Runner settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub max_frames: u64,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    /// Session variables set before the first frame.
    pub session: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_frames: DEFAULT_MAX_FRAMES,
            log_level: "warn".to_owned(),
            log_file: None,
            session: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config text.
    pub fn load_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Read and parse a config file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_owned(), source })?;
        Self::load_str(&text).map_err(|source| ConfigError::Parse { path: path.to_owned(), source })
    }

    /// Load `explicit` if given, else the first config found by
    /// [`find_config`], else the defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit.map(Path::to_path_buf).or_else(find_config) {
            Some(path) => Self::load_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// The configured log level; unknown names fall back to `warn`.
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Warn)
    }
}

/// Locate a config file: `./cue.toml`, then the platform config directory.
pub fn find_config() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }
    ProjectDirs::from("", "", "cue")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
        .filter(|path| path.is_file())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
