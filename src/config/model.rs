// src/config/model.rs

use serde::Deserialize;
use std::{path::PathBuf, time::Duration};
use thiserror::Error;

/// Top-level runtime config, immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct Config {
    pub remote:    RemoteConfig,
    pub staging:   StagingConfig,
    pub warehouse: WarehouseConfig,
    pub logging:   LoggingConfig,
    pub run:       RunFlags,
}

/// Fully-typed `[remote]` section.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub hostname:          String,
    pub port:              u16,
    pub username:          String,
    pub ssh_key_file:      PathBuf,
    /// POSIX path of the recorder database on the remote host.
    pub db_file:           String,
    pub known_hosts:       Option<PathBuf>,
    pub connect_timeout:   Duration,
    pub pre_fetch_command: Option<String>,
}

/// Fully-typed `[staging]` section.
#[derive(Debug, Clone)]
pub struct StagingConfig {
    pub folder: PathBuf,
    pub verify: bool,
}

/// Fully-typed `[warehouse]` section.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub path:    PathBuf,
    pub sql_dir: Option<PathBuf>,
}

/// Mirror of the `[logging]` table
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_file")] pub file:  PathBuf,
    #[serde(default = "default_level")]    pub level: String,
}
fn default_log_file() -> PathBuf { PathBuf::from("ingest.log") }
fn default_level() -> String { "INFO".into() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { file: default_log_file(), level: default_level() }
    }
}

/// Mirror of the `[run]` table; CLI flags are OR-ed on top.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub struct RunFlags {
    #[serde(default)] pub full_load:     bool,
    #[serde(default)] pub skip_download: bool,
    #[serde(default)] pub verbose:       bool,
}

impl RunFlags {
    /// Combine two flag sets; a modifier enabled in either is enabled.
    pub fn merge(self, other: RunFlags) -> RunFlags {
        RunFlags {
            full_load:     self.full_load || other.full_load,
            skip_download: self.skip_download || other.skip_download,
            verbose:       self.verbose || other.verbose,
        }
    }
}

/// Raw TOML document.
#[derive(Debug, Deserialize)]
pub(crate) struct RawConfig {
    pub remote:    RawRemote,
    pub staging:   RawStaging,
    pub warehouse: RawWarehouse,
    #[serde(default)]
    pub logging:   LoggingConfig,
    #[serde(default)]
    pub run:       RunFlags,
}

/// Raw `[remote]` table.
#[derive(Debug, Deserialize)]
pub(crate) struct RawRemote {
    pub hostname:     String,
    #[serde(default = "default_port")]
    pub port:         u16,
    pub username:     String,
    pub ssh_key_file: String,
    pub db_file:      String,
    #[serde(default)]
    pub known_hosts:  Option<String>,
    #[serde(default)]
    pub connect_timeout: Option<String>,
    #[serde(default)]
    pub pre_fetch_command: Option<String>,
}
fn default_port() -> u16 { 22 }

/// Raw `[staging]` table.
#[derive(Debug, Deserialize)]
pub(crate) struct RawStaging {
    pub folder: String,
    #[serde(default = "default_verify")]
    pub verify: bool,
}
fn default_verify() -> bool { true }

/// Raw `[warehouse]` table.
#[derive(Debug, Deserialize)]
pub(crate) struct RawWarehouse {
    pub path:    String,
    #[serde(default)]
    pub sql_dir: Option<String>,
}

/// All the ways config loading can go wrong
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting '{0}'")]
    Missing(&'static str),

    #[error("invalid duration '{0}': {1}")]
    InvalidDuration(String, #[source] humantime::DurationError),

    #[error("'{0}' does not name a file")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
