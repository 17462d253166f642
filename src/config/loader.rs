// src/config/loader.rs

//! # Configuration Loader
//!
//! Reads the TOML run configuration, deserializes it into the raw mirror
//! structs and validates/converts it into the runtime `Config`.

use crate::config::model::{
    Config, ConfigError, RawConfig, RemoteConfig, StagingConfig, WarehouseConfig,
};
use crate::stage_log;
use log::Level;
use std::{fs, path::Path, path::PathBuf, time::Duration};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Load and parse the run configuration from `path`.
/// Logs at DEBUG before reading and INFO on success.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    stage_log!(Level::Debug, "config", "Reading config from {:?}", path);
    let txt = fs::read_to_string(path)?;
    let cfg = load_str(&txt)?;
    stage_log!(Level::Info, "config", "Loaded config from {:?}", path);
    Ok(cfg)
}

/// Parse and validate a configuration document.
pub fn load_str(txt: &str) -> Result<Config, ConfigError> {
    let raw: RawConfig = toml::from_str(txt)?;
    convert(raw)
}

fn convert(raw: RawConfig) -> Result<Config, ConfigError> {
    let r = raw.remote;
    let hostname = required("remote.hostname", r.hostname)?;
    let username = required("remote.username", r.username)?;
    let ssh_key_file = expand_home(&required("remote.ssh_key_file", r.ssh_key_file)?);
    let db_file = required("remote.db_file", r.db_file)?;
    if db_file.ends_with('/') {
        return Err(ConfigError::InvalidPath(db_file));
    }

    let connect_timeout = match r.connect_timeout {
        Some(s) => humantime::parse_duration(&s).map_err(|e| ConfigError::InvalidDuration(s, e))?,
        None => DEFAULT_CONNECT_TIMEOUT,
    };

    let remote = RemoteConfig {
        hostname,
        port: r.port,
        username,
        ssh_key_file,
        db_file,
        known_hosts: r.known_hosts.as_deref().map(expand_home),
        connect_timeout,
        pre_fetch_command: r.pre_fetch_command.filter(|c| !c.trim().is_empty()),
    };

    let staging = StagingConfig {
        folder: expand_home(&required("staging.folder", raw.staging.folder)?),
        verify: raw.staging.verify,
    };

    let warehouse = WarehouseConfig {
        path: expand_home(&required("warehouse.path", raw.warehouse.path)?),
        sql_dir: raw.warehouse.sql_dir.as_deref().map(expand_home),
    };

    Ok(Config {
        remote,
        staging,
        warehouse,
        logging: raw.logging,
        run: raw.run,
    })
}

/// Reject empty or whitespace-only strings for required settings.
fn required(field: &'static str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::Missing(field))
    } else {
        Ok(value)
    }
}

/// Expand `~` and a leading `~/` to `$HOME`.
fn expand_home(path: &str) -> PathBuf {
    let rest = if path == "~" { Some("") } else { path.strip_prefix("~/") };
    match (rest, std::env::var_os("HOME")) {
        (Some(""), Some(home)) => PathBuf::from(home),
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}
