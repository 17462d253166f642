//! Shared fixtures: a live recorder database, an in-process remote session
//! and config builders.

#![allow(dead_code)]

use std::{
    fs::{self, File},
    io::{self, BufWriter},
    path::{Path, PathBuf},
};

use rusqlite::{Connection, params};

use ha_ingest::config::{self, Config};
use ha_ingest::remote::{copy_with_progress, RemoteError, RemoteSession, TransferObserver};

/// Midnight UTC, 2023-11-15. Day `n` of a fixture starts `n - 1` days later.
pub const DAY_ONE: f64 = 1_700_006_400.0;
pub const DAY: f64 = 86_400.0;

/// Timestamp of the `i`-th event of day `day` (1-based), one per minute.
pub fn ts(day: u32, i: u32) -> f64 {
    DAY_ONE + f64::from(day - 1) * DAY + f64::from(i) * 60.0 + 0.25
}

/// A recorder database in WAL mode that stays open, like the live one on
/// the Home Assistant host, so its recent writes sit in the `-wal` file.
pub struct Recorder {
    pub path: PathBuf,
    conn: Option<Connection>,
}

impl Recorder {
    pub fn create(path: &Path) -> Self {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA wal_autocheckpoint = 0;
             CREATE TABLE states_meta (
                 metadata_id INTEGER PRIMARY KEY,
                 entity_id   TEXT
             );
             CREATE TABLE state_attributes (
                 attributes_id INTEGER PRIMARY KEY,
                 hash          INTEGER,
                 shared_attrs  TEXT
             );
             CREATE TABLE states (
                 state_id        INTEGER PRIMARY KEY,
                 entity_id       TEXT,
                 state           TEXT,
                 attributes      TEXT,
                 last_changed_ts REAL,
                 last_updated_ts REAL,
                 old_state_id    INTEGER,
                 attributes_id   INTEGER,
                 metadata_id     INTEGER
             );
             INSERT INTO states_meta (metadata_id, entity_id) VALUES
                 (1, 'sensor.living_room_temperature'),
                 (2, 'switch.kitchen');
             INSERT INTO state_attributes (attributes_id, hash, shared_attrs) VALUES
                 (1, 11, '{\"unit_of_measurement\":\"°C\"}');",
        )
        .unwrap();
        Recorder { path: path.to_path_buf(), conn: Some(conn) }
    }

    /// Append `per_day` events for each day in `days`.
    pub fn add_days(&mut self, days: std::ops::RangeInclusive<u32>, per_day: u32) {
        let conn = self.conn.as_mut().expect("recorder closed");
        let tx = conn.transaction().unwrap();
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO states
                       (state, last_changed_ts, last_updated_ts, attributes_id, metadata_id)
                     VALUES (?1, ?2, ?2, ?3, ?4)",
                )
                .unwrap();
            for day in days {
                for i in 0..per_day {
                    let metadata_id = if i % 2 == 0 { 1 } else { 2 };
                    let attributes_id: Option<i64> = (metadata_id == 1).then_some(1);
                    stmt.execute(params![format!("{}.{}", day, i), ts(day, i), attributes_id, metadata_id])
                        .unwrap();
                }
            }
        }
        tx.commit().unwrap();
    }

    pub fn wal(&self) -> PathBuf {
        PathBuf::from(format!("{}-wal", self.path.display()))
    }

    /// Close the writer; SQLite checkpoints and removes the WAL.
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.close().unwrap();
        }
    }
}

/// Serves "remote" paths from the local filesystem.
#[derive(Default)]
pub struct LocalSession {
    pub downloads: Vec<String>,
    pub commands: Vec<String>,
}

impl RemoteSession for LocalSession {
    fn file_size(&mut self, remote: &str) -> Result<Option<u64>, RemoteError> {
        match fs::metadata(remote) {
            Ok(m) => Ok(Some(m.len())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn download(
        &mut self,
        remote: &str,
        local: &Path,
        observer: &mut dyn TransferObserver,
    ) -> Result<u64, RemoteError> {
        let mut src = File::open(remote).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => RemoteError::NotFound(remote.to_string()),
            _ => e.into(),
        })?;
        let total = src.metadata()?.len();
        let mut dst = BufWriter::new(File::create(local)?);
        let n = copy_with_progress(&mut src, &mut dst, total, observer)?;
        self.downloads.push(remote.to_string());
        Ok(n)
    }

    fn exec(&mut self, command: &str) -> Result<String, RemoteError> {
        self.commands.push(command.to_string());
        Ok(format!("ran {command}\n"))
    }
}

/// Config pointing every path inside `root`.
pub fn config_for(root: &Path, remote_db: &Path, full_load: bool, skip_download: bool) -> Config {
    let txt = format!(
        r#"
        [remote]
        hostname = "homeassistant.local"
        username = "root"
        ssh_key_file = "/nonexistent/id_ed25519"
        db_file = "{remote}"

        [staging]
        folder = "{staging}"

        [warehouse]
        path = "{warehouse}"

        [logging]
        file = "{log}"

        [run]
        full_load = {full_load}
        skip_download = {skip_download}
        "#,
        remote = remote_db.display(),
        staging = root.join("staging").display(),
        warehouse = root.join("warehouse").join("homeassistant.db").display(),
        log = root.join("ingest.log").display(),
    );
    config::load_str(&txt).unwrap()
}

pub fn count_events(warehouse: &Path) -> i64 {
    let conn = Connection::open(warehouse).unwrap();
    conn.query_row("SELECT COUNT(*) FROM events", [], |r| r.get(0)).unwrap()
}

pub fn max_last_updated(warehouse: &Path) -> Option<f64> {
    let conn = Connection::open(warehouse).unwrap();
    conn.query_row("SELECT MAX(last_updated) FROM events", [], |r| r.get(0)).unwrap()
}
