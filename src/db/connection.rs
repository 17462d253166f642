// src/db/connection.rs
//! Opening the analytical store with its schemas attached.
//!
//! Layout of one connection:
//! - `raw_data`: the persistent warehouse file (fact table lives here)
//! - `staging`:  an in-memory database for the staging rowset
//! - `source`:   the staged snapshot, attached only while loading

use std::{fs, path::{Path, PathBuf}, time::Duration};

use log::Level;
use rusqlite::Connection;

use crate::error::{IngestError, Result};
use crate::stage_log;

/// Scoped handle on the warehouse. Dropping it closes the connection.
pub struct Warehouse {
    conn: Connection,
    path: PathBuf,
}

impl Warehouse {
    /// Open (creating if needed) the warehouse at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| IngestError::Io { path: parent.to_path_buf(), source })?;
        }

        let conn = Connection::open_in_memory().map_err(IngestError::staging("open engine"))?;
        conn.busy_timeout(Duration::from_millis(1_000))
            .map_err(IngestError::staging("set busy timeout"))?;
        conn.execute("ATTACH DATABASE ?1 AS raw_data", [path.to_string_lossy().into_owned()])
            .map_err(IngestError::staging(format!("attach warehouse {}", path.display())))?;
        conn.execute_batch("PRAGMA raw_data.journal_mode = WAL; PRAGMA raw_data.synchronous = NORMAL;")
            .map_err(IngestError::staging("set warehouse pragmas"))?;
        conn.execute_batch("ATTACH DATABASE ':memory:' AS staging")
            .map_err(IngestError::staging("attach staging"))?;

        stage_log!(Level::Info, "staging", "Warehouse ready at {}", path.display());
        Ok(Self { conn, path: path.to_path_buf() })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close explicitly so a failure to close is reported instead of ignored.
    pub fn close(self) -> Result<()> {
        let path = self.path;
        self.conn.close().map_err(|(_, e)| IngestError::Close(e))?;
        stage_log!(Level::Info, "report", "Closed warehouse {}", path.display());
        Ok(())
    }
}
