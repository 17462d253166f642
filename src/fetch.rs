// src/fetch.rs

//! Remote snapshot fetcher.
//!
//! Copies the recorder database and its write-ahead log from the remote host
//! into the staging folder, main file first.
//!
//! The two copies are sequential and the source keeps writing while they run,
//! so the pair is NOT an atomic snapshot: frames appended to the WAL after the
//! main file was read are still applied on load, and a checkpoint between the
//! two copies can leave the staged pair inconsistent. `remote.pre_fetch_command`
//! exists to run a remote-side checkpoint or pause before copying.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::Level;

use crate::error::{IngestError, Result};
use crate::remote::{RemoteError, RemoteSession, TransferObserver};
use crate::stage_log;

/// The live database on the remote host, identified by its POSIX path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSnapshot {
    main: String,
}

impl RemoteSnapshot {
    pub fn new(path: impl Into<String>) -> Self {
        Self { main: path.into() }
    }

    pub fn main_path(&self) -> &str {
        &self.main
    }

    /// `<main>-wal`, next to the main file.
    pub fn wal_path(&self) -> String {
        format!("{}-wal", self.main)
    }

    /// File name component of the main path.
    pub fn file_name(&self) -> &str {
        self.main.rsplit('/').next().unwrap_or(&self.main)
    }
}

/// Local copies of a snapshot inside the staging folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedSnapshot {
    pub main: PathBuf,
    pub wal: PathBuf,
}

impl StagedSnapshot {
    /// Staging layout for `snapshot`: `<dir>/<name>` and `<dir>/<name>-wal`.
    pub fn at(staging_dir: &Path, snapshot: &RemoteSnapshot) -> Self {
        let name = snapshot.file_name();
        Self {
            main: staging_dir.join(name),
            wal: staging_dir.join(format!("{name}-wal")),
        }
    }

    /// Reuse a previously staged snapshot without contacting the remote host.
    pub fn existing(staging_dir: &Path, snapshot: &RemoteSnapshot) -> Result<Self> {
        let staged = Self::at(staging_dir, snapshot);
        if !staged.main.is_file() {
            return Err(IngestError::MissingSnapshot(staged.main));
        }
        if !staged.has_wal() {
            stage_log!(Level::Warn, "fetch", "No staged WAL next to {:?}", staged.main);
        }
        Ok(staged)
    }

    pub fn has_wal(&self) -> bool {
        self.wal.is_file()
    }

    /// Shared-memory index SQLite keeps next to a WAL database.
    pub fn shm(&self) -> PathBuf {
        let mut name = self.main.clone().into_os_string();
        name.push("-shm");
        PathBuf::from(name)
    }
}

/// Copy main file then WAL of `snapshot` into `staging_dir`.
///
/// `observer_for` builds one progress observer per file, given its label.
/// Partial files from a failed transfer are left for the next run to
/// overwrite.
pub fn fetch_snapshot<S, F, O>(
    session: &mut S,
    snapshot: &RemoteSnapshot,
    staging_dir: &Path,
    mut observer_for: F,
) -> Result<StagedSnapshot>
where
    S: RemoteSession + ?Sized,
    F: FnMut(&str) -> O,
    O: TransferObserver,
{
    let transfer = |path: &str| {
        let path = path.to_string();
        move |source: RemoteError| IngestError::Transfer { path, source }
    };

    fs::create_dir_all(staging_dir)
        .map_err(|e| transfer(&staging_dir.display().to_string())(e.into()))?;
    let staged = StagedSnapshot::at(staging_dir, snapshot);
    remove_if_present(&staged.shm()).map_err(|e| transfer(snapshot.main_path())(e.into()))?;

    stage_log!(Level::Info, "fetch", "Downloading {} -> {:?}", snapshot.main_path(), staged.main);
    let mut observer = observer_for("main db");
    let main_bytes = session
        .download(snapshot.main_path(), &staged.main, &mut observer)
        .map_err(transfer(snapshot.main_path()))?;

    let wal = snapshot.wal_path();
    match session.file_size(&wal).map_err(transfer(&wal))? {
        Some(_) => {
            let mut observer = observer_for("write-ahead log");
            let wal_bytes = session
                .download(&wal, &staged.wal, &mut observer)
                .map_err(transfer(&wal))?;
            stage_log!(Level::Info, "fetch", "Staged {} + {} bytes (main + WAL)", main_bytes, wal_bytes);
        }
        None => {
            stage_log!(Level::Warn, "fetch", "Remote has no {}, dropping any stale local WAL", wal);
            remove_if_present(&staged.wal).map_err(|e| transfer(&wal)(e.into()))?;
            stage_log!(Level::Info, "fetch", "Staged {} bytes (no WAL)", main_bytes);
        }
    }

    Ok(staged)
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
