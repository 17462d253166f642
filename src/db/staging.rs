// src/db/staging.rs

//! Staging loader: schema initialisation and materialisation of the staging
//! rowset from a staged recorder snapshot.

use log::Level;
use rusqlite::Connection;

use super::artifacts::{Artifact, SqlCatalog};
use crate::error::{IngestError, Result};
use crate::fetch::StagedSnapshot;
use crate::stage_log;

/// Ensure every schema object exists. Safe to run on every run.
pub fn init_schemas(conn: &Connection, catalog: &SqlCatalog) -> Result<()> {
    let sql = catalog.sql(Artifact::CreateSchemas)?;
    conn.execute_batch(&sql)
        .map_err(IngestError::staging(Artifact::CreateSchemas.name()))?;
    stage_log!(Level::Debug, "staging", "Schemas initialised");
    Ok(())
}

/// Attach `staged`, optionally integrity-check it, build
/// `staging.home_assistant_events` and detach again.
///
/// SQLite picks up the `-wal` sidecar by name and checkpoints it into the
/// staged main file on detach, so a later skip-download run reads the same
/// rows from the main file alone.
pub fn load_staging(
    conn: &Connection,
    catalog: &SqlCatalog,
    staged: &StagedSnapshot,
    verify: bool,
) -> Result<()> {
    if !staged.main.is_file() {
        return Err(IngestError::MissingSnapshot(staged.main.clone()));
    }
    let sql = catalog.sql(Artifact::LoadStaging)?;

    conn.execute("ATTACH DATABASE ?1 AS source", [staged.main.to_string_lossy().into_owned()])
        .map_err(IngestError::staging(format!("attach {}", staged.main.display())))?;

    let loaded = check_and_load(conn, &sql, verify);
    let detached = conn
        .execute_batch("DETACH DATABASE source")
        .map_err(IngestError::staging("detach snapshot"));
    loaded?;
    detached?;

    stage_log!(Level::Info, "staging", "Staging rowset built from {:?}", staged.main);
    Ok(())
}

fn check_and_load(conn: &Connection, sql: &str, verify: bool) -> Result<()> {
    if verify {
        let problems: Vec<String> = conn
            .prepare("PRAGMA source.quick_check")
            .and_then(|mut stmt| {
                let lines = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>();
                lines
            })
            .map_err(IngestError::staging("read snapshot"))?
            .into_iter()
            .filter(|line| line != "ok")
            .collect();
        if !problems.is_empty() {
            return Err(IngestError::Corrupt(problems.join("; ")));
        }
    }
    conn.execute_batch(sql)
        .map_err(IngestError::staging(Artifact::LoadStaging.name()))
}
