// src/pipeline.rs

//! One ingestion run: fetch → stage → merge → report.
//!
//! Config is passed in explicitly. The remote session is released as soon as
//! the snapshot is staged and the warehouse connection at the end of the run;
//! both are scoped handles, so early returns release them too.

use log::Level;

use crate::config::{Config, RemoteConfig};
use crate::db::{merge, staging, MergePolicy, Relation, SqlCatalog, Warehouse, Watermark};
use crate::error::{IngestError, Result};
use crate::fetch::{fetch_snapshot, RemoteSnapshot, StagedSnapshot};
use crate::remote::{LogProgress, RemoteError, RemoteSession, SshSession};
use crate::report::RunReport;
use crate::stage_log;

/// Run against the configured host over SSH.
pub fn run(cfg: &Config) -> Result<RunReport> {
    run_with(cfg, |remote| {
        let mut session = SshSession::connect(remote)?;
        session.log_host_info();
        Ok(session)
    })
}

/// Run with a caller-supplied session factory. `connect` is only invoked
/// when a download is needed.
pub fn run_with<S, C>(cfg: &Config, connect: C) -> Result<RunReport>
where
    S: RemoteSession,
    C: FnOnce(&RemoteConfig) -> std::result::Result<S, RemoteError>,
{
    let snapshot = RemoteSnapshot::new(cfg.remote.db_file.clone());
    let policy = MergePolicy::from_full_load(cfg.run.full_load);
    stage_log!(Level::Info, "config", "Starting {} load of {}", policy, snapshot.main_path());

    let staged = stage_snapshot(cfg, &snapshot, connect)?;

    let catalog = match &cfg.warehouse.sql_dir {
        Some(dir) => SqlCatalog::with_overrides(dir),
        None => SqlCatalog::embedded(),
    };
    let mut warehouse = Warehouse::open(&cfg.warehouse.path)?;

    staging::init_schemas(warehouse.conn(), &catalog)?;
    staging::load_staging(warehouse.conn(), &catalog, &staged, cfg.staging.verify)?;
    let staging_wm = Watermark::query(warehouse.conn(), &catalog, Relation::Staging)?;
    stage_log!(Level::Info, "staging", "staging: {}", staging_wm);

    let before = Watermark::query(warehouse.conn(), &catalog, Relation::Events)?;
    stage_log!(Level::Info, "merge", "before: {}", before);
    let outcome = merge::merge(warehouse.conn_mut(), &catalog, policy)?;
    let after = Watermark::query(warehouse.conn(), &catalog, Relation::Events)?;
    stage_log!(Level::Info, "merge", "after:  {}", after);

    warehouse.close()?;

    Ok(RunReport {
        downloaded: !cfg.run.skip_download,
        staging: staging_wm,
        before,
        after,
        outcome,
    })
}

/// Download a fresh snapshot, or reuse the staged one in skip mode.
fn stage_snapshot<S, C>(cfg: &Config, snapshot: &RemoteSnapshot, connect: C) -> Result<StagedSnapshot>
where
    S: RemoteSession,
    C: FnOnce(&RemoteConfig) -> std::result::Result<S, RemoteError>,
{
    if cfg.run.skip_download {
        stage_log!(Level::Info, "fetch", "Download skipped, using staged files in {:?}", cfg.staging.folder);
        return StagedSnapshot::existing(&cfg.staging.folder, snapshot);
    }

    let mut session = connect(&cfg.remote).map_err(IngestError::Connect)?;
    if let Some(cmd) = &cfg.remote.pre_fetch_command {
        stage_log!(Level::Info, "fetch", "Running pre-fetch command: {}", cmd);
        let out = session.exec(cmd).map_err(|source| IngestError::Transfer {
            path: snapshot.main_path().to_string(),
            source,
        })?;
        if !out.trim().is_empty() {
            stage_log!(Level::Debug, "fetch", "pre-fetch output: {}", out.trim());
        }
    }
    fetch_snapshot(&mut session, snapshot, &cfg.staging.folder, |label| LogProgress::new(label))
}
