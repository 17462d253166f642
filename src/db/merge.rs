// src/db/merge.rs

//! Merge engine: moves the staging rowset into `raw_data.events`.
//!
//! The selected artifact runs inside one transaction on the warehouse file.
//! A failing statement rolls the whole merge back, and a process killed
//! mid-merge leaves the fact table in its pre-merge state after SQLite's
//! journal recovery. There are never torn partial merges.

use std::fmt;

use log::Level;
use rusqlite::{Connection, Transaction};

use super::artifacts::{Artifact, SqlCatalog};
use crate::error::{IngestError, Result};
use crate::stage_log;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Delete every fact row, then insert the whole staging rowset.
    Full,
    /// Insert staging rows newer than the fact table's max `last_updated`.
    Delta,
}

impl MergePolicy {
    pub fn from_full_load(full_load: bool) -> Self {
        if full_load { MergePolicy::Full } else { MergePolicy::Delta }
    }

    pub fn artifact(self) -> Artifact {
        match self {
            MergePolicy::Full => Artifact::LoadFull,
            MergePolicy::Delta => Artifact::LoadDelta,
        }
    }
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MergePolicy::Full => "full",
            MergePolicy::Delta => "delta",
        })
    }
}

/// Row accounting of one merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub policy: MergePolicy,
    /// Fact rows present before the merge.
    pub rows_before: u64,
    /// Fact rows present after the merge.
    pub rows_after: u64,
}

impl MergeOutcome {
    /// Rows written by the merge. For a full load this is the whole table.
    pub fn inserted(&self) -> u64 {
        match self.policy {
            MergePolicy::Full => self.rows_after,
            MergePolicy::Delta => self.rows_after.saturating_sub(self.rows_before),
        }
    }

    /// Rows discarded by the merge (only a full load discards).
    pub fn discarded(&self) -> u64 {
        match self.policy {
            MergePolicy::Full => self.rows_before,
            MergePolicy::Delta => 0,
        }
    }
}

/// Run exactly one merge artifact, chosen by `policy`.
pub fn merge(conn: &mut Connection, catalog: &SqlCatalog, policy: MergePolicy) -> Result<MergeOutcome> {
    let sql = catalog.sql(policy.artifact())?;
    let fail = |source| IngestError::Merge { policy, source };

    let tx = conn.transaction().map_err(fail)?;
    let rows_before = count_events(&tx).map_err(fail)?;
    stage_log!(Level::Info, "merge", "Running {} load over {} existing rows", policy, rows_before);
    tx.execute_batch(&sql).map_err(fail)?;
    let rows_after = count_events(&tx).map_err(fail)?;
    tx.commit().map_err(fail)?;

    let outcome = MergeOutcome { policy, rows_before, rows_after };
    stage_log!(
        Level::Info,
        "merge",
        "{} load committed: {} inserted, {} discarded",
        policy,
        outcome.inserted(),
        outcome.discarded()
    );
    Ok(outcome)
}

fn count_events(tx: &Transaction<'_>) -> rusqlite::Result<u64> {
    tx.query_row("SELECT COUNT(*) FROM raw_data.events", [], |r| r.get::<_, i64>(0))
        .map(|n| n as u64)
}
