// src/report.rs
//! Run summary rendered for operators once a run completes.

use std::fmt;

use log::Level;

use crate::db::{MergeOutcome, Watermark};
use crate::stage_log;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub downloaded: bool,
    /// Staging rowset right after loading.
    pub staging: Watermark,
    /// Fact table before and after the merge.
    pub before: Watermark,
    pub after: Watermark,
    pub outcome: MergeOutcome,
}

impl RunReport {
    pub fn log(&self) {
        for line in self.to_string().lines() {
            stage_log!(Level::Info, "report", "{}", line);
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} load ({}): {} inserted, {} discarded",
            self.outcome.policy,
            if self.downloaded { "fresh snapshot" } else { "previously staged snapshot" },
            self.outcome.inserted(),
            self.outcome.discarded()
        )?;
        writeln!(f, "  staging: {}", self.staging)?;
        writeln!(f, "  before:  {}", self.before)?;
        write!(f, "  after:   {}", self.after)
    }
}
