// src/db/watermark.rs

//! Watermark snapshots: `(row count, min last_updated, max last_updated)` of
//! a relation at one point in time. Read-only and never stored.

use std::fmt;

use chrono::{DateTime, Local, SecondsFormat, Utc};
use rusqlite::Connection;

use super::artifacts::{Artifact, SqlCatalog};
use crate::error::{IngestError, Result};

/// Relations a watermark can be taken on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Events,
    Staging,
}

impl Relation {
    pub fn table(self) -> &'static str {
        match self {
            Relation::Events => "raw_data.events",
            Relation::Staging => "staging.home_assistant_events",
        }
    }

    fn artifact(self) -> Artifact {
        match self {
            Relation::Events => Artifact::WatermarkEvents,
            Relation::Staging => Artifact::WatermarkStaging,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark {
    pub rows: u64,
    /// `None` when the relation is empty.
    pub min: Option<DateTime<Utc>>,
    pub max: Option<DateTime<Utc>>,
}

impl Watermark {
    pub const EMPTY: Watermark = Watermark { rows: 0, min: None, max: None };

    /// Query the watermark of `relation`. An empty relation yields
    /// [`Watermark::EMPTY`].
    pub fn query(conn: &Connection, catalog: &SqlCatalog, relation: Relation) -> Result<Self> {
        let sql = catalog.sql(relation.artifact())?;
        let (rows, min, max) = conn
            .query_row(&sql, [], |r| {
                Ok((r.get::<_, i64>(0)?, r.get::<_, Option<f64>>(1)?, r.get::<_, Option<f64>>(2)?))
            })
            .map_err(IngestError::Report)?;
        Ok(Watermark {
            rows: rows.max(0) as u64,
            min: checked_epoch(min)?,
            max: checked_epoch(max)?,
        })
    }
}

/// Recorder timestamps are fractional unix seconds.
pub fn from_epoch(secs: f64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros((secs * 1_000_000.0).round() as i64)
}

/// NULL stays `None`; a non-null value chrono cannot represent is an error,
/// never the empty-table placeholder.
fn checked_epoch(secs: Option<f64>) -> Result<Option<DateTime<Utc>>> {
    secs.map(|s| from_epoch(s).ok_or(IngestError::TimestampRange(s)))
        .transpose()
}

fn fmt_ts(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.with_timezone(&Local).to_rfc3339_opts(SecondsFormat::Millis, false))
        .unwrap_or_else(|| "null".into())
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rows, min={}, max={}", self.rows, fmt_ts(self.min), fmt_ts(self.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_watermark_renders_null() {
        assert_eq!(Watermark::EMPTY.to_string(), "0 rows, min=null, max=null");
    }

    #[test]
    fn epoch_conversion_keeps_micros() {
        let ts = from_epoch(1_700_000_000.123456).unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_micros(), 123_456);
    }

    #[test]
    fn unrepresentable_timestamp_is_an_error() {
        assert!(matches!(checked_epoch(Some(1e20)), Err(IngestError::TimestampRange(_))));
        assert_eq!(checked_epoch(None).unwrap(), None);
        assert!(checked_epoch(Some(0.0)).unwrap().is_some());
    }

    #[test]
    fn rendering_is_timezone_aware() {
        let wm = Watermark { rows: 3, min: from_epoch(0.0), max: from_epoch(60.0) };
        let text = wm.to_string();
        assert!(text.starts_with("3 rows, min="), "{}", text);
        let max = text.rsplit("max=").next().unwrap();
        // RFC 3339 always carries an offset
        assert!(DateTime::parse_from_rfc3339(max).is_ok(), "{}", max);
    }
}
