// src/db/artifacts.rs
//! Named SQL artifacts. Each one ships embedded in the binary and can be
//! replaced at runtime by a file of the same name in `warehouse.sql_dir`.

use std::{borrow::Cow, fs, io, path::PathBuf};

use log::Level;

use crate::error::{IngestError, Result};
use crate::stage_log;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    /// Idempotent `CREATE … IF NOT EXISTS` for every schema object.
    CreateSchemas,
    /// Materialises `staging.home_assistant_events` from the attached snapshot.
    LoadStaging,
    /// Truncate-and-reload merge.
    LoadFull,
    /// Append-only-newer merge.
    LoadDelta,
    WatermarkEvents,
    WatermarkStaging,
}

impl Artifact {
    pub const ALL: [Artifact; 6] = [
        Artifact::CreateSchemas,
        Artifact::LoadStaging,
        Artifact::LoadFull,
        Artifact::LoadDelta,
        Artifact::WatermarkEvents,
        Artifact::WatermarkStaging,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Artifact::CreateSchemas => "create_schemas",
            Artifact::LoadStaging => "load_staging",
            Artifact::LoadFull => "load_full",
            Artifact::LoadDelta => "load_delta",
            Artifact::WatermarkEvents => "watermark_events",
            Artifact::WatermarkStaging => "watermark_staging",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.sql", self.name())
    }

    fn embedded(self) -> &'static str {
        match self {
            Artifact::CreateSchemas => include_str!("../../resources/sql/create_schemas.sql"),
            Artifact::LoadStaging => include_str!("../../resources/sql/load_staging.sql"),
            Artifact::LoadFull => include_str!("../../resources/sql/load_full.sql"),
            Artifact::LoadDelta => include_str!("../../resources/sql/load_delta.sql"),
            Artifact::WatermarkEvents => include_str!("../../resources/sql/watermark_events.sql"),
            Artifact::WatermarkStaging => include_str!("../../resources/sql/watermark_staging.sql"),
        }
    }
}

/// Resolves artifacts to SQL text.
#[derive(Debug, Clone, Default)]
pub struct SqlCatalog {
    overrides: Option<PathBuf>,
}

impl SqlCatalog {
    /// Only the artifacts compiled into the binary.
    pub fn embedded() -> Self {
        Self { overrides: None }
    }

    /// Prefer `<dir>/<artifact>.sql` when present.
    pub fn with_overrides(dir: impl Into<PathBuf>) -> Self {
        Self { overrides: Some(dir.into()) }
    }

    pub fn sql(&self, artifact: Artifact) -> Result<Cow<'static, str>> {
        if let Some(dir) = &self.overrides {
            let path = dir.join(artifact.file_name());
            match fs::read_to_string(&path) {
                Ok(txt) => {
                    stage_log!(Level::Debug, "staging", "Using {} from {:?}", artifact.name(), path);
                    return Ok(Cow::Owned(txt));
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(IngestError::Artifact { name: artifact.name(), source }),
            }
        }
        Ok(Cow::Borrowed(artifact.embedded()))
    }
}
