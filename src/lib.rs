// src/lib.rs
// ────────────────────────────────────────────────────────────────────────────
// Public library entry point.  Re-export everything for both `main.rs` and
// integration tests.

mod macros;

pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod remote;
pub mod report;

pub use error::{IngestError, Stage};
pub use pipeline::{run, run_with};
pub use report::RunReport;
