// src/db/mod.rs
//! Analytical store: connection handle, SQL artifacts, staging loader, merge
//! engine and watermark queries.

pub mod artifacts;
pub mod connection;
pub mod merge;
pub mod staging;
pub mod watermark;

pub use artifacts::{Artifact, SqlCatalog};
pub use connection::Warehouse;
pub use merge::{MergeOutcome, MergePolicy};
pub use watermark::{Relation, Watermark};
