#![forbid(unsafe_code)]

//! Command-line front-end utilities.
//!
//! Reads node and edge CSV files into a [`crate::bulk::QueryBuffer`] and sends the
//! resulting bulk commands.

/// CSV import.
pub mod import;

pub use import::{
    run_import, run_import_with_progress, EdgeImportConfig, ImportConfig, ImportError,
    ImportSummary, NodeImportConfig,
};
