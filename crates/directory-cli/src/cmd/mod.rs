//! Subcommand implementations

pub mod context;
pub mod ingest;
pub mod query;
pub mod stats;
