//! directory - App directory ingestion and queries
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Consumes app publication events into a SQLite database and answers
//! listing, download and update queries against it.
//!
//! # Architecture
//!
//! - **Actor Pattern**: Database access is serialized through `DbHandle`,
//!   which implements both the core `Store` and `UsageRecorder` seams.
//! - **JSON Lines transport**: `JsonLinesChannel` reads publication events
//!   from a file or stdin and writes confirmations and dead letters as lines.

pub mod channel;
pub mod cmd;
pub mod store;

pub use crate::channel::JsonLinesChannel;
pub use crate::store::DbHandle;
pub use crate::store::db;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command line of the `directory` binary
#[derive(Debug, Parser)]
#[command(name = "directory")]
#[command(author, version, about = "directory - ingest and query the app directory")]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, env = "DIRECTORY_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database path, overriding the configuration
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Base URL of artifact downloads, overriding the configuration
    #[arg(long, global = true)]
    pub artifacts_base_url: Option<String>,

    /// Print responses as JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Consume publication events from a JSON Lines stream
    Consume {
        /// Input file, or '-' for stdin
        #[arg(default_value = "-")]
        input: PathBuf,
        /// Where confirmations are written (default: stdout)
        #[arg(long)]
        confirmations: Option<PathBuf>,
        /// Where dead letters are written (default: stderr)
        #[arg(long)]
        dead_letters: Option<PathBuf>,
        /// Messages handled per batch
        #[arg(long, default_value_t = 16)]
        batch_size: usize,
    },
    /// Publish a single event from a JSON file
    Publish {
        /// Event file
        event: PathBuf,
    },
    /// Show the listing of an app
    Listing {
        /// App ID
        app_id: String,
        /// Device and language options
        #[command(flatten)]
        query: QueryArgs,
    },
    /// List app listings page by page
    List {
        /// Listings per page
        #[arg(long)]
        page_size: Option<u32>,
        /// Listings to skip
        #[arg(long)]
        skip: Option<u32>,
        /// Token from a previous page
        #[arg(long)]
        page_token: Option<String>,
        /// Include version names and download sizes
        #[arg(long)]
        full: bool,
        /// Device and language options
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Show which splits a device downloads for an app
    DownloadInfo {
        /// App ID
        app_id: String,
        /// Installed version code, when updating
        #[arg(long)]
        base_version_code: Option<u32>,
        /// Device and language options
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Check whether an app has an update
    UpdateInfo {
        /// App ID
        app_id: String,
        /// Installed version code
        #[arg(long)]
        base_version_code: u32,
        /// Device and language options
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Show recorded usage counts
    Stats,
}

/// Request options shared by the query commands
#[derive(Debug, Clone, Default, clap::Args)]
pub struct QueryArgs {
    /// Device attributes (JSON file)
    #[arg(long)]
    pub device: Option<PathBuf>,
    /// Preferred listing languages, most preferred first
    #[arg(long = "language", value_delimiter = ',')]
    pub languages: Vec<String>,
    /// Two-letter country code of the request
    #[arg(long)]
    pub country: Option<String>,
}
