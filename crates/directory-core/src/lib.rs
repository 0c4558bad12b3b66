//! Core of the app directory.
//!
//! Matches device attributes against split-APK manifests, ingests publication
//! events into a [`Store`] and answers the listing, download and update
//! queries. Persistence, transport and usage recording sit behind traits so
//! that the binary can plug in SQLite and file-based implementations.

pub mod channel;
pub mod compat;
pub mod config;
pub mod escape;
pub mod ingest;
pub mod locale;
pub mod planner;
pub mod select;
pub mod service;
pub mod status;
pub mod store;
pub mod usage;
pub mod validate;

pub use channel::{ChannelError, Delivery, EventChannel, MemoryChannel};
pub use config::DirectoryConfig;
pub use ingest::{BatchReport, IngestError, IngestionPipeline, PublishError};
pub use select::Selection;
pub use service::{DirectoryEndpoint, DirectoryQueryService};
pub use status::{Code, Status};
pub use store::{MemoryStore, Store, StoreError, StoreTxn};
pub use usage::{MemoryRecorder, NullRecorder, UsageEvent, UsageRecorder};
