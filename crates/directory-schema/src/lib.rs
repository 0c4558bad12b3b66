//! Shared types and wire formats for the app directory.
//!
//! Nothing in this crate performs I/O; the core and the binary agree on
//! these shapes for stored entities, manifests, events and queries.

pub mod api;
pub mod app;
pub mod device;
pub mod events;
pub mod manifest;
pub mod page_token;
pub mod targeting;

// Re-exports
pub use app::*;
pub use device::DeviceAttributes;
pub use manifest::{Manifest, ManifestError};
pub use page_token::{PageToken, PageTokenError};
