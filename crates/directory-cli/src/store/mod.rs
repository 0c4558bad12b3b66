//! Persistence for the directory binary

pub mod actor;
pub mod db;

pub use actor::DbHandle;
