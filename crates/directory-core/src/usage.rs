//! Anonymous usage recording.
//!
//! Queries report what was viewed, downloaded or checked. Recording is
//! best-effort: a failing recorder is logged and never fails the query.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Whether a download is a fresh install or an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadKind {
    /// First install.
    Initial,
    /// Update of an installed version.
    Update,
}

impl DownloadKind {
    /// Canonical lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Update => "update",
        }
    }
}

/// A single usage event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UsageEvent {
    /// A listing was served.
    ListingView {
        /// UTC calendar date.
        date: NaiveDate,
        /// App whose listing was served.
        app_id: String,
        /// Language of the served listing.
        language: String,
        /// SDK level of the requesting device, if known.
        device_sdk_version: Option<u32>,
        /// Country of the request, if known.
        country_code: Option<String>,
    },
    /// Download information was served.
    Download {
        /// UTC calendar date.
        date: NaiveDate,
        /// Downloaded app.
        app_id: String,
        /// Version being downloaded.
        version_code: u32,
        /// Install or update.
        download_kind: DownloadKind,
        /// SDK level of the requesting device, if known.
        device_sdk_version: Option<u32>,
        /// Country of the request, if known.
        country_code: Option<String>,
    },
    /// An update check was answered.
    UpdateCheck {
        /// UTC calendar date.
        date: NaiveDate,
        /// Checked app.
        app_id: String,
        /// Canonical name of the checked channel.
        release_channel: String,
        /// SDK level of the requesting device, if known.
        device_sdk_version: Option<u32>,
        /// Country of the request, if known.
        country_code: Option<String>,
    },
}

impl UsageEvent {
    /// Today's date in UTC.
    pub fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    /// App the event is about.
    pub fn app_id(&self) -> &str {
        match self {
            Self::ListingView { app_id, .. }
            | Self::Download { app_id, .. }
            | Self::UpdateCheck { app_id, .. } => app_id,
        }
    }
}

/// Sink for usage events.
#[async_trait]
pub trait UsageRecorder: Send + Sync {
    /// Records one event.
    async fn record(&self, event: UsageEvent) -> Result<(), StoreError>;
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

#[async_trait]
impl UsageRecorder for NullRecorder {
    async fn record(&self, _event: UsageEvent) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    events: Mutex<Vec<UsageEvent>>,
}

impl MemoryRecorder {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far.
    pub fn events(&self) -> Vec<UsageEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl UsageRecorder for MemoryRecorder {
    async fn record(&self, event: UsageEvent) -> Result<(), StoreError> {
        self.events
            .lock()
            .map_err(|_| StoreError::Backend("usage recorder lock poisoned".into()))?
            .push(event);
        Ok(())
    }
}
