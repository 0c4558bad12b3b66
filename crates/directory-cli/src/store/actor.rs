//! DB Actor - Thread-safe access to SQLite
//!
//! SQLite connections are not `Sync`, so the connection lives on a dedicated
//! thread and every request travels there as a message.

use std::fmt;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use async_trait::async_trait;
use directory_core::store::{Store, StoreError, StoreTxn};
use directory_core::usage::{UsageEvent, UsageRecorder};
use directory_schema::App;
use tokio::sync::oneshot;

use super::db::{DbError, DirectoryDb, UsageCount};

type ReadJob = Box<dyn FnOnce(&DirectoryDb) + Send>;

/// Events that can be sent to the DB actor
pub enum DbEvent {
    /// Run a closure inside a read transaction
    Read {
        /// Runs against the database on the actor thread
        job: ReadJob,
    },
    /// Replace an app aggregate
    ReplaceApp {
        /// The new aggregate
        app: Box<App>,
        /// Completion
        resp: oneshot::Sender<Result<(), DbError>>,
    },
    /// Append a usage event
    RecordUsage {
        /// Event to store
        event: UsageEvent,
        /// Completion
        resp: oneshot::Sender<Result<(), DbError>>,
    },
    /// Aggregate usage counts
    UsageCounts {
        /// Aggregated counts
        resp: oneshot::Sender<Result<Vec<UsageCount>, DbError>>,
    },
    /// Shutdown the actor
    Shutdown,
}

impl fmt::Debug for DbEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { .. } => f.debug_struct("Read").finish_non_exhaustive(),
            Self::ReplaceApp { app, .. } => f
                .debug_struct("ReplaceApp")
                .field("app_id", &app.id)
                .finish_non_exhaustive(),
            Self::RecordUsage { event, .. } => f
                .debug_struct("RecordUsage")
                .field("event", event)
                .finish_non_exhaustive(),
            Self::UsageCounts { .. } => f.debug_struct("UsageCounts").finish_non_exhaustive(),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// A handle to the Database Actor that is Send + Sync and Clone.
#[derive(Clone)]
pub struct DbHandle {
    sender: mpsc::Sender<DbEvent>,
}

impl fmt::Debug for DbHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbHandle").finish_non_exhaustive()
    }
}

impl DbHandle {
    /// Open the database at `path` and spawn its actor thread
    pub fn spawn(path: &Path) -> Result<Self, DbError> {
        let (sender, receiver) = mpsc::channel();
        let db = DirectoryDb::open_at(path)?;
        tracing::debug!(path = %path.display(), "opened directory database");

        thread::spawn(move || {
            run_db_event_loop(db, receiver);
        });

        Ok(Self { sender })
    }

    /// Helper to send a request and wait for the response
    async fn request<T, F>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(oneshot::Sender<Result<T, DbError>>) -> DbEvent,
    {
        let (tx, rx) = oneshot::channel();
        self.sender.send(f(tx)).map_err(|_| DbError::ActorDied)?;
        rx.await.map_err(|_| DbError::ActorDied)?
    }

    /// Usage counts grouped by day, kind and app
    pub async fn usage_counts(&self) -> Result<Vec<UsageCount>, DbError> {
        self.request(|resp| DbEvent::UsageCounts { resp }).await
    }

    /// Stop the actor once queued requests are handled
    pub fn shutdown(&self) {
        let _ = self.sender.send(DbEvent::Shutdown);
    }
}

#[async_trait]
impl Store for DbHandle {
    async fn read<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn StoreTxn) -> Result<T, StoreError> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: ReadJob = Box::new(move |db| {
            let _ = tx.send(db.read(f));
        });
        self.sender
            .send(DbEvent::Read { job })
            .map_err(|_| StoreError::Closed)?;
        rx.await.map_err(|_| StoreError::Closed)?
    }

    async fn replace_app(&self, app: &App) -> Result<(), StoreError> {
        let app = Box::new(app.clone());
        self.request(|resp| DbEvent::ReplaceApp { app, resp })
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl UsageRecorder for DbHandle {
    async fn record(&self, event: UsageEvent) -> Result<(), StoreError> {
        self.request(|resp| DbEvent::RecordUsage { event, resp })
            .await
            .map_err(Into::into)
    }
}

/// The actual event loop running in the background thread
// The db and receiver are moved into this thread so the actor owns them.
#[allow(clippy::needless_pass_by_value)]
fn run_db_event_loop(mut db: DirectoryDb, receiver: mpsc::Receiver<DbEvent>) {
    while let Ok(event) = receiver.recv() {
        match event {
            DbEvent::Read { job } => job(&db),
            DbEvent::ReplaceApp { app, resp } => {
                let _ = resp.send(db.replace_app(&app));
            }
            DbEvent::RecordUsage { event, resp } => {
                let _ = resp.send(db.record_usage(&event));
            }
            DbEvent::UsageCounts { resp } => {
                let _ = resp.send(db.usage_counts());
            }
            DbEvent::Shutdown => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use directory_schema::{Icon, Listing};
    use tempfile::tempdir;

    fn app(id: &str) -> App {
        App {
            id: id.into(),
            default_listing_language: "en".into(),
            listings: vec![Listing {
                app_id: id.into(),
                language: "en".into(),
                name: "Example".into(),
                short_description: "An app".into(),
                icon: Icon {
                    object_id: "icon".into(),
                },
            }],
            release_channels: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_store_through_actor() {
        let dir = tempdir().unwrap();
        let handle = DbHandle::spawn(&dir.path().join("directory.db")).unwrap();

        handle.replace_app(&app("com.example")).await.unwrap();
        let languages = handle
            .read(|txn| txn.get_listing_languages("com.example"))
            .await
            .unwrap();
        assert_eq!(languages.into_iter().collect::<Vec<_>>(), vec!["en"]);
    }

    #[tokio::test]
    async fn test_requests_after_shutdown_fail_as_closed() {
        let dir = tempdir().unwrap();
        let handle = DbHandle::spawn(&dir.path().join("directory.db")).unwrap();
        handle.shutdown();

        let err = handle.replace_app(&app("com.example")).await.unwrap_err();
        assert!(matches!(err, StoreError::Closed));
    }
}
