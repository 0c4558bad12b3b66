//! SQLite directory database
//!
//! Stores app aggregates and usage events.

use std::collections::BTreeSet;
use std::path::Path;

use directory_core::store::{AppSummary, StoreError, StoreTxn};
use directory_core::usage::UsageEvent;
use directory_schema::{App, Icon, Listing, ReleaseChannel, SplitArtifact};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLite failed
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A usage event could not be serialized
    #[error("failed to encode usage event: {0}")]
    Encode(#[from] serde_json::Error),

    /// The database directory could not be created
    #[error("failed to create database directory: {0}")]
    Io(#[from] std::io::Error),

    /// The actor thread has stopped
    #[error("database actor is no longer running")]
    ActorDied,
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ActorDied => Self::Closed,
            other => Self::Backend(other.to_string()),
        }
    }
}

/// Usage counts for one day, kind and app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageCount {
    /// Day of the events, `YYYY-MM-DD`
    pub date: String,
    /// Event kind, e.g. `listing_view`
    pub kind: String,
    /// App the events concern
    pub app_id: String,
    /// Number of events
    pub count: u64,
}

/// The directory database
#[derive(Debug)]
pub struct DirectoryDb {
    conn: Connection,
}

impl DirectoryDb {
    /// Open or create the database at `path`, creating parent directories
    pub fn open_at(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        // WAL lets readers proceed while an app is being replaced
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS apps (
                id TEXT PRIMARY KEY,
                default_listing_language TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS listings (
                app_id TEXT NOT NULL REFERENCES apps(id) ON DELETE CASCADE,
                language TEXT NOT NULL,
                name TEXT NOT NULL,
                short_description TEXT NOT NULL,
                icon_object_id TEXT NOT NULL,
                PRIMARY KEY (app_id, language)
            );

            CREATE TABLE IF NOT EXISTS release_channels (
                app_id TEXT NOT NULL REFERENCES apps(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                version_code INTEGER NOT NULL,
                version_name TEXT NOT NULL,
                manifest BLOB NOT NULL,
                PRIMARY KEY (app_id, name)
            );

            CREATE TABLE IF NOT EXISTS split_artifacts (
                app_id TEXT NOT NULL,
                release_channel TEXT NOT NULL,
                id TEXT NOT NULL,
                uncompressed_size INTEGER NOT NULL,
                PRIMARY KEY (app_id, release_channel, id),
                FOREIGN KEY (app_id, release_channel)
                    REFERENCES release_channels(app_id, name) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_split_artifacts_id ON split_artifacts(id);

            CREATE TABLE IF NOT EXISTS usage_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                kind TEXT NOT NULL,
                app_id TEXT NOT NULL,
                payload TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_usage_events_date ON usage_events(date);
            ",
        )?;
        Ok(())
    }

    /// Delete everything stored for `app.id` and insert `app`, atomically
    pub fn replace_app(&mut self, app: &App) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM split_artifacts WHERE app_id = ?1", params![app.id])?;
        tx.execute("DELETE FROM release_channels WHERE app_id = ?1", params![app.id])?;
        tx.execute("DELETE FROM listings WHERE app_id = ?1", params![app.id])?;
        tx.execute("DELETE FROM apps WHERE id = ?1", params![app.id])?;

        tx.execute(
            "INSERT INTO apps (id, default_listing_language) VALUES (?1, ?2)",
            params![app.id, app.default_listing_language],
        )?;
        for listing in &app.listings {
            tx.execute(
                "INSERT INTO listings (app_id, language, name, short_description, icon_object_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    app.id,
                    listing.language,
                    listing.name,
                    listing.short_description,
                    listing.icon.object_id
                ],
            )?;
        }
        for channel in &app.release_channels {
            tx.execute(
                "INSERT INTO release_channels (app_id, name, version_code, version_name, manifest)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    app.id,
                    channel.name,
                    channel.version_code,
                    channel.version_name,
                    channel.manifest
                ],
            )?;
            for artifact in &channel.artifacts {
                tx.execute(
                    "INSERT INTO split_artifacts (app_id, release_channel, id, uncompressed_size)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![app.id, channel.name, artifact.id, artifact.uncompressed_size],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Run `f` inside a read transaction
    pub fn read<T>(
        &self,
        f: impl FnOnce(&dyn StoreTxn) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let tx = self.conn.unchecked_transaction().map_err(DbError::from)?;
        let result = f(&DbTxn { tx: &tx });
        // Nothing was written; dropping rolls back
        drop(tx);
        result
    }

    /// Append a usage event
    pub fn record_usage(&self, event: &UsageEvent) -> Result<(), DbError> {
        let (date, kind) = match event {
            UsageEvent::ListingView { date, .. } => (date, "listing_view"),
            UsageEvent::Download { date, .. } => (date, "download"),
            UsageEvent::UpdateCheck { date, .. } => (date, "update_check"),
        };
        self.conn.execute(
            "INSERT INTO usage_events (date, kind, app_id, payload) VALUES (?1, ?2, ?3, ?4)",
            params![
                date.to_string(),
                kind,
                event.app_id(),
                serde_json::to_string(event)?
            ],
        )?;
        Ok(())
    }

    /// Usage counts grouped by day, kind and app
    pub fn usage_counts(&self) -> Result<Vec<UsageCount>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT date, kind, app_id, COUNT(*) FROM usage_events
             GROUP BY date, kind, app_id ORDER BY date, kind, app_id",
        )?;
        let counts = stmt.query_map([], |row| {
            Ok(UsageCount {
                date: row.get(0)?,
                kind: row.get(1)?,
                app_id: row.get(2)?,
                count: row.get(3)?,
            })
        })?;
        counts.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

struct DbTxn<'a> {
    tx: &'a Transaction<'a>,
}

fn backend(err: rusqlite::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

impl DbTxn<'_> {
    fn artifacts(&self, app_id: &str, channel: &str) -> Result<Vec<SplitArtifact>, StoreError> {
        let mut stmt = self
            .tx
            .prepare(
                "SELECT id, uncompressed_size FROM split_artifacts
                 WHERE app_id = ?1 AND release_channel = ?2 ORDER BY id",
            )
            .map_err(backend)?;
        let rows = stmt
            .query_map(params![app_id, channel], |row| {
                Ok(SplitArtifact {
                    id: row.get(0)?,
                    uncompressed_size: row.get(1)?,
                })
            })
            .map_err(backend)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(backend)
    }
}

impl StoreTxn for DbTxn<'_> {
    fn get_app(&self, id: &str) -> Result<Option<App>, StoreError> {
        let Some(default_listing_language) = self
            .tx
            .query_row(
                "SELECT default_listing_language FROM apps WHERE id = ?1",
                params![id],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(backend)?
        else {
            return Ok(None);
        };

        let mut listings = Vec::new();
        for language in self.get_listing_languages(id)? {
            listings.extend(self.get_listing(id, &language)?);
        }

        let names = {
            let mut stmt = self
                .tx
                .prepare("SELECT name FROM release_channels WHERE app_id = ?1 ORDER BY name")
                .map_err(backend)?;
            let rows = stmt
                .query_map(params![id], |row| row.get::<_, String>(0))
                .map_err(backend)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(backend)?
        };
        let mut release_channels = Vec::with_capacity(names.len());
        for name in names {
            release_channels.extend(self.get_release_channel(id, &name)?);
        }

        Ok(Some(App {
            id: id.to_string(),
            default_listing_language,
            listings,
            release_channels,
        }))
    }

    fn get_listing_languages(&self, app_id: &str) -> Result<BTreeSet<String>, StoreError> {
        let mut stmt = self
            .tx
            .prepare("SELECT language FROM listings WHERE app_id = ?1")
            .map_err(backend)?;
        let rows = stmt
            .query_map(params![app_id], |row| row.get::<_, String>(0))
            .map_err(backend)?;
        rows.collect::<Result<BTreeSet<_>, _>>().map_err(backend)
    }

    fn get_listing(&self, app_id: &str, language: &str) -> Result<Option<Listing>, StoreError> {
        self.tx
            .query_row(
                "SELECT name, short_description, icon_object_id FROM listings
                 WHERE app_id = ?1 AND language = ?2",
                params![app_id, language],
                |row| {
                    Ok(Listing {
                        app_id: app_id.to_string(),
                        language: language.to_string(),
                        name: row.get(0)?,
                        short_description: row.get(1)?,
                        icon: Icon {
                            object_id: row.get(2)?,
                        },
                    })
                },
            )
            .optional()
            .map_err(backend)
    }

    fn get_default_listing(&self, app_id: &str) -> Result<Option<Listing>, StoreError> {
        let language = self
            .tx
            .query_row(
                "SELECT default_listing_language FROM apps WHERE id = ?1",
                params![app_id],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(backend)?;
        match language {
            Some(language) => self.get_listing(app_id, &language),
            None => Ok(None),
        }
    }

    fn get_release_channel(
        &self,
        app_id: &str,
        name: &str,
    ) -> Result<Option<ReleaseChannel>, StoreError> {
        let channel = self
            .tx
            .query_row(
                "SELECT version_code, version_name, manifest FROM release_channels
                 WHERE app_id = ?1 AND name = ?2",
                params![app_id, name],
                |row| {
                    Ok(ReleaseChannel {
                        app_id: app_id.to_string(),
                        name: name.to_string(),
                        version_code: row.get(0)?,
                        version_name: row.get(1)?,
                        manifest: row.get(2)?,
                        artifacts: Vec::new(),
                    })
                },
            )
            .optional()
            .map_err(backend)?;
        match channel {
            Some(mut channel) => {
                channel.artifacts = self.artifacts(app_id, name)?;
                Ok(Some(channel))
            }
            None => Ok(None),
        }
    }

    fn get_split_artifacts(&self, ids: &[String]) -> Result<Vec<SplitArtifact>, StoreError> {
        let mut stmt = self
            .tx
            .prepare("SELECT DISTINCT id, uncompressed_size FROM split_artifacts WHERE id = ?1")
            .map_err(backend)?;
        let mut artifacts = Vec::with_capacity(ids.len());
        for id in ids {
            let rows = stmt
                .query_map(params![id], |row| {
                    Ok(SplitArtifact {
                        id: row.get(0)?,
                        uncompressed_size: row.get(1)?,
                    })
                })
                .map_err(backend)?;
            for artifact in rows {
                artifacts.push(artifact.map_err(backend)?);
            }
        }
        Ok(artifacts)
    }

    fn list_apps_page(
        &self,
        page_size: u32,
        skip: u32,
        after_id: Option<&str>,
    ) -> Result<Vec<AppSummary>, StoreError> {
        let mut stmt = self
            .tx
            .prepare(
                "SELECT id, default_listing_language FROM apps
                 WHERE ?1 IS NULL OR id > ?1
                 ORDER BY id LIMIT ?2 OFFSET ?3",
            )
            .map_err(backend)?;
        let rows = stmt
            .query_map(params![after_id, page_size, skip], |row| {
                Ok(AppSummary {
                    id: row.get(0)?,
                    default_listing_language: row.get(1)?,
                })
            })
            .map_err(backend)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(backend)
    }
}
