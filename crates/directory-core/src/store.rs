//! The persistence seam.
//!
//! Reads go through [`Store::read`], which runs a closure against a
//! [`StoreTxn`] inside one read transaction, so a query observes either the
//! old or the new version of an app, never a mix. Writes replace a whole app
//! aggregate at once.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::RwLock;

use async_trait::async_trait;
use directory_schema::{App, Listing, ReleaseChannel, SplitArtifact};
use thiserror::Error;

/// Errors raised by store implementations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend failed.
    #[error("store backend error: {0}")]
    Backend(String),

    /// The store's worker is gone.
    #[error("store is no longer running")]
    Closed,

    /// Stored data could not be read back.
    #[error("stored data is corrupt: {0}")]
    Corrupt(String),
}

/// An app ID with its default listing language, as returned by page scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSummary {
    /// Package identifier.
    pub id: String,
    /// Default listing language.
    pub default_listing_language: String,
}

/// Read operations available inside a transaction.
pub trait StoreTxn {
    /// The whole aggregate of an app.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend fails.
    fn get_app(&self, id: &str) -> Result<Option<App>, StoreError>;

    /// Languages the app has listings in; empty for unknown apps.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend fails.
    fn get_listing_languages(&self, app_id: &str) -> Result<BTreeSet<String>, StoreError>;

    /// The listing in exactly `language`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend fails.
    fn get_listing(&self, app_id: &str, language: &str) -> Result<Option<Listing>, StoreError>;

    /// The listing in the app's default listing language.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend fails.
    fn get_default_listing(&self, app_id: &str) -> Result<Option<Listing>, StoreError>;

    /// The release channel with the given canonical name, artifacts included.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend fails.
    fn get_release_channel(
        &self,
        app_id: &str,
        name: &str,
    ) -> Result<Option<ReleaseChannel>, StoreError>;

    /// Artifacts with the given object IDs. Unknown IDs are skipped.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend fails.
    fn get_split_artifacts(&self, ids: &[String]) -> Result<Vec<SplitArtifact>, StoreError>;

    /// Up to `page_size` apps in ascending ID order, strictly after `after_id`
    /// when given, skipping the first `skip`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend fails.
    fn list_apps_page(
        &self,
        page_size: u32,
        skip: u32,
        after_id: Option<&str>,
    ) -> Result<Vec<AppSummary>, StoreError>;
}

/// Durable storage of app aggregates.
#[async_trait]
pub trait Store: Send + Sync {
    /// Runs `f` inside a single read transaction.
    async fn read<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn StoreTxn) -> Result<T, StoreError> + Send + 'static;

    /// Atomically deletes everything stored for `app.id` and inserts `app`.
    async fn replace_app(&self, app: &App) -> Result<(), StoreError>;
}

/// A [`Store`] kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    apps: RwLock<BTreeMap<String, App>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored apps.
    pub fn len(&self) -> usize {
        self.apps.read().map(|apps| apps.len()).unwrap_or_default()
    }

    /// Whether the store holds no apps.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct MemoryTxn<'a> {
    apps: &'a BTreeMap<String, App>,
}

impl StoreTxn for MemoryTxn<'_> {
    fn get_app(&self, id: &str) -> Result<Option<App>, StoreError> {
        Ok(self.apps.get(id).cloned())
    }

    fn get_listing_languages(&self, app_id: &str) -> Result<BTreeSet<String>, StoreError> {
        Ok(self
            .apps
            .get(app_id)
            .map(|app| app.listings.iter().map(|l| l.language.clone()).collect())
            .unwrap_or_default())
    }

    fn get_listing(&self, app_id: &str, language: &str) -> Result<Option<Listing>, StoreError> {
        Ok(self
            .apps
            .get(app_id)
            .and_then(|app| app.listing(language))
            .cloned())
    }

    fn get_default_listing(&self, app_id: &str) -> Result<Option<Listing>, StoreError> {
        Ok(self
            .apps
            .get(app_id)
            .and_then(App::default_listing)
            .cloned())
    }

    fn get_release_channel(
        &self,
        app_id: &str,
        name: &str,
    ) -> Result<Option<ReleaseChannel>, StoreError> {
        Ok(self
            .apps
            .get(app_id)
            .and_then(|app| app.release_channel(name))
            .cloned())
    }

    fn get_split_artifacts(&self, ids: &[String]) -> Result<Vec<SplitArtifact>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.apps
                    .values()
                    .flat_map(|app| app.release_channels.iter())
                    .flat_map(|channel| channel.artifacts.iter())
                    .find(|artifact| artifact.id == *id)
                    .cloned()
            })
            .collect())
    }

    fn list_apps_page(
        &self,
        page_size: u32,
        skip: u32,
        after_id: Option<&str>,
    ) -> Result<Vec<AppSummary>, StoreError> {
        let apps: Box<dyn Iterator<Item = &App> + '_> = match after_id {
            Some(after) => Box::new(
                self.apps
                    .range::<str, _>((Bound::Excluded(after), Bound::Unbounded))
                    .map(|(_, app)| app),
            ),
            None => Box::new(self.apps.values()),
        };
        Ok(apps
            .skip(skip as usize)
            .take(page_size as usize)
            .map(|app| AppSummary {
                id: app.id.clone(),
                default_listing_language: app.default_listing_language.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn read<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn StoreTxn) -> Result<T, StoreError> + Send + 'static,
    {
        let apps = self
            .apps
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))?;
        f(&MemoryTxn { apps: &apps })
    }

    async fn replace_app(&self, app: &App) -> Result<(), StoreError> {
        let mut apps = self
            .apps
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))?;
        apps.insert(app.id.clone(), app.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use directory_schema::Icon;

    fn app(id: &str) -> App {
        App {
            id: id.into(),
            default_listing_language: "en".into(),
            listings: vec![Listing {
                app_id: id.into(),
                language: "en".into(),
                name: id.into(),
                short_description: "test".into(),
                icon: Icon {
                    object_id: format!("{id}-icon"),
                },
            }],
            release_channels: vec![ReleaseChannel {
                app_id: id.into(),
                name: "well_known_stable".into(),
                version_code: 1,
                version_name: "1.0".into(),
                manifest: Vec::new(),
                artifacts: vec![SplitArtifact {
                    id: format!("{id}-base"),
                    uncompressed_size: 10,
                }],
            }],
        }
    }

    async fn store_with(ids: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        for id in ids {
            store.replace_app(&app(id)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_replace_is_delete_then_insert() {
        let store = store_with(&["com.a"]).await;
        let mut replacement = app("com.a");
        replacement.listings[0].name = "renamed".into();
        store.replace_app(&replacement).await.unwrap();

        assert_eq!(store.len(), 1);
        let stored = store.read(|txn| txn.get_app("com.a")).await.unwrap();
        assert_eq!(stored, Some(replacement));
    }

    #[tokio::test]
    async fn test_page_scan() {
        let store = store_with(&["com.c", "com.a", "com.b", "com.d"]).await;
        let page = store
            .read(|txn| txn.list_apps_page(2, 0, None))
            .await
            .unwrap();
        assert_eq!(
            page.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(),
            vec!["com.a", "com.b"]
        );

        let page = store
            .read(|txn| txn.list_apps_page(2, 1, Some("com.a")))
            .await
            .unwrap();
        assert_eq!(
            page.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(),
            vec!["com.c", "com.d"]
        );
    }

    #[tokio::test]
    async fn test_lookups() {
        let store = store_with(&["com.a", "com.b"]).await;
        let (languages, listing, artifacts) = store
            .read(|txn| {
                Ok((
                    txn.get_listing_languages("com.a")?,
                    txn.get_default_listing("com.b")?,
                    txn.get_split_artifacts(&["com.b-base".to_string(), "nope".to_string()])?,
                ))
            })
            .await
            .unwrap();
        assert_eq!(languages.into_iter().collect::<Vec<_>>(), vec!["en"]);
        assert_eq!(listing.unwrap().app_id, "com.b");
        assert_eq!(artifacts.len(), 1);
        assert!(store.read(|txn| txn.get_listing("com.a", "de")).await.unwrap().is_none());
    }
}
