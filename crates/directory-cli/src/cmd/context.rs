//! Shared command context.
//!
//! Groups the loaded configuration and the database handle every command
//! needs.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use directory_core::{DirectoryConfig, DirectoryQueryService, EventChannel, IngestionPipeline};

use crate::DbHandle;

/// State shared by all subcommands.
#[derive(Clone)]
pub struct Context {
    /// Loaded configuration with command line overrides applied
    pub config: DirectoryConfig,
    /// Database actor
    pub db: Arc<DbHandle>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Load configuration and open the database
    pub fn open(
        config_path: Option<&Path>,
        database: Option<&Path>,
        artifacts_base_url: Option<&str>,
    ) -> Result<Self> {
        let mut config = DirectoryConfig::load(config_path).context("Failed to load configuration")?;
        if let Some(database) = database {
            config.database_path = Some(database.to_path_buf());
        }
        if let Some(url) = artifacts_base_url {
            config.artifacts_base_url = url.to_string();
        }
        let path = config
            .database_path()
            .context("No database path configured and no data directory available")?;
        let db = DbHandle::spawn(&path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Ok(Self {
            config,
            db: Arc::new(db),
        })
    }

    /// Query service over the database; needs the artifacts base URL
    pub fn service(&self) -> Result<DirectoryQueryService<DbHandle>> {
        self.config.require_artifacts_base_url()?;
        Ok(DirectoryQueryService::new(
            self.db.clone(),
            self.db.clone(),
            self.config.clone(),
        ))
    }

    /// Ingestion pipeline writing to the database
    pub fn pipeline<C: EventChannel>(&self, channel: Arc<C>) -> IngestionPipeline<DbHandle, C> {
        IngestionPipeline::new(self.db.clone(), channel)
    }
}
