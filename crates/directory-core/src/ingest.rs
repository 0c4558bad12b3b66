//! Publication ingestion.
//!
//! Consumes publication requests from an [`EventChannel`], validates them,
//! replaces the stored app aggregate and confirms the publication. Replaying a
//! request is harmless: the aggregate is replaced wholesale every time.

use std::sync::Arc;

use directory_schema::events::{
    AppEditPayload, AppEditPublished, AppPayload, AppPublished, ImagePayload, InboundEvent,
    ListingPayload, ObjectMetadata, OutboundEvent, PackageMetadata, PackageMetadataEntry,
};
use directory_schema::{App, Manifest, ManifestError, ReleaseChannelRef};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::channel::{ChannelError, Delivery, EventChannel};
use crate::store::{Store, StoreError};
use crate::validate::{self, ValidationError};

/// Failure to publish a single event.
#[derive(Error, Debug)]
pub enum PublishError {
    /// The event violates a structural rule; it will never succeed.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Storing the app failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The stored app could not be turned back into a confirmation.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The confirmation could not be emitted.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Failure of the consumption loop; unacknowledged messages stay with the
/// transport.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Storing an app failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stored manifest could not be decoded.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The transport failed.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Counts of handled messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Messages applied and confirmed.
    pub published: usize,
    /// Messages dead-lettered.
    pub rejected: usize,
}

impl std::ops::AddAssign for BatchReport {
    fn add_assign(&mut self, other: Self) {
        self.published += other.published;
        self.rejected += other.rejected;
    }
}

/// Applies publication events to a [`Store`] and confirms them on an
/// [`EventChannel`].
#[derive(Debug)]
pub struct IngestionPipeline<S, C> {
    store: Arc<S>,
    channel: Arc<C>,
}

impl<S: Store, C: EventChannel> IngestionPipeline<S, C> {
    /// A pipeline over the given collaborators.
    pub fn new(store: Arc<S>, channel: Arc<C>) -> Self {
        Self { store, channel }
    }

    /// Validates and applies one event, then emits its confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Invalid`] for events that can never be applied,
    /// and the other variants for collaborator failures.
    pub async fn publish(&self, event: &InboundEvent) -> Result<OutboundEvent, PublishError> {
        let confirmation = match event {
            InboundEvent::AppPublicationRequested(requested) => {
                let app = validate::validate_publication(requested)?;
                self.store.replace_app(&app).await?;
                OutboundEvent::AppPublished(AppPublished {
                    app: confirmation_payload(&app)?,
                })
            }
            InboundEvent::AppEditPublicationRequested(requested) => {
                let (edit_id, app) = validate::validate_edit_publication(requested)?;
                self.store.replace_app(&app).await?;
                OutboundEvent::AppEditPublished(AppEditPublished {
                    edit: AppEditPayload {
                        id: Some(edit_id),
                        app: Some(confirmation_payload(&app)?),
                    },
                })
            }
        };

        self.channel.publish(&confirmation).await?;
        info!(app_id = confirmation.app_id(), "published app");
        Ok(confirmation)
    }

    /// Handles one batch. Every message is decoded and validated on its own;
    /// bad ones are dead-lettered, good ones applied in order.
    ///
    /// # Errors
    ///
    /// Stops at the first collaborator failure, leaving the failing message
    /// and the rest of the batch unacknowledged.
    pub async fn process_batch(&self, batch: &[Delivery]) -> Result<BatchReport, IngestError> {
        let mut report = BatchReport::default();
        for delivery in batch {
            let event = match delivery.decode() {
                Ok(event) => event,
                Err(err) => {
                    self.reject(delivery, &format!("malformed event: {err}")).await?;
                    report.rejected += 1;
                    continue;
                }
            };

            match self.publish(&event).await {
                Ok(_) => {
                    self.channel.ack(delivery).await?;
                    report.published += 1;
                }
                Err(PublishError::Invalid(err)) => {
                    self.reject(delivery, &err.to_string()).await?;
                    report.rejected += 1;
                }
                Err(PublishError::Store(err)) => return Err(err.into()),
                Err(PublishError::Manifest(err)) => return Err(err.into()),
                Err(PublishError::Channel(err)) => return Err(err.into()),
            }
        }
        Ok(report)
    }

    /// Consumes batches until the channel reports no more messages.
    ///
    /// # Errors
    ///
    /// Returns the first collaborator failure.
    pub async fn run(&self) -> Result<BatchReport, IngestError> {
        let mut total = BatchReport::default();
        loop {
            let batch = self.channel.next_batch().await?;
            if batch.is_empty() {
                debug!(?total, "event stream drained");
                return Ok(total);
            }
            total += self.process_batch(&batch).await?;
        }
    }

    async fn reject(&self, delivery: &Delivery, reason: &str) -> Result<(), ChannelError> {
        warn!(delivery = delivery.id, reason, "dead-lettering message");
        self.channel.dead_letter(delivery, reason).await?;
        self.channel.ack(delivery).await
    }
}

/// Rebuilds the event form of a stored app for its confirmation.
///
/// # Errors
///
/// Returns a [`ManifestError`] if a stored manifest cannot be decoded.
pub fn confirmation_payload(app: &App) -> Result<AppPayload, ManifestError> {
    let listings = app
        .listings
        .iter()
        .map(|listing| ListingPayload {
            language: Some(listing.language.clone()),
            name: Some(listing.name.clone()),
            short_description: Some(listing.short_description.clone()),
            icon: Some(ImagePayload {
                object_id: Some(listing.icon.object_id.clone()),
            }),
        })
        .collect();

    let package_metadata = app
        .release_channels
        .iter()
        .map(|channel| {
            Ok(PackageMetadataEntry {
                release_channel: ReleaseChannelRef::from_canonical_form(&channel.name),
                package_metadata: PackageMetadata {
                    version_code: channel.version_code,
                    version_name: channel.version_name.clone(),
                    manifest: Manifest::from_bytes(&channel.manifest)?,
                    object_metadata: channel
                        .artifacts
                        .iter()
                        .map(|artifact| {
                            (artifact.id.clone(), ObjectMetadata {
                                uncompressed_size: Some(artifact.uncompressed_size),
                            })
                        })
                        .collect(),
                },
            })
        })
        .collect::<Result<Vec<_>, ManifestError>>()?;

    Ok(AppPayload {
        app_id: Some(app.id.clone()),
        default_listing_language: Some(app.default_listing_language.clone()),
        listings,
        package_metadata,
    })
}
