//! The directory query operations.
//!
//! Each operation validates its request and fetches what it needs in a single
//! read transaction. Download info selects splits inside that transaction so
//! the artifact lookup sees the same snapshot of the app.

use std::sync::Arc;

use async_trait::async_trait;
use directory_schema::api::{
    AppListing, AppListingView, Compatibility, DownloadSize, GetAppDownloadInfoRequest,
    GetAppDownloadInfoResponse, GetAppListingRequest, GetAppListingResponse, GetUpdateInfoRequest,
    GetUpdateInfoResponse, Image, ListAppListingsRequest, ListAppListingsResponse, UpdateInfo,
};
use directory_schema::{
    DeviceAttributes, Listing, Manifest, PageToken, RELEASE_CHANNEL_NAME_STABLE, ReleaseChannel,
};
use tracing::{debug, warn};

use crate::config::DirectoryConfig;
use crate::planner::{self, ArtifactUrls};
use crate::select::{self, Selection};
use crate::status::Status;
use crate::store::{Store, StoreTxn};
use crate::usage::{DownloadKind, UsageEvent, UsageRecorder};
use crate::{escape, locale};

/// The four query operations with typed requests and responses.
#[async_trait]
pub trait DirectoryEndpoint: Send + Sync {
    /// Best listing of one app, with compatibility when a device is given.
    async fn get_app_listing(
        &self,
        request: GetAppListingRequest,
    ) -> Result<GetAppListingResponse, Status>;

    /// A page of listings in ascending app ID order.
    async fn list_app_listings(
        &self,
        request: ListAppListingsRequest,
    ) -> Result<ListAppListingsResponse, Status>;

    /// The splits a device must download.
    async fn get_app_download_info(
        &self,
        request: GetAppDownloadInfoRequest,
    ) -> Result<GetAppDownloadInfoResponse, Status>;

    /// Whether a newer version than the installed one exists.
    async fn get_update_info(
        &self,
        request: GetUpdateInfoRequest,
    ) -> Result<GetUpdateInfoResponse, Status>;
}

/// Serves queries from a [`Store`].
pub struct DirectoryQueryService<S> {
    store: Arc<S>,
    recorder: Arc<dyn UsageRecorder>,
    urls: ArtifactUrls,
    config: DirectoryConfig,
}

impl<S> std::fmt::Debug for DirectoryQueryService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryQueryService")
            .field("urls", &self.urls)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: Store> DirectoryQueryService<S> {
    /// A service reading from `store` and reporting usage to `recorder`.
    pub fn new(store: Arc<S>, recorder: Arc<dyn UsageRecorder>, config: DirectoryConfig) -> Self {
        Self {
            store,
            recorder,
            urls: ArtifactUrls::new(config.artifacts_base_url.clone()),
            config,
        }
    }

    async fn record(&self, event: UsageEvent) {
        if let Err(err) = self.recorder.record(event).await {
            warn!(%err, "failed to record usage event");
        }
    }

    fn app_listing(&self, listing: Listing) -> AppListing {
        AppListing {
            icon: Image {
                url: self.urls.object_url(&listing.icon.object_id),
            },
            app_id: listing.app_id,
            language: listing.language,
            name: listing.name,
            short_description: listing.short_description,
            version_name: None,
            compatibility: None,
            download_size: None,
        }
    }

    /// Compatibility and, when compatible, the download size.
    fn compatibility(
        &self,
        channel: &ReleaseChannel,
        device: &DeviceAttributes,
    ) -> Result<(Compatibility, Option<DownloadSize>), Status> {
        match select_splits(channel, device)? {
            Selection::Compatible(paths) => {
                let plan = planner::plan(&paths, &channel.artifacts, &self.urls)?;
                Ok((
                    Compatibility::from_compatible(true),
                    Some(DownloadSize {
                        uncompressed_total: plan.download_size,
                    }),
                ))
            }
            Selection::Incompatible => Ok((Compatibility::from_compatible(false), None)),
        }
    }
}

/// Decodes the channel's manifest and selects the device's splits.
///
/// # Errors
///
/// Returns an `INTERNAL` status if the stored manifest is not valid.
pub fn select_splits(
    channel: &ReleaseChannel,
    device: &DeviceAttributes,
) -> Result<Selection, Status> {
    let mut manifest = Manifest::from_bytes(&channel.manifest)?;
    escape::escape_manifest(&mut manifest);
    let selection = select::select(&manifest, device);
    Ok(escape::unescape_selection(selection)?)
}

/// Preference list for listing languages: the request's, else the device's.
fn preferred_languages(requested: Vec<String>, device: Option<&DeviceAttributes>) -> Vec<String> {
    if requested.is_empty() {
        device
            .map(|device| device.supported_locales.clone())
            .unwrap_or_default()
    } else {
        requested
    }
}

/// Looks up the best listing and the channel of one app.
fn find_listing(
    txn: &dyn StoreTxn,
    app_id: &str,
    channel_name: &str,
    preferred: &[String],
) -> Result<Result<(Listing, ReleaseChannel), Status>, crate::store::StoreError> {
    let languages = txn.get_listing_languages(app_id)?;
    let channel = txn.get_release_channel(app_id, channel_name)?;
    if languages.is_empty() {
        return Ok(Err(match channel {
            None => Status::not_found(format!("app with ID {app_id} not found")),
            Some(_) => Status::internal(format!("app with ID {app_id} has no listings")),
        }));
    }
    let Some(default) = txn.get_default_listing(app_id)? else {
        return Ok(Err(Status::internal(format!(
            "app with ID {app_id} has no listing in its default language"
        ))));
    };
    let Some(channel) = channel else {
        return Ok(Err(Status::internal(format!(
            "app with ID {app_id} has no release channels"
        ))));
    };

    let language = locale::best_match(&default.language, &languages, preferred);
    if language == default.language {
        return Ok(Ok((default, channel)));
    }
    match txn.get_listing(app_id, language)? {
        Some(listing) => Ok(Ok((listing, channel))),
        None => Ok(Err(Status::internal(format!(
            "app with ID {app_id} has no listing for language {language}"
        )))),
    }
}

#[async_trait]
impl<S: Store> DirectoryEndpoint for DirectoryQueryService<S> {
    async fn get_app_listing(
        &self,
        request: GetAppListingRequest,
    ) -> Result<GetAppListingResponse, Status> {
        let app_id = request
            .app_id
            .ok_or_else(|| Status::invalid_argument("app ID is missing but required"))?;
        let channel_name = request.release_channel.unwrap_or_default().canonical_form();
        let device = request.device_attributes;
        let preferred = preferred_languages(request.preferred_languages, device.as_ref());

        let id = app_id.clone();
        let (listing, channel) = self
            .store
            .read(move |txn| find_listing(txn, &id, channel_name, &preferred))
            .await??;
        debug!(%app_id, language = %listing.language, "selected listing");

        let language = listing.language.clone();
        let mut app_listing = self.app_listing(listing);
        app_listing.version_name = Some(channel.version_name.clone());
        if let Some(device) = &device {
            let (compatibility, download_size) = self.compatibility(&channel, device)?;
            app_listing.compatibility = Some(compatibility);
            app_listing.download_size = download_size;
        }

        self.record(UsageEvent::ListingView {
            date: UsageEvent::today(),
            app_id,
            language,
            device_sdk_version: device.as_ref().and_then(|d| d.sdk_version),
            country_code: request.country_code,
        })
        .await;

        Ok(GetAppListingResponse {
            listing: app_listing,
        })
    }

    async fn list_app_listings(
        &self,
        request: ListAppListingsRequest,
    ) -> Result<ListAppListingsResponse, Status> {
        let page_size = self.config.page_size(request.page_size);
        let skip = request.skip.unwrap_or(0);
        let after = request
            .page_token
            .as_deref()
            .map(PageToken::decode)
            .transpose()
            .map_err(|err| {
                debug!(%err, "rejected page token");
                Status::invalid_argument("provided page token is invalid")
            })?;
        let view = request.view.unwrap_or_default();
        let device = request.device_attributes;
        let preferred = preferred_languages(request.preferred_languages, device.as_ref());

        let (last_scanned, entries) = self
            .store
            .read(move |txn| {
                let apps = txn.list_apps_page(page_size, skip, after.as_deref())?;
                let last_scanned = apps.last().map(|app| app.id.clone());
                let mut entries = Vec::with_capacity(apps.len());
                for app in &apps {
                    match find_listing(txn, &app.id, RELEASE_CHANNEL_NAME_STABLE, &preferred)? {
                        Ok(entry) => entries.push(entry),
                        Err(status) => return Ok(Err(status)),
                    }
                }
                Ok(Ok((last_scanned, entries)))
            })
            .await??;

        let mut listings = Vec::with_capacity(entries.len());
        for (listing, channel) in entries {
            let mut app_listing = self.app_listing(listing);
            if view == AppListingView::Full {
                app_listing.version_name = Some(channel.version_name.clone());
            }
            if let Some(device) = &device {
                let (compatibility, download_size) = self.compatibility(&channel, device)?;
                if !compatibility.is_compatible() {
                    debug!(app_id = %app_listing.app_id, "filtered incompatible app");
                    continue;
                }
                app_listing.compatibility = Some(compatibility);
                if view == AppListingView::Full {
                    app_listing.download_size = download_size;
                }
            }
            listings.push(app_listing);
        }

        let next_page_token = last_scanned
            .map(|id| PageToken::after(id).encode())
            .transpose()
            .map_err(|err| Status::internal(err.to_string()))?;

        Ok(ListAppListingsResponse {
            listings,
            next_page_token,
        })
    }

    async fn get_app_download_info(
        &self,
        request: GetAppDownloadInfoRequest,
    ) -> Result<GetAppDownloadInfoResponse, Status> {
        let app_id = request
            .app_id
            .ok_or_else(|| Status::invalid_argument("app ID is missing but required"))?;
        let device = request
            .device_attributes
            .ok_or_else(|| Status::invalid_argument("device attributes are missing but required"))?;
        let channel_name = request.release_channel.unwrap_or_default().canonical_form();
        let device_sdk_version = device.sdk_version;

        let id = app_id.clone();
        let (version_code, paths, artifacts) = self
            .store
            .read(move |txn| {
                let Some(channel) = txn.get_release_channel(&id, channel_name)? else {
                    return Ok(Err(Status::not_found(
                        "no info matching the provided app and release channel found",
                    )));
                };
                let paths = match select_splits(&channel, &device) {
                    Ok(Selection::Compatible(paths)) => paths,
                    Ok(Selection::Incompatible) => {
                        return Ok(Err(Status::not_found(
                            "no download information matches the provided device attributes",
                        )));
                    }
                    Err(status) => return Ok(Err(status)),
                };
                let ids: Vec<String> = paths.iter().cloned().collect();
                let artifacts = txn.get_split_artifacts(&ids)?;
                Ok(Ok((channel.version_code, paths, artifacts)))
            })
            .await??;

        let app_download_info = planner::plan(&paths, &artifacts, &self.urls).inspect_err(|err| {
            warn!(%app_id, %err, "selected split has no stored artifact");
        })?;

        let download_kind = if request.base_version_code.is_some() {
            DownloadKind::Update
        } else {
            DownloadKind::Initial
        };
        self.record(UsageEvent::Download {
            date: UsageEvent::today(),
            app_id,
            version_code,
            download_kind,
            device_sdk_version,
            country_code: request.country_code,
        })
        .await;

        Ok(GetAppDownloadInfoResponse { app_download_info })
    }

    async fn get_update_info(
        &self,
        request: GetUpdateInfoRequest,
    ) -> Result<GetUpdateInfoResponse, Status> {
        let app_id = request
            .app_id
            .ok_or_else(|| Status::invalid_argument("app ID is missing but required"))?;
        let base_version_code = request
            .base_version_code
            .ok_or_else(|| Status::invalid_argument("base version code is missing but required"))?;
        let channel_name = request.release_channel.unwrap_or_default().canonical_form();

        let id = app_id.clone();
        let channel = self
            .store
            .read(move |txn| txn.get_release_channel(&id, channel_name))
            .await?
            .ok_or_else(|| Status::not_found("provided app ID or release channel does not exist"))?;

        let update_info = if channel.version_code > base_version_code {
            let compatibility = match &request.device_attributes {
                Some(device) => Some(Compatibility::from_compatible(
                    select_splits(&channel, device)?.is_compatible(),
                )),
                None => None,
            };
            Some(UpdateInfo { compatibility })
        } else {
            None
        };
        debug!(
            %app_id,
            base_version_code,
            version_code = channel.version_code,
            available = update_info.is_some(),
            "checked for update"
        );

        self.record(UsageEvent::UpdateCheck {
            date: UsageEvent::today(),
            app_id,
            release_channel: channel_name.to_string(),
            device_sdk_version: request.device_attributes.as_ref().and_then(|d| d.sdk_version),
            country_code: request.country_code,
        })
        .await;

        Ok(GetUpdateInfoResponse { update_info })
    }
}
