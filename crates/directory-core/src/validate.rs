//! Structural validation of publication payloads.
//!
//! Validation and conversion happen in one step: a payload that passes every
//! rule becomes the [`App`] aggregate that is stored and confirmed.

use std::collections::{BTreeMap, BTreeSet};

use directory_schema::events::{
    AppEditPayload, AppEditPublicationRequested, AppPayload, AppPublicationRequested,
    ListingPayload, PackageMetadataEntry,
};
use directory_schema::{App, Icon, Listing, ManifestError, ReleaseChannel, SplitArtifact};
use thiserror::Error;

/// A publication payload violates a structural rule.
///
/// Rules are checked in declaration order and the first violation is reported.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The event carries no app.
    #[error("app metadata is missing but required")]
    MissingApp,
    /// The edit event carries no edit.
    #[error("app edit metadata is missing but required")]
    MissingEdit,
    /// The edit has no ID.
    #[error("edit ID is missing but required")]
    MissingEditId,
    /// The app has no ID.
    #[error("app ID is missing but required")]
    MissingAppId,
    /// The app has no default listing language.
    #[error("default listing language is missing but required")]
    MissingDefaultListingLanguage,
    /// Two listings share a language.
    #[error("listing languages must not be duplicated")]
    DuplicateListingLanguage,
    /// There are no listings.
    #[error("no listings found but at least one required")]
    NoListings,
    /// No listing is in the default language.
    #[error("no listing found for default listing language")]
    NoDefaultListing,
    /// A listing has no language.
    #[error("all listings must specify a language")]
    ListingMissingLanguage,
    /// A listing has no name.
    #[error("all listings must specify a name")]
    ListingMissingName,
    /// A listing has no short description.
    #[error("all listings must specify a short description")]
    ListingMissingShortDescription,
    /// A listing has no icon.
    #[error("all listings must specify an icon")]
    ListingMissingIcon,
    /// A listing icon has no object ID.
    #[error("all listings icons must specify an object ID")]
    IconMissingObjectId,
    /// No package metadata for the stable channel.
    #[error("stable channel metadata must be provided")]
    MissingStableChannel,
    /// Two package metadata entries name the same channel.
    #[error("release channels must not be duplicated")]
    DuplicateReleaseChannel,
    /// A split path in a manifest has no object metadata.
    #[error("all objects must have metadata specified")]
    ObjectMissingMetadata,
    /// Object metadata for a split path lacks its size.
    #[error("all objects must have an uncompressed size specified")]
    ObjectMissingSize,
    /// Object metadata exists for a path the manifest does not reference.
    #[error("object metadata found for unspecified object")]
    UnreferencedObjectMetadata,
    /// The manifest could not be encoded for storage.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Validates an app publication and returns the app to store.
///
/// # Errors
///
/// Returns the first [`ValidationError`] the event violates.
pub fn validate_publication(event: &AppPublicationRequested) -> Result<App, ValidationError> {
    let app = event.app.as_ref().ok_or(ValidationError::MissingApp)?;
    validate_app(app)
}

/// Validates an app edit publication and returns the edit ID and the app to
/// store.
///
/// # Errors
///
/// Returns the first [`ValidationError`] the event violates.
pub fn validate_edit_publication(
    event: &AppEditPublicationRequested,
) -> Result<(String, App), ValidationError> {
    let edit: &AppEditPayload = event.edit.as_ref().ok_or(ValidationError::MissingEdit)?;
    let id = edit.id.clone().ok_or(ValidationError::MissingEditId)?;
    let app = edit.app.as_ref().ok_or(ValidationError::MissingApp)?;
    Ok((id, validate_app(app)?))
}

/// Validates an app payload and converts it into the stored aggregate.
///
/// # Errors
///
/// Returns the first [`ValidationError`] the payload violates.
pub fn validate_app(payload: &AppPayload) -> Result<App, ValidationError> {
    let app_id = payload.app_id.as_ref().ok_or(ValidationError::MissingAppId)?;
    let default_language = payload
        .default_listing_language
        .as_ref()
        .ok_or(ValidationError::MissingDefaultListingLanguage)?;
    check_listings(payload, default_language)?;
    check_channels(&payload.package_metadata)?;

    let mut listings = payload
        .listings
        .iter()
        .map(|listing| to_listing(app_id, listing))
        .collect::<Result<Vec<_>, _>>()?;
    listings.sort_by(|a, b| a.language.cmp(&b.language));

    let mut release_channels = payload
        .package_metadata
        .iter()
        .map(|entry| to_release_channel(app_id, entry))
        .collect::<Result<Vec<_>, _>>()?;
    release_channels.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(App {
        id: app_id.clone(),
        default_listing_language: default_language.clone(),
        listings,
        release_channels,
    })
}

fn check_listings(payload: &AppPayload, default_language: &str) -> Result<(), ValidationError> {
    let listings = &payload.listings;
    let languages: BTreeSet<Option<&str>> =
        listings.iter().map(|l| l.language.as_deref()).collect();
    if languages.len() != listings.len() {
        return Err(ValidationError::DuplicateListingLanguage);
    }
    if listings.is_empty() {
        return Err(ValidationError::NoListings);
    }
    if !languages.contains(&Some(default_language)) {
        return Err(ValidationError::NoDefaultListing);
    }

    let rules: [(fn(&ListingPayload) -> bool, ValidationError); 5] = [
        (|l| l.language.is_some(), ValidationError::ListingMissingLanguage),
        (|l| l.name.is_some(), ValidationError::ListingMissingName),
        (|l| l.short_description.is_some(), ValidationError::ListingMissingShortDescription),
        (|l| l.icon.is_some(), ValidationError::ListingMissingIcon),
        (
            |l| l.icon.as_ref().is_some_and(|icon| icon.object_id.is_some()),
            ValidationError::IconMissingObjectId,
        ),
    ];
    for (holds, error) in rules {
        if !listings.iter().all(holds) {
            return Err(error);
        }
    }
    Ok(())
}

fn check_channels(entries: &[PackageMetadataEntry]) -> Result<(), ValidationError> {
    if !entries.iter().any(|e| e.release_channel.is_stable()) {
        return Err(ValidationError::MissingStableChannel);
    }
    let channels: BTreeSet<&str> = entries
        .iter()
        .map(|e| e.release_channel.canonical_form())
        .collect();
    if channels.len() != entries.len() {
        return Err(ValidationError::DuplicateReleaseChannel);
    }

    let objects: Vec<(BTreeSet<&str>, &BTreeMap<_, _>)> = entries
        .iter()
        .map(|e| {
            let metadata = &e.package_metadata;
            (metadata.manifest.split_paths(), &metadata.object_metadata)
        })
        .collect();
    if !objects
        .iter()
        .all(|(paths, metadata)| paths.iter().all(|p| metadata.contains_key(*p)))
    {
        return Err(ValidationError::ObjectMissingMetadata);
    }
    if !objects.iter().all(|(paths, metadata)| {
        paths
            .iter()
            .all(|p| metadata.get(*p).is_some_and(|m| m.uncompressed_size.is_some()))
    }) {
        return Err(ValidationError::ObjectMissingSize);
    }
    if !objects
        .iter()
        .all(|(paths, metadata)| metadata.keys().all(|k| paths.contains(k.as_str())))
    {
        return Err(ValidationError::UnreferencedObjectMetadata);
    }
    Ok(())
}

fn to_listing(app_id: &str, listing: &ListingPayload) -> Result<Listing, ValidationError> {
    let object_id = listing
        .icon
        .as_ref()
        .and_then(|icon| icon.object_id.clone())
        .ok_or(ValidationError::IconMissingObjectId)?;
    Ok(Listing {
        app_id: app_id.to_string(),
        language: listing
            .language
            .clone()
            .ok_or(ValidationError::ListingMissingLanguage)?,
        name: listing.name.clone().ok_or(ValidationError::ListingMissingName)?,
        short_description: listing
            .short_description
            .clone()
            .ok_or(ValidationError::ListingMissingShortDescription)?,
        icon: Icon { object_id },
    })
}

fn to_release_channel(
    app_id: &str,
    entry: &PackageMetadataEntry,
) -> Result<ReleaseChannel, ValidationError> {
    let metadata = &entry.package_metadata;
    let artifacts = metadata
        .manifest
        .split_paths()
        .into_iter()
        .map(|path| {
            metadata
                .object_metadata
                .get(path)
                .and_then(|m| m.uncompressed_size)
                .map(|uncompressed_size| SplitArtifact {
                    id: path.to_string(),
                    uncompressed_size,
                })
                .ok_or(ValidationError::ObjectMissingSize)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ReleaseChannel {
        app_id: app_id.to_string(),
        name: entry.release_channel.canonical_form().to_string(),
        version_code: metadata.version_code,
        version_name: metadata.version_name.clone(),
        manifest: metadata.manifest.to_bytes()?,
        artifacts,
    })
}
