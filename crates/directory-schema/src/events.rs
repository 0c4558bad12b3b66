//! Publication events exchanged over the event channel.
//!
//! Inbound payloads keep every field optional so that ingestion can report
//! exactly which required field is missing instead of failing to decode.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::app::ReleaseChannelRef;
use crate::manifest::Manifest;

/// Request to publish an app to the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppPublicationRequested {
    /// The app to publish.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<AppPayload>,
}

/// Request to publish an edit of an existing app.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppEditPublicationRequested {
    /// The edit to publish.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit: Option<AppEditPayload>,
}

/// Confirmation that an app was published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppPublished {
    /// The app as stored.
    pub app: AppPayload,
}

/// Confirmation that an app edit was published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppEditPublished {
    /// The edit as stored.
    pub edit: AppEditPayload,
}

/// Inbound messages, tagged by kind on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// A full app publication.
    AppPublicationRequested(AppPublicationRequested),
    /// An app edit publication.
    AppEditPublicationRequested(AppEditPublicationRequested),
}

/// Outbound confirmations, tagged by kind on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// Confirms an [`AppPublicationRequested`].
    AppPublished(AppPublished),
    /// Confirms an [`AppEditPublicationRequested`].
    AppEditPublished(AppEditPublished),
}

impl OutboundEvent {
    /// ID of the app the confirmation is about.
    pub fn app_id(&self) -> &str {
        let app = match self {
            Self::AppPublished(published) => Some(&published.app),
            Self::AppEditPublished(published) => published.edit.app.as_ref(),
        };
        app.and_then(|app| app.app_id.as_deref()).unwrap_or_default()
    }
}

/// An edit wrapper around an app payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppEditPayload {
    /// Edit identifier assigned by the publisher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The edited app.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<AppPayload>,
}

/// App data carried by publication events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppPayload {
    /// Package identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    /// BCP-47 tag of the default listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_listing_language: Option<String>,
    /// Store listings.
    #[serde(default)]
    pub listings: Vec<ListingPayload>,
    /// Per-channel package metadata.
    #[serde(default)]
    pub package_metadata: Vec<PackageMetadataEntry>,
}

/// A listing as carried by events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingPayload {
    /// BCP-47 tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Short summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    /// App icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<ImagePayload>,
}

/// An image reference as carried by events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    /// Object-storage ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
}

/// Package metadata for one release channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadataEntry {
    /// The channel this metadata belongs to.
    #[serde(default)]
    pub release_channel: ReleaseChannelRef,
    /// The release itself.
    #[serde(default)]
    pub package_metadata: PackageMetadata,
}

/// A release: version, manifest and per-object metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Internal version code.
    #[serde(default)]
    pub version_code: u32,
    /// User-visible version name.
    #[serde(default)]
    pub version_name: String,
    /// The parsed build result.
    #[serde(default)]
    pub manifest: Manifest,
    /// Metadata keyed by split path / object ID.
    #[serde(default)]
    pub object_metadata: BTreeMap<String, ObjectMetadata>,
}

/// Metadata of one stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Uncompressed size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncompressed_size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_tagging() {
        let json = r#"{"type":"app_publication_requested","app":{"app_id":"com.example"}}"#;
        let event: InboundEvent = serde_json::from_str(json).unwrap();
        match event {
            InboundEvent::AppPublicationRequested(requested) => {
                assert_eq!(
                    requested.app.unwrap().app_id.as_deref(),
                    Some("com.example")
                );
            }
            InboundEvent::AppEditPublicationRequested(_) => panic!("wrong event kind"),
        }
    }

    #[test]
    fn test_missing_fields_are_none() {
        let listing: ListingPayload = serde_json::from_str(r#"{"language":"en"}"#).unwrap();
        assert_eq!(listing.language.as_deref(), Some("en"));
        assert!(listing.name.is_none());
        assert!(listing.icon.is_none());
    }
}
