//! Request and response types of the directory query operations.

use serde::{Deserialize, Serialize};

use crate::app::ReleaseChannelRef;
use crate::device::DeviceAttributes;

/// Whether an app can be installed on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompatibilityLevel {
    /// At least one split matches the device.
    Compatible,
    /// No variant matches the device.
    Incompatible,
}

/// Compatibility of an app with the requesting device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compatibility {
    /// The compatibility verdict.
    pub level: CompatibilityLevel,
}

impl Compatibility {
    /// Builds the verdict from a boolean.
    pub fn from_compatible(compatible: bool) -> Self {
        let level = if compatible {
            CompatibilityLevel::Compatible
        } else {
            CompatibilityLevel::Incompatible
        };
        Self { level }
    }

    /// Whether the verdict is compatible.
    pub fn is_compatible(&self) -> bool {
        self.level == CompatibilityLevel::Compatible
    }
}

/// An image reachable over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Download URL.
    pub url: String,
}

/// Total download size for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadSize {
    /// Sum of the uncompressed sizes of all matching splits.
    pub uncompressed_total: u64,
}

/// A listing as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppListing {
    /// Package identifier.
    pub app_id: String,
    /// BCP-47 tag of the listing.
    pub language: String,
    /// Display name.
    pub name: String,
    /// Short summary.
    pub short_description: String,
    /// App icon.
    pub icon: Image,
    /// Version name of the requested channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_name: Option<String>,
    /// Present only when device attributes were supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<Compatibility>,
    /// Present only for compatible devices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_size: Option<DownloadSize>,
}

/// How much detail `ListAppListings` returns per listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppListingView {
    /// Listing content and compatibility only.
    #[default]
    Basic,
    /// Also version name and download size.
    Full,
}

/// Get one app's listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAppListingRequest {
    /// Required package identifier.
    #[serde(default)]
    pub app_id: Option<String>,
    /// Channel to report; stable when absent.
    #[serde(default)]
    pub release_channel: Option<ReleaseChannelRef>,
    /// Device to check compatibility for.
    #[serde(default)]
    pub device_attributes: Option<DeviceAttributes>,
    /// Preferred listing languages, most preferred first.
    /// When empty the device's supported locales are used.
    #[serde(default)]
    pub preferred_languages: Vec<String>,
    /// Country the request originates from, if known.
    #[serde(default)]
    pub country_code: Option<String>,
}

/// Response of `GetAppListing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAppListingResponse {
    /// The best matching listing.
    pub listing: AppListing,
}

/// Page through all listings ordered by app ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListAppListingsRequest {
    /// Maximum number of apps scanned; 0 or absent means the default.
    #[serde(default)]
    pub page_size: Option<u32>,
    /// Number of apps to skip after the page token position.
    #[serde(default)]
    pub skip: Option<u32>,
    /// Opaque continuation token from a previous response.
    #[serde(default)]
    pub page_token: Option<String>,
    /// Device to filter for.
    #[serde(default)]
    pub device_attributes: Option<DeviceAttributes>,
    /// Detail level.
    #[serde(default)]
    pub view: Option<AppListingView>,
    /// Preferred listing languages, most preferred first.
    /// When empty the device's supported locales are used.
    #[serde(default)]
    pub preferred_languages: Vec<String>,
}

/// Response of `ListAppListings`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListAppListingsResponse {
    /// Listings in ascending app ID order.
    pub listings: Vec<AppListing>,
    /// Token for the next page; absent once the end is reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Resolve the downloads for a device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAppDownloadInfoRequest {
    /// Required package identifier.
    #[serde(default)]
    pub app_id: Option<String>,
    /// Channel to download from; stable when absent.
    #[serde(default)]
    pub release_channel: Option<ReleaseChannelRef>,
    /// Required device attributes.
    #[serde(default)]
    pub device_attributes: Option<DeviceAttributes>,
    /// Installed version, when the download is an update.
    #[serde(default)]
    pub base_version_code: Option<u32>,
    /// Country the request originates from, if known.
    #[serde(default)]
    pub country_code: Option<String>,
}

/// Download descriptor of one split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitDownloadInfo {
    /// Uncompressed size in bytes.
    pub download_size: u64,
    /// Download URL.
    pub url: String,
}

/// Everything a client needs to download an app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDownloadInfo {
    /// Sum of all split sizes.
    pub download_size: u64,
    /// One descriptor per split; order is unspecified.
    pub split_download_info: Vec<SplitDownloadInfo>,
}

/// Response of `GetAppDownloadInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAppDownloadInfoResponse {
    /// The download plan.
    pub app_download_info: AppDownloadInfo,
}

/// Check whether an update is available.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetUpdateInfoRequest {
    /// Required package identifier.
    #[serde(default)]
    pub app_id: Option<String>,
    /// Channel to check; stable when absent.
    #[serde(default)]
    pub release_channel: Option<ReleaseChannelRef>,
    /// Required installed version code.
    #[serde(default)]
    pub base_version_code: Option<u32>,
    /// Device to check compatibility for.
    #[serde(default)]
    pub device_attributes: Option<DeviceAttributes>,
    /// Country the request originates from, if known.
    #[serde(default)]
    pub country_code: Option<String>,
}

/// Details of an available update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateInfo {
    /// Present only when device attributes were supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<Compatibility>,
}

/// Response of `GetUpdateInfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetUpdateInfoResponse {
    /// Present only when an update is available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_info: Option<UpdateInfo>,
}
