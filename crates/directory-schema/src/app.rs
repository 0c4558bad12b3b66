//! The persisted app aggregate.
//!
//! An [`App`] owns its listings and release channels by value; children refer
//! back to their app by ID only.

use serde::{Deserialize, Serialize};

/// The permanent, canonical name of the stable release channel.
pub const RELEASE_CHANNEL_NAME_STABLE: &str = "well_known_stable";

/// Well-known release channels a client can ask for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WellKnownChannel {
    /// Not specified by the client; treated as stable.
    #[default]
    Unspecified,
    /// The stable channel.
    Stable,
}

impl WellKnownChannel {
    /// Canonical storage key of the channel.
    pub fn canonical_form(self) -> &'static str {
        match self {
            Self::Unspecified | Self::Stable => RELEASE_CHANNEL_NAME_STABLE,
        }
    }
}

/// A release channel reference as it appears in requests and events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseChannelRef {
    /// The well-known channel, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub well_known: Option<WellKnownChannel>,
}

impl ReleaseChannelRef {
    /// Reference to the stable channel.
    pub fn stable() -> Self {
        Self {
            well_known: Some(WellKnownChannel::Stable),
        }
    }

    /// Whether the reference explicitly names the stable channel.
    pub fn is_stable(&self) -> bool {
        self.well_known == Some(WellKnownChannel::Stable)
    }

    /// Canonical storage key; an absent channel means stable.
    pub fn canonical_form(&self) -> &'static str {
        self.well_known.unwrap_or_default().canonical_form()
    }

    /// Maps a canonical storage key back to a reference.
    pub fn from_canonical_form(_canonical: &str) -> Self {
        // Stable is the only well-known channel.
        Self::stable()
    }
}

/// An app and everything published for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    /// Unique package identifier, e.g. `app.accrescent.client`.
    pub id: String,
    /// BCP-47 tag of the listing shown when no preferred language matches.
    pub default_listing_language: String,
    /// Listings, unique by language, ordered by language.
    pub listings: Vec<Listing>,
    /// Release channels, unique by name, ordered by name.
    pub release_channels: Vec<ReleaseChannel>,
}

impl App {
    /// The listing in the default listing language, if present.
    pub fn default_listing(&self) -> Option<&Listing> {
        self.listing(&self.default_listing_language)
    }

    /// The listing in exactly the given language.
    pub fn listing(&self, language: &str) -> Option<&Listing> {
        self.listings.iter().find(|l| l.language == language)
    }

    /// The release channel with the given canonical name.
    pub fn release_channel(&self, name: &str) -> Option<&ReleaseChannel> {
        self.release_channels.iter().find(|c| c.name == name)
    }
}

/// A store listing in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Owning app.
    pub app_id: String,
    /// BCP-47 tag of the listing's content.
    pub language: String,
    /// Display name.
    pub name: String,
    /// Short summary.
    pub short_description: String,
    /// App icon.
    pub icon: Icon,
}

/// An image held in object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icon {
    /// Object-storage ID of the image.
    pub object_id: String,
}

/// The latest release in a distribution track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseChannel {
    /// Owning app.
    pub app_id: String,
    /// Canonical channel name, e.g. [`RELEASE_CHANNEL_NAME_STABLE`].
    pub name: String,
    /// Internal version code.
    pub version_code: u32,
    /// User-visible version name.
    pub version_name: String,
    /// Encoded [`crate::Manifest`].
    pub manifest: Vec<u8>,
    /// Downloadable splits, ordered by ID.
    pub artifacts: Vec<SplitArtifact>,
}

/// One downloadable file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitArtifact {
    /// Split path in the manifest, which is also the object-storage ID.
    pub id: String,
    /// Uncompressed size in bytes.
    pub uncompressed_size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unspecified_channel_is_stable() {
        assert_eq!(ReleaseChannelRef::default().canonical_form(), "well_known_stable");
        let unspecified = ReleaseChannelRef {
            well_known: Some(WellKnownChannel::Unspecified),
        };
        assert_eq!(unspecified.canonical_form(), "well_known_stable");
        assert!(!unspecified.is_stable());
        assert!(ReleaseChannelRef::from_canonical_form("well_known_stable").is_stable());
    }
}
