//! Device attributes supplied by clients at query time. Never persisted.

use serde::{Deserialize, Serialize};

/// A concrete device's attribute vector.
///
/// Every field is optional on the wire. Matching treats a missing attribute as
/// unknown, and an unknown attribute never satisfies a declared predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAttributes {
    /// Supported ABIs, most preferred first.
    #[serde(default)]
    pub supported_abis: Vec<String>,
    /// Supported locales as BCP-47 tags, most preferred first.
    #[serde(default)]
    pub supported_locales: Vec<String>,
    /// Device feature strings (`android.hardware.camera`, `reqGlEsVersion=0x30000`).
    #[serde(default)]
    pub device_features: Vec<String>,
    /// Supported OpenGL extension strings.
    #[serde(default)]
    pub gl_extensions: Vec<String>,
    /// Screen density in dpi.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_density: Option<u32>,
    /// Platform SDK level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk_version: Option<u32>,
    /// Platform codename; `REL` or empty on release builds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codename: Option<String>,
    /// Total RAM in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram: Option<u64>,
    /// Device tier assigned by the developer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_tier: Option<i32>,
    /// Device groups the device belongs to.
    #[serde(default)]
    pub device_groups: Vec<String>,
    /// Country set the device belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_set: Option<String>,
}

impl DeviceAttributes {
    /// The SDK level used for matching.
    ///
    /// A device running a pre-release build (non-`REL` codename) already
    /// ships the APIs of the next level.
    pub fn effective_sdk_version(&self) -> Option<u32> {
        let sdk = self.sdk_version?;
        match self.codename.as_deref() {
            None | Some("" | "REL") => Some(sdk),
            Some(_) => Some(sdk.saturating_add(1)),
        }
    }

    /// Primary language subtags of the supported locales, in preference order
    /// and without duplicates.
    pub fn languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = Vec::with_capacity(self.supported_locales.len());
        for locale in &self.supported_locales {
            let language = primary_language(locale);
            if !language.is_empty() && !languages.iter().any(|l| *l == language) {
                languages.push(language);
            }
        }
        languages
    }
}

/// Primary language subtag of a BCP-47 tag (`en-US` -> `en`, `pt_BR` -> `pt`).
pub fn primary_language(tag: &str) -> String {
    tag.split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_sdk_version() {
        let mut device = DeviceAttributes {
            sdk_version: Some(35),
            ..DeviceAttributes::default()
        };
        assert_eq!(device.effective_sdk_version(), Some(35));

        device.codename = Some("REL".into());
        assert_eq!(device.effective_sdk_version(), Some(35));

        device.codename = Some("Baklava".into());
        assert_eq!(device.effective_sdk_version(), Some(36));

        device.sdk_version = None;
        assert_eq!(device.effective_sdk_version(), None);
    }

    #[test]
    fn test_languages_deduplicates_in_order() {
        let device = DeviceAttributes {
            supported_locales: vec!["en-US".into(), "de-DE".into(), "en-GB".into()],
            ..DeviceAttributes::default()
        };
        assert_eq!(device.languages(), vec!["en", "de"]);
    }

    #[test]
    fn test_missing_fields_deserialize_as_unknown() {
        let device: DeviceAttributes = serde_json::from_str(r#"{"sdk_version": 34}"#).unwrap();
        assert_eq!(device.sdk_version, Some(34));
        assert!(device.supported_abis.is_empty());
        assert_eq!(device.screen_density, None);
    }
}
