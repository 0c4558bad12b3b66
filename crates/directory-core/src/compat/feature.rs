//! Device feature requirements.

use directory_schema::DeviceAttributes;
use directory_schema::targeting::DeviceFeature;

/// Versioned feature carrying the supported OpenGL ES version.
pub const GL_ES_VERSION_FEATURE: &str = "reqGlEsVersion";

/// Splits a device feature string into its name and optional version.
///
/// Versions may be decimal or `0x`-prefixed hexadecimal. An unparsable version
/// is reported as absent.
pub fn parse(feature: &str) -> (&str, Option<u32>) {
    match feature.split_once('=') {
        Some((name, version)) => (name.trim(), parse_version(version.trim())),
        None => (feature.trim(), None),
    }
}

fn parse_version(raw: &str) -> Option<u32> {
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

/// The declared version of a versioned device feature.
pub fn version_of(device: &DeviceAttributes, name: &str) -> Option<u32> {
    device
        .device_features
        .iter()
        .map(|f| parse(f))
        .filter(|(feature, _)| *feature == name)
        .find_map(|(_, version)| version)
}

/// Whether the device provides a single required feature.
pub fn supports(device: &DeviceAttributes, required: &DeviceFeature) -> bool {
    device.device_features.iter().map(|f| parse(f)).any(|(name, version)| {
        name == required.name
            && match required.version {
                Some(min) => version.is_some_and(|v| v >= min),
                None => true,
            }
    })
}

/// Whether the device provides every required feature.
pub fn supports_all(device: &DeviceAttributes, required: &[DeviceFeature]) -> bool {
    required.iter().all(|feature| supports(device, feature))
}
