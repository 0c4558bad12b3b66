//! Device compatibility evaluation.
//!
//! Each targeting dimension lives in its own module and answers one question:
//! given the device and the `value`/`alternatives` of an entry, is this entry
//! the one the device should get? The evaluator combines the dimensions as a
//! conjunction; an undeclared dimension is always satisfied.
//!
//! A dimension that is declared but needs a device attribute the caller did
//! not supply never matches. Unknown is treated as incompatible, not as a
//! wildcard.

pub mod abi;
pub mod density;
pub mod feature;
pub mod language;
pub mod sdk;
pub mod texture;

use directory_schema::DeviceAttributes;
use directory_schema::targeting::{ApkTargeting, ModuleTargeting, Targeting, VariantTargeting};

/// Whether a split APK's targeting matches the device.
pub fn matches(device: &DeviceAttributes, targeting: &ApkTargeting) -> bool {
    dimension(targeting.abi.as_ref(), |t| abi::matches(device, t))
        && dimension(targeting.screen_density.as_ref(), |t| {
            density::matches(device, t)
        })
        && dimension(targeting.language.as_ref(), |t| language::matches(device, t))
        && dimension(targeting.texture_compression_format.as_ref(), |t| {
            texture::matches(device, t)
        })
        && dimension(targeting.sdk_version.as_ref(), |t| sdk::matches(device, t))
}

/// Whether a variant's coarse targeting matches the device.
pub fn matches_variant(device: &DeviceAttributes, targeting: &VariantTargeting) -> bool {
    dimension(targeting.sdk_version.as_ref(), |t| sdk::matches(device, t))
        && dimension(targeting.abi.as_ref(), |t| abi::matches(device, t))
        && dimension(targeting.screen_density.as_ref(), |t| {
            density::matches(device, t)
        })
        && dimension(targeting.texture_compression_format.as_ref(), |t| {
            texture::matches(device, t)
        })
}

/// Whether a conditional module is delivered to the device.
pub fn matches_module(device: &DeviceAttributes, targeting: &ModuleTargeting) -> bool {
    dimension(targeting.sdk_version.as_ref(), |t| sdk::matches(device, t))
        && feature::supports_all(device, &targeting.device_features)
}

fn dimension<T>(targeting: Option<&Targeting<T>>, check: impl FnOnce(&Targeting<T>) -> bool) -> bool {
    match targeting {
        Some(targeting) if targeting.is_declared() => check(targeting),
        _ => true,
    }
}

/// Decides an entry once the winning candidate of its dimension is known.
///
/// With a winner the entry matches iff its own value contains it. Without
/// one only a fallback entry matches.
pub(crate) fn resolve<T, K: PartialEq>(
    targeting: &Targeting<T>,
    winner: Option<K>,
    key: impl Fn(&T) -> K,
) -> bool {
    match winner {
        Some(winner) => targeting.value.iter().any(|v| key(v) == winner),
        None => targeting.is_fallback(),
    }
}
