//! SDK level targeting.

use directory_schema::DeviceAttributes;
use directory_schema::targeting::{SdkVersion, Targeting};

use super::resolve;

/// Matches when the entry's minimum is the highest candidate minimum the
/// device satisfies.
pub fn matches(device: &DeviceAttributes, targeting: &Targeting<SdkVersion>) -> bool {
    let Some(sdk) = device.effective_sdk_version() else {
        return false;
    };
    let winner = targeting
        .candidates()
        .map(|v| v.min)
        .filter(|&min| min <= sdk)
        .max();
    resolve(targeting, winner, |v| v.min)
}
