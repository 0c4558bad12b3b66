//! Screen density targeting.

use directory_schema::DeviceAttributes;
use directory_schema::targeting::{ScreenDensity, Targeting};

use super::resolve;

/// Matches when the entry's density is the one the platform's resource
/// selection would pick for the device among all candidates.
pub fn matches(device: &DeviceAttributes, targeting: &Targeting<ScreenDensity>) -> bool {
    let Some(requested) = device.screen_density else {
        return false;
    };
    let winner = targeting
        .candidates()
        .map(ScreenDensity::dpi)
        .reduce(|best, dpi| if is_better(dpi, best, requested) { dpi } else { best });
    resolve(targeting, winner, ScreenDensity::dpi)
}

/// Whether density `this` is a better fit than `other` for `requested`.
///
/// Prefers the smallest density at or above the request, unless scaling
/// down from the next lower density is clearly cheaper.
fn is_better(this: u32, other: u32, requested: u32) -> bool {
    if this == other {
        return false;
    }
    let (low, high, this_is_high) = if this > other {
        (other, this, true)
    } else {
        (this, other, false)
    };

    if requested >= high {
        return this_is_high;
    }
    if low >= requested {
        return !this_is_high;
    }

    let (low, high, requested) = (u64::from(low), u64::from(high), u64::from(requested));
    let prefer_low = (2 * low).saturating_sub(requested) * high > requested * requested;
    if prefer_low { !this_is_high } else { this_is_high }
}
