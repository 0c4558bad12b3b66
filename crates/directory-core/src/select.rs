//! Variant and split selection.
//!
//! Given a manifest and a device, picks the single best variant and, within
//! it, the minimal set of split APKs the device has to download.

use std::collections::{BTreeMap, BTreeSet};

use directory_schema::DeviceAttributes;
use directory_schema::manifest::{ApkDescription, ApkSet, DeliveryType, Manifest, Variant};
use directory_schema::targeting::{ApkTargeting, Targeting, is_declared};
use tracing::debug;

use crate::compat;

/// Outcome of selecting splits for a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The device can install the app from these split paths.
    Compatible(BTreeSet<String>),
    /// No variant of the app can be installed on the device.
    Incompatible,
}

impl Selection {
    /// Whether the device is compatible.
    pub fn is_compatible(&self) -> bool {
        matches!(self, Self::Compatible(_))
    }
}

/// The set of targeting dimensions a split declares.
///
/// Splits declaring the same dimensions compete with each other; at most one
/// of them is selected per module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Dimensions(u8);

impl Dimensions {
    const ABI: u8 = 1;
    const DENSITY: u8 = 1 << 1;
    const LANGUAGE: u8 = 1 << 2;
    const TEXTURE: u8 = 1 << 3;
    const SDK: u8 = 1 << 4;

    fn of(targeting: &ApkTargeting) -> Self {
        let mut bits = 0;
        if is_declared(targeting.abi.as_ref()) {
            bits |= Self::ABI;
        }
        if is_declared(targeting.screen_density.as_ref()) {
            bits |= Self::DENSITY;
        }
        if is_declared(targeting.language.as_ref()) {
            bits |= Self::LANGUAGE;
        }
        if is_declared(targeting.texture_compression_format.as_ref()) {
            bits |= Self::TEXTURE;
        }
        if is_declared(targeting.sdk_version.as_ref()) {
            bits |= Self::SDK;
        }
        Self(bits)
    }

    fn contains(self, bit: u8) -> bool {
        self.0 & bit != 0
    }
}

/// Number of declared dimensions in which the split is a fallback entry.
fn fallback_count(targeting: &ApkTargeting) -> usize {
    fn fallback<T>(t: Option<&Targeting<T>>) -> usize {
        usize::from(t.is_some_and(Targeting::is_fallback))
    }
    fallback(targeting.abi.as_ref())
        + fallback(targeting.screen_density.as_ref())
        + fallback(targeting.language.as_ref())
        + fallback(targeting.texture_compression_format.as_ref())
        + fallback(targeting.sdk_version.as_ref())
}

/// Selects the split paths the device needs.
///
/// Among variants whose coarse targeting matches, the one with the highest
/// variant number wins. Within that variant every install-time module and
/// every conditional module whose targeting matches contributes its matching
/// splits; on-demand modules are never part of the download.
pub fn select(manifest: &Manifest, device: &DeviceAttributes) -> Selection {
    let Some(variant) = best_variant(manifest, device) else {
        debug!("no variant matches device");
        return Selection::Incompatible;
    };

    let mut selected = BTreeSet::new();
    for apk_set in &variant.apk_sets {
        if !is_delivered(apk_set, device) {
            continue;
        }
        match select_module(apk_set, device) {
            Some(paths) => selected.extend(paths),
            None => {
                debug!(
                    variant = variant.variant_number,
                    module = %apk_set.module.name,
                    "module has no split for device"
                );
                return Selection::Incompatible;
            }
        }
    }

    if selected.is_empty() {
        debug!(variant = variant.variant_number, "variant yields no splits");
        return Selection::Incompatible;
    }
    debug!(
        variant = variant.variant_number,
        splits = selected.len(),
        "selected splits"
    );
    Selection::Compatible(selected)
}

fn best_variant<'a>(manifest: &'a Manifest, device: &DeviceAttributes) -> Option<&'a Variant> {
    manifest
        .variants
        .iter()
        .filter(|variant| compat::matches_variant(device, &variant.targeting))
        .fold(None, |best: Option<&Variant>, variant| match best {
            Some(best) if best.variant_number >= variant.variant_number => Some(best),
            _ => Some(variant),
        })
}

fn is_delivered(apk_set: &ApkSet, device: &DeviceAttributes) -> bool {
    match apk_set.module.delivery {
        DeliveryType::InstallTime => true,
        DeliveryType::Conditional => compat::matches_module(device, &apk_set.module.targeting),
        DeliveryType::OnDemand => false,
    }
}

/// Matching splits of one module, unique per dimension set.
///
/// Returns `None` when the module declares ABI or density splits but none of
/// them fits the device, since the module could not run correctly.
fn select_module(apk_set: &ApkSet, device: &DeviceAttributes) -> Option<Vec<String>> {
    let mut winners: BTreeMap<Dimensions, &ApkDescription> = BTreeMap::new();
    for apk in &apk_set.apk_descriptions {
        if !compat::matches(device, &apk.targeting) {
            continue;
        }
        let dimensions = Dimensions::of(&apk.targeting);
        if dimensions.0 == 0 {
            // Untargeted splits never compete.
            continue;
        }
        // Ties go to the earliest declared split.
        let replace = winners.get(&dimensions).is_none_or(|current| {
            fallback_count(&apk.targeting) < fallback_count(&current.targeting)
        });
        if replace {
            winners.insert(dimensions, apk);
        }
    }

    for required in [Dimensions::ABI, Dimensions::DENSITY] {
        let declared = apk_set
            .apk_descriptions
            .iter()
            .any(|apk| Dimensions::of(&apk.targeting).contains(required));
        let satisfied = winners.keys().any(|d| d.contains(required));
        if declared && !satisfied {
            return None;
        }
    }

    let untargeted = apk_set
        .apk_descriptions
        .iter()
        .filter(|apk| apk.targeting.is_untargeted());
    Some(
        untargeted
            .chain(winners.into_values())
            .map(|apk| apk.path.clone())
            .collect(),
    )
}
