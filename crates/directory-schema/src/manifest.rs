//! Parsed app-bundle build result.
//!
//! The tree is `Manifest -> Variant -> ApkSet (module) -> ApkDescription (split)`.
//! Release channels store it as opaque bytes (postcard) and decode it per query.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::targeting::{ApkTargeting, ModuleTargeting, VariantTargeting};

/// Errors that can occur when encoding or decoding stored manifest bytes.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The stored bytes are not a valid manifest.
    #[error("stored manifest is not a valid message: {0}")]
    Decode(postcard::Error),

    /// The manifest could not be serialized.
    #[error("failed to encode manifest: {0}")]
    Encode(postcard::Error),
}

/// The complete set of variants produced for one app version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// All variants, each targeting a coarse device class.
    #[serde(default)]
    pub variants: Vec<Variant>,
}

/// A top-level grouping of APK sets targeting a class of devices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Ordering key; among matching variants the highest number wins.
    #[serde(default)]
    pub variant_number: u32,
    /// Coarse targeting of the variant.
    #[serde(default)]
    pub targeting: VariantTargeting,
    /// One APK set per module.
    #[serde(default)]
    pub apk_sets: Vec<ApkSet>,
}

/// The splits of a single module within a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApkSet {
    /// Module identity and delivery.
    pub module: ModuleMetadata,
    /// Candidate split APKs of this module.
    #[serde(default)]
    pub apk_descriptions: Vec<ApkDescription>,
}

/// Whether a module carries code or only assets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleType {
    /// Code and resources.
    #[default]
    Feature,
    /// Asset pack.
    Asset,
}

/// When a module is delivered to a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    /// Always part of the initial install.
    #[default]
    InstallTime,
    /// Part of the initial install when the module targeting matches.
    Conditional,
    /// Downloaded later at the app's request; never part of the initial install.
    OnDemand,
}

/// Identity and delivery of a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMetadata {
    /// Module name (`base` for the base module).
    pub name: String,
    /// Feature or asset module.
    #[serde(default)]
    pub module_type: ModuleType,
    /// Delivery mode.
    #[serde(default)]
    pub delivery: DeliveryType,
    /// Module-level targeting, consulted for conditional modules.
    #[serde(default)]
    pub targeting: ModuleTargeting,
}

/// One physical split APK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApkDescription {
    /// Path of the APK in the set; doubles as its object-storage ID.
    pub path: String,
    /// Split targeting.
    #[serde(default)]
    pub targeting: ApkTargeting,
    /// Split identity.
    #[serde(default)]
    pub split: SplitMetadata,
}

/// Split identity inside its module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitMetadata {
    /// Split ID (`config.xxhdpi`, `config.en`, empty for the master).
    #[serde(default)]
    pub split_id: String,
    /// Whether this is the master split of its module.
    #[serde(default)]
    pub is_master_split: bool,
}

impl Manifest {
    /// Decode a manifest from its stored form.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Decode`] if `bytes` is not a valid manifest.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ManifestError> {
        postcard::from_bytes(bytes).map_err(ManifestError::Decode)
    }

    /// Encode the manifest into its stored form.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Encode`] if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ManifestError> {
        postcard::to_allocvec(self).map_err(ManifestError::Encode)
    }

    /// Every split path referenced anywhere in the tree.
    pub fn split_paths(&self) -> BTreeSet<&str> {
        self.apk_descriptions().map(|apk| apk.path.as_str()).collect()
    }

    /// Iterate over all split descriptions across variants and modules.
    pub fn apk_descriptions(&self) -> impl Iterator<Item = &ApkDescription> {
        self.variants
            .iter()
            .flat_map(|variant| variant.apk_sets.iter())
            .flat_map(|set| set.apk_descriptions.iter())
    }

    /// Mutable iteration over all split descriptions.
    pub fn apk_descriptions_mut(&mut self) -> impl Iterator<Item = &mut ApkDescription> {
        self.variants
            .iter_mut()
            .flat_map(|variant| variant.apk_sets.iter_mut())
            .flat_map(|set| set.apk_descriptions.iter_mut())
    }
}
