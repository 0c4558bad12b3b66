//! Targeting criteria attached to variants, modules and split APKs.
//!
//! Every dimension uses the same shape: the `value` the entry was built for
//! and the `alternatives` that sibling entries were built for. Matching picks
//! the best candidate out of `value ∪ alternatives`, so an entry only matches
//! when its own value is that best candidate.

use serde::{Deserialize, Serialize};

/// One targeting dimension in value/alternatives form.
///
/// An empty `value` with non-empty `alternatives` marks a fallback entry:
/// it applies when none of the alternatives does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Targeting<T> {
    /// Values this entry targets.
    #[serde(default)]
    pub value: Vec<T>,
    /// Values targeted by sibling entries of the same dimension.
    #[serde(default)]
    pub alternatives: Vec<T>,
}

impl<T> Default for Targeting<T> {
    fn default() -> Self {
        Self {
            value: Vec::new(),
            alternatives: Vec::new(),
        }
    }
}

impl<T> Targeting<T> {
    /// Targeting for a single value with the given alternatives.
    pub fn new(value: Vec<T>, alternatives: Vec<T>) -> Self {
        Self {
            value,
            alternatives,
        }
    }

    /// Whether this dimension constrains anything at all.
    pub fn is_declared(&self) -> bool {
        !self.value.is_empty() || !self.alternatives.is_empty()
    }

    /// Whether this is a fallback entry (no value of its own).
    pub fn is_fallback(&self) -> bool {
        self.value.is_empty() && !self.alternatives.is_empty()
    }

    /// All candidates competing in this dimension.
    pub fn candidates(&self) -> impl Iterator<Item = &T> {
        self.value.iter().chain(self.alternatives.iter())
    }
}

/// Returns true when an optional dimension is present and constrains something.
pub fn is_declared<T>(targeting: Option<&Targeting<T>>) -> bool {
    targeting.is_some_and(Targeting::is_declared)
}

/// Android ABI names as they appear in device specs (`arm64-v8a`, `x86_64`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Abi {
    /// `armeabi`
    Armeabi,
    /// `armeabi-v7a`
    ArmeabiV7a,
    /// `arm64-v8a`
    Arm64V8a,
    /// `x86`
    X86,
    /// `x86_64`
    X86_64,
    /// `mips`
    Mips,
    /// `mips64`
    Mips64,
    /// `riscv64`
    Riscv64,
}

impl Abi {
    /// Platform name of the ABI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Armeabi => "armeabi",
            Self::ArmeabiV7a => "armeabi-v7a",
            Self::Arm64V8a => "arm64-v8a",
            Self::X86 => "x86",
            Self::X86_64 => "x86_64",
            Self::Mips => "mips",
            Self::Mips64 => "mips64",
            Self::Riscv64 => "riscv64",
        }
    }
}

impl std::fmt::Display for Abi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Abi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "armeabi" => Ok(Self::Armeabi),
            "armeabi-v7a" | "armeabi_v7a" => Ok(Self::ArmeabiV7a),
            "arm64-v8a" | "arm64_v8a" => Ok(Self::Arm64V8a),
            "x86" => Ok(Self::X86),
            "x86_64" | "x86-64" => Ok(Self::X86_64),
            "mips" => Ok(Self::Mips),
            "mips64" => Ok(Self::Mips64),
            "riscv64" => Ok(Self::Riscv64),
            _ => Err(format!("Unknown ABI: {s}")),
        }
    }
}

/// Named screen density buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DensityAlias {
    /// 120 dpi
    Ldpi,
    /// 160 dpi
    Mdpi,
    /// 213 dpi
    Tvdpi,
    /// 240 dpi
    Hdpi,
    /// 320 dpi
    Xhdpi,
    /// 480 dpi
    Xxhdpi,
    /// 640 dpi
    Xxxhdpi,
}

impl DensityAlias {
    /// Density of the bucket in dots per inch.
    pub fn dpi(&self) -> u32 {
        match self {
            Self::Ldpi => 120,
            Self::Mdpi => 160,
            Self::Tvdpi => 213,
            Self::Hdpi => 240,
            Self::Xhdpi => 320,
            Self::Xxhdpi => 480,
            Self::Xxxhdpi => 640,
        }
    }
}

/// A screen density expressed either as a bucket or a raw dpi value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenDensity {
    /// A named bucket such as `xxhdpi`.
    Alias(DensityAlias),
    /// An exact density in dots per inch.
    Dpi(u32),
}

impl ScreenDensity {
    /// Density in dots per inch.
    pub fn dpi(&self) -> u32 {
        match self {
            Self::Alias(alias) => alias.dpi(),
            Self::Dpi(dpi) => *dpi,
        }
    }
}

/// Minimum platform SDK level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SdkVersion {
    /// Lowest SDK level this entry supports.
    pub min: u32,
}

/// Texture compression formats an APK may be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureCompressionFormat {
    /// ETC1 RGB8
    Etc1Rgb8,
    /// Paletted textures
    Paletted,
    /// ATI 3Dc
    ThreeDc,
    /// ATI texture compression
    Atc,
    /// LATC
    Latc,
    /// S3TC DXT1
    Dxt1,
    /// S3TC
    S3tc,
    /// `PowerVR` texture compression
    Pvrtc,
    /// ASTC
    Astc,
    /// ETC2 (implied by OpenGL ES 3.0)
    Etc2,
}

/// A device feature a module requires.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceFeature {
    /// Feature name, e.g. `android.hardware.camera` or `reqGlEsVersion`.
    pub name: String,
    /// Minimum feature version, for versioned features only.
    #[serde(default)]
    pub version: Option<u32>,
}

impl DeviceFeature {
    /// An unversioned feature requirement.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }
}

/// Coarse targeting of a whole variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantTargeting {
    /// Minimum SDK tier of the variant.
    #[serde(default)]
    pub sdk_version: Option<Targeting<SdkVersion>>,
    /// ABI family of the variant (standalone variants only).
    #[serde(default)]
    pub abi: Option<Targeting<Abi>>,
    /// Screen density of the variant (standalone variants only).
    #[serde(default)]
    pub screen_density: Option<Targeting<ScreenDensity>>,
    /// Texture compression format of the variant.
    #[serde(default)]
    pub texture_compression_format: Option<Targeting<TextureCompressionFormat>>,
}

/// Targeting of a single split APK.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApkTargeting {
    /// ABI split targeting.
    #[serde(default)]
    pub abi: Option<Targeting<Abi>>,
    /// Screen density split targeting.
    #[serde(default)]
    pub screen_density: Option<Targeting<ScreenDensity>>,
    /// Language split targeting (primary language subtags).
    #[serde(default)]
    pub language: Option<Targeting<String>>,
    /// Texture compression format split targeting.
    #[serde(default)]
    pub texture_compression_format: Option<Targeting<TextureCompressionFormat>>,
    /// SDK level targeting.
    #[serde(default)]
    pub sdk_version: Option<Targeting<SdkVersion>>,
}

impl ApkTargeting {
    /// Whether no dimension is declared (a master split).
    pub fn is_untargeted(&self) -> bool {
        !is_declared(self.abi.as_ref())
            && !is_declared(self.screen_density.as_ref())
            && !is_declared(self.language.as_ref())
            && !is_declared(self.texture_compression_format.as_ref())
            && !is_declared(self.sdk_version.as_ref())
    }
}

/// Targeting of a module as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleTargeting {
    /// Minimum SDK the module is delivered to.
    #[serde(default)]
    pub sdk_version: Option<Targeting<SdkVersion>>,
    /// Device features all required for the module.
    #[serde(default)]
    pub device_features: Vec<DeviceFeature>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abi_parsing() {
        assert_eq!("arm64-v8a".parse::<Abi>().unwrap(), Abi::Arm64V8a);
        assert_eq!("X86_64".parse::<Abi>().unwrap(), Abi::X86_64);
        assert!("sparc".parse::<Abi>().is_err());
    }

    #[test]
    fn test_fallback_detection() {
        let fallback: Targeting<Abi> = Targeting::new(vec![], vec![Abi::X86]);
        assert!(fallback.is_declared());
        assert!(fallback.is_fallback());
        assert!(!Targeting::<Abi>::default().is_declared());
    }

    #[test]
    fn test_untargeted_apk() {
        assert!(ApkTargeting::default().is_untargeted());
        let targeted = ApkTargeting {
            language: Some(Targeting::new(vec!["de".to_string()], vec![])),
            ..ApkTargeting::default()
        };
        assert!(!targeted.is_untargeted());
    }

    #[test]
    fn test_density_alias_roundtrips_through_json() {
        let density = ScreenDensity::Alias(DensityAlias::Xxhdpi);
        let json = serde_json::to_string(&density).unwrap();
        assert_eq!(json, r#"{"alias":"xxhdpi"}"#);
        assert_eq!(density.dpi(), 480);
    }
}
