//! Texture compression format targeting.

use directory_schema::DeviceAttributes;
use directory_schema::targeting::{Targeting, TextureCompressionFormat};

use super::feature::{self, GL_ES_VERSION_FEATURE};
use super::resolve;

/// OpenGL ES version that guarantees ETC2 support.
const GL_ES_3_0: u32 = 0x3_0000;

/// GL extension strings and the formats they advertise.
const EXTENSION_FORMATS: &[(&str, TextureCompressionFormat)] = &[
    ("GL_OES_compressed_ETC1_RGB8_texture", TextureCompressionFormat::Etc1Rgb8),
    ("GL_OES_compressed_paletted_texture", TextureCompressionFormat::Paletted),
    ("GL_AMD_compressed_3DC_texture", TextureCompressionFormat::ThreeDc),
    ("GL_AMD_compressed_ATC_texture", TextureCompressionFormat::Atc),
    ("GL_ATI_texture_compression_atitc", TextureCompressionFormat::Atc),
    ("GL_EXT_texture_compression_latc", TextureCompressionFormat::Latc),
    ("GL_EXT_texture_compression_dxt1", TextureCompressionFormat::Dxt1),
    ("GL_EXT_texture_compression_s3tc", TextureCompressionFormat::S3tc),
    ("GL_IMG_texture_compression_pvrtc", TextureCompressionFormat::Pvrtc),
    ("GL_KHR_texture_compression_astc_ldr", TextureCompressionFormat::Astc),
];

/// Preference rank of a format; higher is better.
fn rank(format: TextureCompressionFormat) -> u8 {
    match format {
        TextureCompressionFormat::Paletted => 0,
        TextureCompressionFormat::Etc1Rgb8 => 1,
        TextureCompressionFormat::Etc2 => 2,
        TextureCompressionFormat::ThreeDc => 3,
        TextureCompressionFormat::Atc => 4,
        TextureCompressionFormat::Latc => 5,
        TextureCompressionFormat::Dxt1 => 6,
        TextureCompressionFormat::S3tc => 7,
        TextureCompressionFormat::Pvrtc => 8,
        TextureCompressionFormat::Astc => 9,
    }
}

/// Formats the device can decode, or `None` when it reported nothing that
/// would tell.
pub fn supported_formats(device: &DeviceAttributes) -> Option<Vec<TextureCompressionFormat>> {
    let gl_version = feature::version_of(device, GL_ES_VERSION_FEATURE);
    if device.gl_extensions.is_empty() && gl_version.is_none() {
        return None;
    }

    let mut formats: Vec<TextureCompressionFormat> = EXTENSION_FORMATS
        .iter()
        .filter(|(extension, _)| device.gl_extensions.iter().any(|e| e.as_str() == *extension))
        .map(|(_, format)| *format)
        .collect();
    if gl_version.is_some_and(|version| version >= GL_ES_3_0) {
        formats.push(TextureCompressionFormat::Etc2);
    }
    formats.dedup();
    Some(formats)
}

/// Matches when the entry's format is the best supported candidate. A
/// fallback entry matches when no candidate is supported.
pub fn matches(device: &DeviceAttributes, targeting: &Targeting<TextureCompressionFormat>) -> bool {
    let Some(supported) = supported_formats(device) else {
        return false;
    };
    let winner = targeting
        .candidates()
        .copied()
        .filter(|format| supported.contains(format))
        .max_by_key(|format| rank(*format));
    resolve(targeting, winner, |v| *v)
}
