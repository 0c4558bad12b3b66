//! Language split targeting.

use directory_schema::DeviceAttributes;
use directory_schema::device::primary_language;
use directory_schema::targeting::Targeting;

use super::resolve;

/// Matches when the entry's language is the device's most preferred language
/// among the candidates. A fallback entry matches when the device speaks none
/// of the alternatives.
///
/// Languages are compared on their primary subtag.
pub fn matches(device: &DeviceAttributes, targeting: &Targeting<String>) -> bool {
    let languages = device.languages();
    if languages.is_empty() {
        return false;
    }
    let winner = languages
        .into_iter()
        .find(|language| targeting.candidates().any(|c| primary_language(c) == *language));
    resolve(targeting, winner, |v| primary_language(v))
}
