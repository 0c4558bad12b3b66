//! Listing language selection.

use std::collections::BTreeSet;

/// Picks the listing language to serve.
///
/// Returns the first tag of `preferred` that is exactly present in
/// `available`, or `default_language` when none is. Tags are compared as
/// plain strings: `en-US` does not fall back to `en` unless the caller lists
/// `en` explicitly.
pub fn best_match<'a>(
    default_language: &'a str,
    available: &BTreeSet<String>,
    preferred: &'a [String],
) -> &'a str {
    preferred
        .iter()
        .find(|tag| available.contains(tag.as_str()))
        .map_or(default_language, String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(tags: &[&str]) -> BTreeSet<String> {
        tags.iter().map(ToString::to_string).collect()
    }

    fn list(tags: &[&str]) -> Vec<String> {
        tags.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_first_available_preference_wins() {
        let preferred = list(&["fr", "de"]);
        assert_eq!(best_match("en", &set(&["en", "de"]), &preferred), "de");
    }

    #[test]
    fn test_preference_order_is_respected() {
        let preferred = list(&["de", "en"]);
        assert_eq!(best_match("en", &set(&["en", "de"]), &preferred), "de");
    }

    #[test]
    fn test_region_tag_does_not_fall_back_to_language() {
        let preferred = list(&["en-US"]);
        assert_eq!(best_match("de", &set(&["en", "de"]), &preferred), "de");
        assert_eq!(best_match("en", &set(&["en"]), &preferred), "en");
    }

    #[test]
    fn test_empty_preferences_use_default() {
        assert_eq!(best_match("en", &set(&["en", "de"]), &[]), "en");
    }
}
