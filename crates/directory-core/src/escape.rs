//! Path-safe escaping of split identifiers.
//!
//! Split paths double as object-storage IDs and may contain characters that
//! are not valid in a single path segment. Selection runs over escaped
//! identifiers (padded base64url) and the result is decoded afterwards.

use std::collections::BTreeSet;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use directory_schema::Manifest;
use thiserror::Error;

use crate::select::Selection;

/// An escaped identifier could not be decoded.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EscapeError {
    /// Not valid base64url.
    #[error("split identifier {0:?} is not a valid escaped path")]
    Encoding(String),
    /// Decoded bytes are not UTF-8.
    #[error("split identifier {0:?} does not decode to text")]
    Utf8(String),
}

/// Escapes a split identifier into a single path-safe segment.
pub fn escape(id: &str) -> String {
    URL_SAFE.encode(id.as_bytes())
}

/// Reverses [`escape`].
///
/// # Errors
///
/// Returns an [`EscapeError`] if `token` was not produced by [`escape`].
pub fn unescape(token: &str) -> Result<String, EscapeError> {
    let bytes = URL_SAFE
        .decode(token)
        .map_err(|_| EscapeError::Encoding(token.to_string()))?;
    String::from_utf8(bytes).map_err(|_| EscapeError::Utf8(token.to_string()))
}

/// Escapes every split path of the manifest in place.
pub fn escape_manifest(manifest: &mut Manifest) {
    for apk in manifest.apk_descriptions_mut() {
        apk.path = escape(&apk.path);
    }
}

/// Decodes the split identifiers of a selection made over an escaped manifest.
///
/// # Errors
///
/// Returns an [`EscapeError`] if any identifier is not an escaped path.
pub fn unescape_selection(selection: Selection) -> Result<Selection, EscapeError> {
    match selection {
        Selection::Incompatible => Ok(Selection::Incompatible),
        Selection::Compatible(paths) => {
            let decoded = paths
                .iter()
                .map(|path| unescape(path))
                .collect::<Result<BTreeSet<_>, _>>()?;
            Ok(Selection::Compatible(decoded))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_is_path_safe_and_lossless() {
        let id = "splits/base-master.apk";
        let escaped = escape(id);
        assert!(!escaped.contains('/'));
        assert!(!escaped.contains('+'));
        assert_eq!(unescape(&escaped).unwrap(), id);
    }

    #[test]
    fn test_unescape_rejects_foreign_tokens() {
        assert!(matches!(unescape("not base64!"), Err(EscapeError::Encoding(_))));
        assert!(matches!(unescape(&URL_SAFE.encode([0xff, 0xfe])), Err(EscapeError::Utf8(_))));
    }

    #[test]
    fn test_incompatible_selection_passes_through() {
        assert_eq!(unescape_selection(Selection::Incompatible).unwrap(), Selection::Incompatible);
    }
}
