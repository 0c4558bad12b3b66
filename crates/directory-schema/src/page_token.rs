//! Opaque `ListAppListings` continuation tokens.
//!
//! A token is the postcard encoding of [`PageToken`] wrapped in padded
//! base64url. Clients must treat it as opaque.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The provided page token could not be used.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PageTokenError {
    /// Not valid base64url.
    #[error("provided page token is invalid: not base64url")]
    Encoding,
    /// Not a valid token message.
    #[error("provided page token is invalid: malformed")]
    Malformed,
    /// Missing the last app ID.
    #[error("provided page token is invalid: no position")]
    MissingPosition,
    /// The token could not be serialized.
    #[error("failed to encode page token: {0}")]
    Serialize(String),
}

/// Cursor position of a listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageToken {
    /// Last app ID scanned by the previous page.
    pub last_app_id: Option<String>,
}

impl PageToken {
    /// A token positioned after the given app.
    pub fn after(app_id: impl Into<String>) -> Self {
        Self {
            last_app_id: Some(app_id.into()),
        }
    }

    /// Encode into the opaque string form.
    ///
    /// # Errors
    ///
    /// Returns [`PageTokenError::Serialize`] if postcard rejects the token.
    pub fn encode(&self) -> Result<String, PageTokenError> {
        let bytes =
            postcard::to_allocvec(self).map_err(|err| PageTokenError::Serialize(err.to_string()))?;
        Ok(URL_SAFE.encode(bytes))
    }

    /// Decode the opaque string form, returning the last scanned app ID.
    ///
    /// # Errors
    ///
    /// Returns a [`PageTokenError`] if the token is not base64url, is not a
    /// valid token message, or carries no position.
    pub fn decode(token: &str) -> Result<String, PageTokenError> {
        let bytes = URL_SAFE
            .decode(token)
            .map_err(|_| PageTokenError::Encoding)?;
        let token: Self = postcard::from_bytes(&bytes).map_err(|_| PageTokenError::Malformed)?;
        token.last_app_id.ok_or(PageTokenError::MissingPosition)
    }
}
