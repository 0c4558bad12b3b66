//! Download planning: turns selected split paths into download descriptors.

use std::collections::BTreeSet;

use directory_schema::SplitArtifact;
use directory_schema::api::{AppDownloadInfo, SplitDownloadInfo};
use thiserror::Error;

/// A selected split has no stored artifact.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PlanError {
    /// The split path is absent from the stored artifacts.
    #[error("referenced storage object not found in database: {0}")]
    MissingArtifact(String),
}

/// Builds object download URLs.
#[derive(Debug, Clone)]
pub struct ArtifactUrls {
    base_url: String,
}

impl ArtifactUrls {
    /// URLs rooted at `base_url`; a trailing slash is ignored.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// Download URL of an object.
    pub fn object_url(&self, object_id: &str) -> String {
        format!("{}/{object_id}", self.base_url)
    }
}

/// Resolves every selected path against `artifacts`, typically the ones a
/// [`crate::StoreTxn::get_split_artifacts`] lookup returned for the selection.
///
/// # Errors
///
/// Returns [`PlanError::MissingArtifact`] for the first selected path without
/// a stored artifact.
pub fn plan(
    selected: &BTreeSet<String>,
    artifacts: &[SplitArtifact],
    urls: &ArtifactUrls,
) -> Result<AppDownloadInfo, PlanError> {
    let split_download_info = selected
        .iter()
        .map(|path| {
            artifacts
                .iter()
                .find(|artifact| artifact.id == *path)
                .map(|artifact| SplitDownloadInfo {
                    download_size: artifact.uncompressed_size,
                    url: urls.object_url(&artifact.id),
                })
                .ok_or_else(|| PlanError::MissingArtifact(path.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let download_size = split_download_info.iter().map(|s| s.download_size).sum();

    Ok(AppDownloadInfo {
        download_size,
        split_download_info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifacts() -> Vec<SplitArtifact> {
        vec![
            SplitArtifact {
                id: "38119a8c-1163-4c7d-89c6-cc5c902a6ca1".into(),
                uncompressed_size: 4_558_309,
            },
            SplitArtifact {
                id: "a4f60d94-e402-475d-9e6e-f4585ef13da2".into(),
                uncompressed_size: 44_897,
            },
            SplitArtifact {
                id: "d24e0b69-a011-42ed-835e-17d1557fd10a".into(),
                uncompressed_size: 45_514,
            },
        ]
    }

    fn selected(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_total_is_sum_of_splits() {
        let urls = ArtifactUrls::new("https://artifacts.example.com/");
        let info = plan(
            &selected(&[
                "38119a8c-1163-4c7d-89c6-cc5c902a6ca1",
                "a4f60d94-e402-475d-9e6e-f4585ef13da2",
                "d24e0b69-a011-42ed-835e-17d1557fd10a",
            ]),
            &artifacts(),
            &urls,
        )
        .unwrap();
        assert_eq!(info.download_size, 4_648_720);
        assert_eq!(
            info.download_size,
            info.split_download_info.iter().map(|s| s.download_size).sum::<u64>()
        );
        assert!(info.split_download_info.iter().any(|s| {
            s.url == "https://artifacts.example.com/38119a8c-1163-4c7d-89c6-cc5c902a6ca1"
        }));
    }

    #[test]
    fn test_unresolvable_split_is_an_error() {
        let urls = ArtifactUrls::new("https://artifacts.example.com");
        let err = plan(&selected(&["missing"]), &artifacts(), &urls).unwrap_err();
        assert_eq!(err, PlanError::MissingArtifact("missing".into()));
    }
}
