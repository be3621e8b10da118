use std::path::PathBuf;

use crate::platform::Platform;

/// Every way a job can end early. Each component maps the failures of its
/// own step into one of these; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(Platform),

    #[error("failed to fetch metadata: {0}")]
    MetadataFetchFailed(String),

    #[error("failed to parse metadata: {0}")]
    MetadataParseFailed(String),

    #[error("unknown format selected: {0}")]
    UnknownRenditionSelected(String),

    #[error("download failed with exit code {exit_code}")]
    DownloadFailed { exit_code: i32 },

    #[error("transcoding failed: {reason}")]
    TranscodeFailed { reason: String },

    #[error("could not find a video URL on {0}")]
    ScrapeExtractionFailed(String),

    #[error("download finished but {} does not exist", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error)
}
