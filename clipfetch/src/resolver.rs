use yt_dlp::YtDlp;

use crate::error::JobError;
use crate::models::RenditionCatalog;
use crate::platform::SourceUrl;

/// Fetches the source's metadata with one extraction run and normalizes it.
/// A failed run is returned as-is; callers decide whether to try again.
pub async fn resolve(yt_dlp: &YtDlp, source: &SourceUrl) -> Result<RenditionCatalog, JobError> {
    tracing::info!("Fetching formats for {} ({})", source, source.platform());

    let info = yt_dlp.get_video_info(source.as_str()).await.map_err(|e| match e {
        yt_dlp::Error::JsonParseFailed(e) => JobError::MetadataParseFailed(e.to_string()),
        other => JobError::MetadataFetchFailed(other.to_string())
    })?;

    let catalog = RenditionCatalog::from_video_info(&info);
    tracing::info!(
        "Resolved \"{}\": {} of {} formats selectable",
        catalog.title,
        catalog.renditions.len(),
        info.formats.len()
    );

    Ok(catalog)
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;

    fn stub(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("yt-dlp");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn source() -> SourceUrl {
        SourceUrl::parse("https://www.youtube.com/watch?v=abc123").unwrap()
    }

    #[tokio::test]
    async fn test_resolve_normalizes_formats() {
        let dir = TempDir::new().unwrap();
        let bin = stub(
            &dir,
            r#"echo '{"id":"abc123","title":"Clip: one","formats":[{"format_id":"22","ext":"mp4","height":720,"vcodec":"avc1","acodec":"mp4a","filesize":10},{"format_id":"x","ext":"mp4"}]}'"#
        );
        let catalog = resolve(&YtDlp::with_binary(bin), &source()).await.unwrap();
        assert_eq!(catalog.title, "Clip one");
        assert_eq!(catalog.renditions.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_drops_entries_without_ids() {
        let dir = TempDir::new().unwrap();
        let bin = stub(
            &dir,
            r#"echo '{"title":"Clip","formats":[{"ext":"mhtml","url":"x"},{"format_id":"22","ext":"mp4","height":720,"vcodec":"avc1","acodec":"mp4a","filesize":10}]}'"#
        );
        let catalog = resolve(&YtDlp::with_binary(bin), &source()).await.unwrap();
        assert_eq!(catalog.title, "Clip");
        assert_eq!(catalog.renditions.len(), 1);
        assert_eq!(catalog.renditions[0].id, "22");
    }

    #[tokio::test]
    async fn test_resolve_nonzero_exit_is_fetch_failure() {
        let dir = TempDir::new().unwrap();
        let bin = stub(&dir, "echo 'ERROR: Video unavailable' >&2\nexit 1");
        let err = resolve(&YtDlp::with_binary(bin), &source()).await.unwrap_err();
        assert!(matches!(err, JobError::MetadataFetchFailed(ref msg) if msg.contains("Video unavailable")));
    }

    #[tokio::test]
    async fn test_resolve_malformed_output_is_parse_failure() {
        let dir = TempDir::new().unwrap();
        let bin = stub(&dir, "echo 'not json'");
        let err = resolve(&YtDlp::with_binary(bin), &source()).await.unwrap_err();
        assert!(matches!(err, JobError::MetadataParseFailed(_)));
    }

    #[tokio::test]
    async fn test_resolve_missing_title_is_parse_failure() {
        let dir = TempDir::new().unwrap();
        let bin = stub(&dir, r#"echo '{"id":"abc123","formats":[]}'"#);
        let err = resolve(&YtDlp::with_binary(bin), &source()).await.unwrap_err();
        assert!(matches!(err, JobError::MetadataParseFailed(_)));
    }

    #[tokio::test]
    async fn test_resolve_missing_binary_is_fetch_failure() {
        let client = YtDlp::with_binary("/nonexistent/yt-dlp");
        let err = resolve(&client, &source()).await.unwrap_err();
        assert!(matches!(err, JobError::MetadataFetchFailed(_)));
    }
}
