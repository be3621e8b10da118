use std::path::{Path, PathBuf};

use yt_dlp::YtDlp;

use crate::cleanup::TempArtifact;
use crate::error::JobError;
use crate::models::{RenditionCatalog, Settings};
use crate::platform::{Platform, SourceUrl};
use crate::resolver;
use crate::scrape::{self, Preference};
use crate::selector::{self, SelectionMenu, TIERS};
use crate::transcode::{parse_quality, Transcoder};
use crate::workers::download::{execute, DownloadJob, Update};

/// Everything known about a URL before the operator picks a rendition.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub source: SourceUrl,
    pub catalog: RenditionCatalog,
    pub menu: SelectionMenu
}

/// One job at a time: each step finishes before the next starts, and a
/// failing step ends the job after its temp files are removed.
pub struct Pipeline {
    settings: Settings,
    yt_dlp: YtDlp,
    transcoder: Transcoder,
    http: reqwest::Client
}

impl Pipeline {
    pub fn new(settings: Settings) -> Self {
        Self {
            yt_dlp: settings.yt_dlp(),
            transcoder: Transcoder::new(settings.ffmpeg_binary()),
            http: reqwest::Client::new(),
            settings
        }
    }

    pub async fn check_tools(&self) {
        match self.yt_dlp.check_binary().await {
            Ok(version) => tracing::info!("yt-dlp version: {}", version),
            Err(e) => tracing::warn!("yt-dlp not found or not executable: {}", e)
        }
    }

    /// Classify, resolve and build the menu.
    pub async fn inspect(&self, raw_url: &str) -> Result<Inspection, JobError> {
        let source = supported_source(raw_url)?;
        let catalog = resolver::resolve(&self.yt_dlp, &source).await?;
        let menu = selector::select(&catalog, &TIERS);

        Ok(Inspection { source, catalog, menu })
    }

    /// Downloads the chosen rendition and names the result after the title
    /// and rendition id.
    pub async fn download(
        &self,
        inspection: &Inspection,
        choice: &str,
        on_update: impl FnMut(Update)
    ) -> Result<PathBuf, JobError> {
        let rendition = selector::resolve_choice(&inspection.catalog, choice)?;

        let dir = self.output_dir().await?;
        let temp = TempArtifact::acquire(dir, format!("temp_{}", timestamp()));
        let job = DownloadJob::for_rendition(inspection.source.clone(), rendition, temp.template());

        let artifact = execute(&self.yt_dlp, &job, on_update).await?;
        if !temp.owns(&artifact) {
            tracing::warn!("Tool reported {} outside the job's temp files", artifact.display());
        }

        let final_path = dir.join(format!(
            "{}_{}.{}",
            inspection.catalog.title,
            rendition.id,
            job.final_extension(rendition)
        ));
        temp.promote(&artifact, &final_path).await.map_err(JobError::from)
    }

    /// Downloads to a temp file and transcodes it to `format` at `quality`.
    pub async fn convert(
        &self,
        raw_url: &str,
        format: &str,
        quality: &str,
        on_update: impl FnMut(Update)
    ) -> Result<PathBuf, JobError> {
        let source = supported_source(raw_url)?;

        let dir = self.output_dir().await?;
        let ts = timestamp();
        let temp = TempArtifact::acquire(dir, format!("temp_{ts}"));
        let temp_path = temp.path("mp4");
        let output = dir.join(format!("video_{ts}.{}", format.trim().to_ascii_lowercase()));

        let input = match source.platform() {
            Platform::Tiktok => {
                scrape::fetch_to(&self.http, &source, Preference::SourceElement, &temp_path).await?;
                temp_path
            }
            Platform::Instagram => {
                scrape::fetch_to(&self.http, &source, Preference::OpenGraph, &temp_path).await?;
                temp_path
            }
            Platform::Youtube | Platform::Facebook | Platform::Twitter | Platform::Unknown => {
                let job = DownloadJob::for_quality(source.clone(), parse_quality(quality), temp_path);
                execute(&self.yt_dlp, &job, on_update).await?
            }
        };

        if let Err(e) = self.transcoder.transcode(&input, &output, format, quality).await {
            remove_partial(&output).await;
            return Err(e);
        }

        if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
            return Err(JobError::ArtifactMissing(output));
        }

        temp.finish();
        Ok(output)
    }

    async fn output_dir(&self) -> Result<&Path, JobError> {
        tokio::fs::create_dir_all(&self.settings.output_dir).await?;
        Ok(&self.settings.output_dir)
    }
}

fn supported_source(raw_url: &str) -> Result<SourceUrl, JobError> {
    let source = SourceUrl::parse(raw_url)?;
    if source.platform() == Platform::Unknown {
        return Err(JobError::UnsupportedPlatform(Platform::Unknown));
    }
    Ok(source)
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::info!("Removed partial output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove partial output {}: {}", path.display(), e)
    }
}

fn timestamp() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::tests::{client_for, respond, serve};

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .flatten()
                    .map(|e| e.file_name().to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    fn scraping_pipeline(dir: &tempfile::TempDir, host: &str, addr: std::net::SocketAddr) -> Pipeline {
        let mut pipeline = Pipeline::new(Settings {
            output_dir: dir.path().join("downloads"),
            ytdlp_path: PathBuf::from("/nonexistent/yt-dlp"),
            ffmpeg_path: None
        });
        pipeline.http = client_for(host, addr);
        pipeline
    }

    #[tokio::test]
    async fn test_convert_scrape_without_video_url_leaves_nothing() {
        let addr = serve(vec![("/@user/video/1", respond("text/html", b"<html><body>gone</body></html>"))]).await;
        let dir = tempfile::TempDir::new().unwrap();
        let pipeline = scraping_pipeline(&dir, "www.tiktok.com", addr);

        let url = format!("http://www.tiktok.com:{}/@user/video/1?is_from_webapp=1", addr.port());
        let err = pipeline.convert(&url, "mp4", "720p", |_| {}).await.unwrap_err();

        assert!(matches!(err, JobError::ScrapeExtractionFailed(_)));
        assert!(files_in(&dir.path().join("downloads")).is_empty());
    }

    #[tokio::test]
    async fn test_convert_truncated_stream_removes_temp_file() {
        let html = br#"<html><head><meta property="og:video" content="/media/og.mp4"></head></html>"#;
        let mut truncated =
            b"HTTP/1.1 200 OK\r\nContent-Type: video/mp4\r\nContent-Length: 100000\r\nConnection: close\r\n\r\n"
                .to_vec();
        truncated.extend_from_slice(&[1u8; 4096]);
        let addr = serve(vec![("/reel/xyz/", respond("text/html", html)), ("/media/og.mp4", truncated)]).await;
        let dir = tempfile::TempDir::new().unwrap();
        let pipeline = scraping_pipeline(&dir, "www.instagram.com", addr);

        let url = format!("http://www.instagram.com:{}/reel/xyz/", addr.port());
        let err = pipeline.convert(&url, "mp4", "720p", |_| {}).await.unwrap_err();

        assert!(matches!(err, JobError::Http(_)));
        assert!(files_in(&dir.path().join("downloads")).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_platform_is_rejected_before_any_work() {
        let dir = tempfile::TempDir::new().unwrap();
        let pipeline = Pipeline::new(Settings {
            output_dir: dir.path().join("downloads"),
            ytdlp_path: PathBuf::from("/nonexistent/yt-dlp"),
            ffmpeg_path: None
        });

        let err = pipeline.inspect("https://vimeo.com/1").await.unwrap_err();
        assert!(matches!(err, JobError::UnsupportedPlatform(Platform::Unknown)));

        let err = pipeline.convert("https://vimeo.com/1", "mp4", "720p", |_| {}).await.unwrap_err();
        assert!(matches!(err, JobError::UnsupportedPlatform(_)));
        assert!(!dir.path().join("downloads").exists());
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let pipeline = Pipeline::new(Settings {
            output_dir: PathBuf::from("downloads"),
            ytdlp_path: PathBuf::from("yt-dlp"),
            ffmpeg_path: None
        });
        assert!(matches!(pipeline.inspect("nope").await, Err(JobError::InvalidUrl(_))));
    }

    #[cfg(unix)]
    mod end_to_end {
        use std::os::unix::fs::PermissionsExt;

        use tempfile::TempDir;

        use super::*;

        const CATALOG: &str = r#"{"id":"abc123","title":"My Clip","formats":[{"format_id":"140","ext":"m4a","vcodec":"none","acodec":"mp4a.40.2","abr":128,"filesize":3145728},{"format_id":"22","ext":"mp4","height":720,"vcodec":"avc1","acodec":"none","filesize":10485760}]}"#;

        /// Fake yt-dlp: metadata mode prints the catalog; download mode logs
        /// its arguments, announces a destination, writes the file, exits
        /// with `exit_code`.
        fn fake_ytdlp(dir: &Path, exit_code: i32) -> PathBuf {
            let script = format!(
                r#"#!/bin/sh
for a in "$@"; do
  if [ "$a" = "--dump-single-json" ]; then
    echo '{CATALOG}'
    exit 0
  fi
done
echo "$@" > "{log}"
tmpl=""
prev=""
for a in "$@"; do
  if [ "$prev" = "-o" ]; then tmpl="$a"; fi
  prev="$a"
done
out=$(echo "$tmpl" | sed -e 's/%(format_id)s/22+140/' -e 's/%(ext)s/mp4/')
echo "[download] Destination: $out"
echo "[download]  50.0% of 10.00MiB at 1.00MiB/s ETA 00:05"
echo "partial" > "$out.part"
if [ {exit_code} -ne 0 ]; then
  echo "ERROR: transfer failed" >&2
  exit {exit_code}
fi
rm -f "$out.part"
echo "video" > "$out"
echo "[download] 100.0% of 10.00MiB at 1.00MiB/s ETA 00:00"
"#,
                log = dir.join("args.log").display()
            );
            let path = dir.join("yt-dlp");
            std::fs::write(&path, script).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        /// Fake ffmpeg: logs its arguments and writes the last one.
        fn fake_ffmpeg(dir: &Path) -> PathBuf {
            let path = dir.join("ffmpeg");
            let script = format!(
                "#!/bin/sh\necho \"$@\" > \"{}\"\nfor last; do :; done\necho converted > \"$last\"\n",
                dir.join("ffmpeg.log").display()
            );
            std::fs::write(&path, script).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn pipeline(dir: &TempDir, exit_code: i32) -> Pipeline {
            Pipeline::new(Settings {
                output_dir: dir.path().join("downloads"),
                ytdlp_path: fake_ytdlp(dir.path(), exit_code),
                ffmpeg_path: None
            })
        }

        #[tokio::test]
        async fn test_youtube_download_end_to_end() {
            let dir = TempDir::new().unwrap();
            let pipeline = pipeline(&dir, 0);

            let inspection = pipeline.inspect("https://www.youtube.com/watch?v=abc123").await.unwrap();
            assert_eq!(inspection.source.platform(), Platform::Youtube);
            assert_eq!(inspection.menu.video_choices(), vec![("📹 720p | mp4 | 10.00 MB", "22")]);
            assert_eq!(inspection.menu.audio_choices(), vec![("🎵 Audio | m4a | 128 kbps | 3.00 MB", "140")]);

            let mut progress = Vec::new();
            let path = pipeline
                .download(&inspection, "22", |u| {
                    if let Update::Progress(p) = u {
                        progress.push(p.percent);
                    }
                })
                .await
                .unwrap();

            assert_eq!(path, dir.path().join("downloads").join("My Clip_22.mp4"));
            assert!(path.exists());
            assert_eq!(files_in(&dir.path().join("downloads")), vec!["My Clip_22.mp4"]);
            assert_eq!(progress, vec![50.0, 100.0]);

            let args = std::fs::read_to_string(dir.path().join("args.log")).unwrap();
            assert!(args.contains("-f 22+bestaudio[ext=m4a]/bestaudio"));
            assert!(args.contains("--merge-output-format mp4"));
            assert!(args.contains("--newline"));
            assert!(args.contains("%(format_id)s.%(ext)s"));
        }

        #[tokio::test]
        async fn test_failed_transfer_leaves_nothing_behind() {
            let dir = TempDir::new().unwrap();
            let pipeline = pipeline(&dir, 1);

            let inspection = pipeline.inspect("https://www.youtube.com/watch?v=abc123").await.unwrap();
            let mut diagnostics = Vec::new();
            let err = pipeline
                .download(&inspection, "22", |u| {
                    if let Update::Diagnostic(d) = u {
                        diagnostics.push(d);
                    }
                })
                .await
                .unwrap_err();

            assert!(matches!(err, JobError::DownloadFailed { exit_code: 1 }));
            assert_eq!(diagnostics, vec!["ERROR: transfer failed"]);
            assert!(files_in(&dir.path().join("downloads")).is_empty());
        }

        #[tokio::test]
        async fn test_unknown_choice_has_no_side_effects() {
            let dir = TempDir::new().unwrap();
            let pipeline = pipeline(&dir, 0);

            let inspection = pipeline.inspect("https://youtu.be/abc123").await.unwrap();
            let err = pipeline.download(&inspection, "999", |_| {}).await.unwrap_err();

            assert!(matches!(err, JobError::UnknownRenditionSelected(_)));
            assert!(!dir.path().join("args.log").exists());
            assert!(!dir.path().join("downloads").exists());
        }

        #[tokio::test]
        async fn test_convert_cleans_temp_when_transcode_fails() {
            let dir = TempDir::new().unwrap();
            let mut pipeline = pipeline(&dir, 0);
            pipeline.transcoder = Transcoder::new("/nonexistent/ffmpeg");

            let err = pipeline
                .convert("https://www.youtube.com/watch?v=abc123", "webm", "480p", |_| {})
                .await
                .unwrap_err();

            assert!(matches!(err, JobError::TranscodeFailed { .. }));
            assert!(files_in(&dir.path().join("downloads")).is_empty());

            let args = std::fs::read_to_string(dir.path().join("args.log")).unwrap();
            assert!(args.contains("bestvideo[height<=480]+bestaudio/best[height<=480]"));
        }

        #[tokio::test]
        async fn test_convert_end_to_end() {
            let dir = TempDir::new().unwrap();
            let mut pipeline = pipeline(&dir, 0);
            pipeline.transcoder = Transcoder::new(fake_ffmpeg(dir.path()));

            let path = pipeline
                .convert("https://twitter.com/u/status/1", "gif", "360p", |_| {})
                .await
                .unwrap();

            let name = path.file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with("video_") && name.ends_with(".gif"), "{name}");
            assert_eq!(files_in(&dir.path().join("downloads")), vec![name]);
        }

        #[tokio::test]
        async fn test_tiktok_convert_scrapes_then_transcodes() {
            let html = br#"<html><body><video><source src="/media/v.mp4"></video></body></html>"#;
            let addr = serve(vec![
                ("/@user/video/1", respond("text/html", html)),
                ("/media/v.mp4", respond("video/mp4", b"raw video bytes"))
            ])
            .await;
            let dir = TempDir::new().unwrap();
            let mut pipeline = scraping_pipeline(&dir, "www.tiktok.com", addr);
            pipeline.transcoder = Transcoder::new(fake_ffmpeg(dir.path()));

            let url = format!("http://www.tiktok.com:{}/@user/video/1?lang=en", addr.port());
            let path = pipeline.convert(&url, "webm", "480p", |_| {}).await.unwrap();

            let name = path.file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with("video_") && name.ends_with(".webm"), "{name}");
            assert_eq!(files_in(&dir.path().join("downloads")), vec![name]);

            let args = std::fs::read_to_string(dir.path().join("ffmpeg.log")).unwrap();
            assert!(args.contains("scale=-2:480"));
            assert!(args.contains("temp_"));
            assert!(!dir.path().join("args.log").exists());
        }
    }
}
