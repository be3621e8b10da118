use std::path::PathBuf;

use tokio_stream::StreamExt;
use yt_dlp::{Container, DownloadEvent, DownloadOptions, DownloadProgress, OutputFormat, YtDlp};

use crate::error::JobError;
use crate::models::Rendition;
use crate::platform::SourceUrl;

/// What the executor reports while a transfer runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Progress(DownloadProgress),
    /// Destination and merge announcements, verbatim.
    Info(String),
    /// Tool stderr. Informational only; the exit code decides success.
    Diagnostic(String)
}

#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub source: SourceUrl,
    pub format_selector: String,
    pub merge: bool,
    pub output_template: PathBuf
}

impl DownloadJob {
    /// Downloads one chosen rendition. Split-stream sources get the best m4a
    /// audio merged in and are remuxed to mp4.
    pub fn for_rendition(source: SourceUrl, rendition: &Rendition, output_template: PathBuf) -> Self {
        let merge = !source.platform().has_merged_streams();
        let format_selector = if merge {
            format!("{}+bestaudio[ext=m4a]/bestaudio", rendition.id)
        } else {
            rendition.id.clone()
        };

        Self {
            source,
            format_selector,
            merge,
            output_template
        }
    }

    /// Best video up to `max_height` (uncapped when `None`) merged with the
    /// best audio.
    pub fn for_quality(source: SourceUrl, max_height: Option<u32>, output: PathBuf) -> Self {
        let format_selector = match max_height {
            Some(h) => format!("bestvideo[height<={h}]+bestaudio/best[height<={h}]"),
            None => "bestvideo+bestaudio/best".to_string()
        };

        Self {
            source,
            format_selector,
            merge: true,
            output_template: output
        }
    }

    pub fn options(&self) -> DownloadOptions {
        let options = DownloadOptions::new().format(OutputFormat::Custom(self.format_selector.clone()));
        if self.merge {
            options.container(Container::Mp4)
        } else {
            options
        }
    }

    /// Extension of the finished file.
    pub fn final_extension<'a>(&self, rendition: &'a Rendition) -> &'a str {
        if self.merge {
            "mp4"
        } else {
            rendition.ext.as_str()
        }
    }
}

/// Runs the transfer to completion, forwarding updates, and returns the path
/// of the file the tool reported last after checking it exists.
pub async fn execute(
    yt_dlp: &YtDlp,
    job: &DownloadJob,
    mut on_update: impl FnMut(Update)
) -> Result<PathBuf, JobError> {
    tracing::info!("Starting download of {} with format {}", job.source, job.format_selector);

    let mut stream = yt_dlp.download_with_progress(job.source.as_str(), &job.output_template, &job.options());
    let mut artifact: Option<PathBuf> = None;

    while let Some(event) = stream.next().await {
        match event {
            Ok(DownloadEvent::Extracting { url }) => {
                tracing::debug!("Extracting {}", url);
            }
            Ok(DownloadEvent::Destination { line, filename }) => {
                tracing::debug!("Destination: {}", filename);
                on_update(Update::Info(line));
            }
            Ok(DownloadEvent::Progress(progress)) => on_update(Update::Progress(progress)),
            Ok(DownloadEvent::MergingFormats { filename }) => {
                let target = filename.as_deref().unwrap_or("output");
                on_update(Update::Info(format!("Merging formats into {target}")));
            }
            Ok(DownloadEvent::Diagnostic { message }) => on_update(Update::Diagnostic(message)),
            Ok(DownloadEvent::Finished { filename }) => {
                artifact = Some(PathBuf::from(filename));
            }
            Err(yt_dlp::Error::DownloadFailed { code }) => {
                tracing::error!("Download of {} failed with exit code {}", job.source, code);
                return Err(JobError::DownloadFailed { exit_code: code });
            }
            Err(yt_dlp::Error::ExecutionFailed(e)) => return Err(JobError::Io(e)),
            Err(e) => {
                tracing::error!("Download stream error for {}: {}", job.source, e);
                return Err(JobError::DownloadFailed { exit_code: -1 });
            }
        }
    }

    let artifact = artifact.unwrap_or_else(|| job.output_template.clone());
    if !tokio::fs::try_exists(&artifact).await.unwrap_or(false) {
        tracing::error!("Download finished but no file at {}", artifact.display());
        return Err(JobError::ArtifactMissing(artifact));
    }

    tracing::info!("Download finished: {}", artifact.display());
    Ok(artifact)
}
