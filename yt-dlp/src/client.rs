use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::LazyLock;

use futures_core::Stream;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::command::CommandBuilder;
use crate::error::{Error, Result};
use crate::types::{DownloadEvent, DownloadOptions, DownloadProgress, VideoInfo};

static PROGRESS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<percent>\d+(?:\.\d+)?)%\s+of\s+~?\s*(?P<total>\S+)\s+at\s+(?P<rate>.+?)\s+ETA\s+(?P<eta>\S+)"
    )
    .expect("progress pattern compiles")
});

#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
    ffmpeg_location: Option<PathBuf>
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlp {
    pub fn new() -> Self {
        Self::with_binary("yt-dlp")
    }

    pub fn with_binary(path: impl Into<PathBuf>) -> Self {
        Self {
            binary: path.into(),
            ffmpeg_location: None
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn set_ffmpeg_location(&mut self, path: Option<PathBuf>) {
        self.ffmpeg_location = path;
    }

    pub async fn check_binary(&self) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .await?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(Error::BinaryNotExecutable(self.binary.clone()))
        }
    }

    /// Runs the tool once in single-JSON mode and decodes its stdout.
    pub async fn get_video_info(&self, url: &str) -> Result<VideoInfo> {
        let builder = self
            .command()
            .single_json()
            .no_playlist()
            .url(url);

        tracing::debug!(
            binary = %self.binary.display(),
            args = ?builder.get_args(),
            "spawning yt-dlp for metadata"
        );

        let output = builder.build().output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(Error::CommandFailed {
                code: output.status.code().unwrap_or(-1),
                stderr
            });
        }

        let info: VideoInfo = serde_json::from_slice(&output.stdout)?;
        Ok(info)
    }

    /// Spawns one download and streams its events. The stream ends with
    /// `Finished` on a zero exit and with `Error::DownloadFailed` otherwise.
    pub fn download_with_progress(
        &self,
        url: &str,
        output: impl AsRef<Path>,
        options: &DownloadOptions
    ) -> Pin<Box<dyn Stream<Item = Result<DownloadEvent>> + Send + '_>> {
        let output_path = output.as_ref().to_path_buf();
        let url = url.to_string();
        let builder = self
            .command()
            .with_options(options)
            .output(&output_path)
            .newline_progress()
            .url(&url);
        let binary = self.binary.clone();

        Box::pin(async_stream::try_stream! {
            yield DownloadEvent::Extracting { url: url.clone() };

            tracing::debug!(
                binary = %binary.display(),
                args = ?builder.get_args(),
                "spawning yt-dlp"
            );

            let mut cmd = builder.build();
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());

            let mut child = cmd.spawn()?;

            let stdout = child.stdout.take().ok_or_else(|| uncaptured("stdout"))?;
            let stderr = child.stderr.take().ok_or_else(|| uncaptured("stderr"))?;
            let mut stdout_lines = BufReader::new(stdout).lines();
            let mut stderr_lines = BufReader::new(stderr).lines();
            let mut stdout_open = true;
            let mut stderr_open = true;

            let mut current_filename: Option<String> = None;

            while stdout_open || stderr_open {
                let next: std::io::Result<(Pipe, Option<String>)> = tokio::select! {
                    line = stdout_lines.next_line(), if stdout_open => line.map(|l| (Pipe::Stdout, l)),
                    line = stderr_lines.next_line(), if stderr_open => line.map(|l| (Pipe::Stderr, l))
                };

                let event = match next? {
                    (Pipe::Stdout, Some(line)) => {
                        tracing::trace!(line = %line, "yt-dlp stdout");
                        parse_progress_line(&line, &mut current_filename)
                    }
                    (Pipe::Stderr, Some(line)) => {
                        tracing::trace!(line = %line, "yt-dlp stderr");
                        Some(DownloadEvent::Diagnostic { message: line })
                    }
                    (Pipe::Stdout, None) => {
                        stdout_open = false;
                        None
                    }
                    (Pipe::Stderr, None) => {
                        stderr_open = false;
                        None
                    }
                };

                if let Some(event) = event {
                    yield event;
                }
            }

            let status = child.wait().await?;

            if !status.success() {
                let code = status.code().unwrap_or(-1);
                Err::<(), Error>(Error::DownloadFailed { code })?;
            }

            let filename = current_filename
                .unwrap_or_else(|| output_path.to_string_lossy().to_string());
            yield DownloadEvent::Finished { filename };
        })
    }

    fn command(&self) -> CommandBuilder {
        CommandBuilder::new(&self.binary).ffmpeg_location_opt(self.ffmpeg_location.as_ref())
    }
}

#[derive(Debug, Clone, Copy)]
enum Pipe {
    Stdout,
    Stderr
}

fn uncaptured(stream: &str) -> Error {
    Error::ExecutionFailed(std::io::Error::other(format!("{stream} not captured")))
}

fn parse_progress_line(line: &str, current_filename: &mut Option<String>) -> Option<DownloadEvent> {
    let line = line.trim();

    if let Some(filename) = line.strip_prefix("[download] Destination:") {
        let filename = filename.trim().to_string();
        *current_filename = Some(filename.clone());
        return Some(DownloadEvent::Destination {
            line: line.to_string(),
            filename
        });
    }

    if let Some(progress) = parse_download_progress(line) {
        return Some(DownloadEvent::Progress(progress));
    }

    if line.starts_with("[Merger]") || line.contains("Merging formats") {
        let mut filename = None;
        if let Some(start) = line.find('"')
            && let Some(end) = line.rfind('"')
            && end > start
        {
            filename = Some(line[start + 1..end].to_string());
            current_filename.clone_from(&filename);
        }
        return Some(DownloadEvent::MergingFormats { filename });
    }

    if let Some(rest) = line.strip_prefix("[download]")
        && let Some(filename) = rest.strip_suffix("has already been downloaded")
    {
        let filename = filename.trim().to_string();
        *current_filename = Some(filename.clone());
        return Some(DownloadEvent::Destination {
            line: line.to_string(),
            filename
        });
    }

    None
}

fn parse_download_progress(line: &str) -> Option<DownloadProgress> {
    let caps = PROGRESS_LINE.captures(line)?;
    let percent = caps["percent"].parse::<f64>().ok()?;

    Some(DownloadProgress {
        percent,
        total: caps["total"].to_string(),
        rate: caps["rate"].trim().to_string(),
        eta: caps["eta"].to_string()
    })
}
