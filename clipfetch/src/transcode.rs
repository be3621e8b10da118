use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::error::JobError;

/// Container plus codec pairing for a requested output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Mp4,
    Webm,
    Mov,
    Gif,
    Mp3
}

impl TargetFormat {
    /// Unrecognized names get the mp4 pairing.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "webm" => TargetFormat::Webm,
            "mov" => TargetFormat::Mov,
            "gif" => TargetFormat::Gif,
            "mp3" => TargetFormat::Mp3,
            _ => TargetFormat::Mp4
        }
    }

    fn codec_args(self) -> &'static [&'static str] {
        match self {
            TargetFormat::Mp4 => &["-f", "mp4", "-c:v", "libx264", "-c:a", "aac"],
            TargetFormat::Webm => &["-f", "webm", "-c:v", "libvpx", "-c:a", "libvorbis"],
            TargetFormat::Mov => &["-f", "mov", "-c:v", "libx264", "-c:a", "aac"],
            TargetFormat::Gif => &["-f", "gif", "-an"],
            TargetFormat::Mp3 => &["-f", "mp3", "-vn", "-c:a", "libmp3lame"]
        }
    }

    fn has_video(self) -> bool {
        !matches!(self, TargetFormat::Mp3)
    }
}

/// Target height from a free-form quality string: its digits, if any.
pub fn parse_quality(quality: &str) -> Option<u32> {
    let digits: String = quality.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok().filter(|h| *h > 0)
}

#[derive(Debug, Clone)]
pub struct Transcoder {
    binary: PathBuf
}

impl Transcoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    pub fn build_args(input: &Path, output: &Path, format: TargetFormat, height: Option<u32>) -> Vec<String> {
        let mut args: Vec<String> = ["-y", "-hide_banner", "-loglevel", "error", "-i"]
            .iter()
            .map(ToString::to_string)
            .collect();
        args.push(input.to_string_lossy().to_string());

        if let Some(height) = height.filter(|_| format.has_video()) {
            args.push("-vf".to_string());
            args.push(format!("scale=-2:{height}"));
        }

        args.extend(format.codec_args().iter().map(ToString::to_string));
        args.push(output.to_string_lossy().to_string());
        args
    }

    pub async fn transcode(&self, input: &Path, output: &Path, format: &str, quality: &str) -> Result<(), JobError> {
        let target = TargetFormat::parse(format);
        let args = Self::build_args(input, output, target, parse_quality(quality));

        tracing::debug!(binary = %self.binary.display(), args = ?args, "spawning ffmpeg");
        tracing::info!("Transcoding {} to {:?}", input.display(), target);

        let result = Command::new(&self.binary)
            .args(&args)
            .output()
            .await
            .map_err(|e| JobError::TranscodeFailed {
                reason: format!("failed to run {}: {e}", self.binary.display())
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .map_or_else(
                    || format!("ffmpeg exited with code {}", result.status.code().unwrap_or(-1)),
                    |l| l.trim().to_string()
                );
            tracing::error!("ffmpeg failed for {}: {}", input.display(), reason);
            return Err(JobError::TranscodeFailed { reason });
        }

        Ok(())
    }
}
