use std::path::{Path, PathBuf};

use yt_dlp::YtDlp;

/// Process-wide configuration, resolved once at startup and handed to the
/// pipeline.
#[derive(Debug, Clone)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub ytdlp_path: PathBuf,
    pub ffmpeg_path: Option<PathBuf>
}

impl Settings {
    pub fn from_env() -> std::io::Result<Self> {
        let cwd = std::env::current_dir()?;
        Ok(Self::from_lookup(&cwd, |key| std::env::var(key).ok()))
    }

    fn from_lookup(cwd: &Path, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let output_dir = non_empty("CLIPFETCH_OUTPUT_DIR")
            .map_or_else(|| cwd.join("downloads"), |dir| cwd.join(dir));

        Self {
            output_dir,
            ytdlp_path: non_empty("YTDLP_PATH").map_or_else(|| PathBuf::from("yt-dlp"), PathBuf::from),
            ffmpeg_path: non_empty("FFMPEG_PATH").map(PathBuf::from)
        }
    }

    pub fn ffmpeg_binary(&self) -> &Path {
        self.ffmpeg_path.as_deref().unwrap_or_else(|| Path::new("ffmpeg"))
    }

    pub fn yt_dlp(&self) -> YtDlp {
        let mut client = YtDlp::with_binary(&self.ytdlp_path);
        client.set_ffmpeg_location(self.ffmpeg_path.clone());
        client
    }
}
