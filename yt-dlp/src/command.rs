use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::types::DownloadOptions;

pub struct CommandBuilder {
    binary: PathBuf,
    args: Vec<String>
}

impl CommandBuilder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn url(self, url: impl Into<String>) -> Self {
        self.arg(url)
    }

    /// One JSON document for the whole URL, written to stdout.
    pub fn single_json(self) -> Self {
        self.arg("--dump-single-json")
    }

    pub fn output(self, path: impl AsRef<Path>) -> Self {
        self.arg("-o").arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn format(self, format: impl Into<String>) -> Self {
        self.arg("-f").arg(format)
    }

    pub fn merge_output_format(self, format: impl Into<String>) -> Self {
        self.arg("--merge-output-format").arg(format)
    }

    pub fn newline_progress(self) -> Self {
        self.arg("--newline")
    }

    pub fn no_playlist(self) -> Self {
        self.arg("--no-playlist")
    }

    pub fn ffmpeg_location(self, path: impl AsRef<Path>) -> Self {
        self.arg("--ffmpeg-location").arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn ffmpeg_location_opt(self, path: Option<&PathBuf>) -> Self {
        match path {
            Some(p) => self.ffmpeg_location(p),
            None => self
        }
    }

    pub fn with_options(mut self, options: &DownloadOptions) -> Self {
        if let Some(format_arg) = options.format.as_arg() {
            self = self.format(format_arg);
        }

        if let Some(container) = options.container.as_str() {
            self = self.merge_output_format(container);
        }

        for arg in &options.extra_args {
            self = self.arg(arg.clone());
        }

        self
    }

    pub fn build(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(&self.args);
        cmd
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }
}
