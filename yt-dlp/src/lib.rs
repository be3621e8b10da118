//! Async Rust wrapper for yt-dlp CLI.
//!
//! This library provides an async interface to the yt-dlp command-line tool
//! for reading a URL's available formats and downloading one of them while
//! following its progress output.
//!
//! # Example
//!
//! ```no_run
//! use tokio_stream::StreamExt;
//! use yt_dlp::{DownloadEvent, DownloadOptions, YtDlp};
//!
//! #[tokio::main]
//! async fn main() -> yt_dlp::Result<()> {
//!     let client = YtDlp::new();
//!
//!     let version = client.check_binary().await?;
//!     println!("yt-dlp version: {}", version);
//!
//!     let info = client.get_video_info("https://www.youtube.com/watch?v=dQw4w9WgXcQ").await?;
//!     println!("Title: {} ({} formats)", info.title, info.formats.len());
//!
//!     let mut events = client.download_with_progress(
//!         "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
//!         "video.%(ext)s",
//!         &DownloadOptions::default()
//!     );
//!     while let Some(event) = events.next().await {
//!         if let DownloadEvent::Progress(p) = event? {
//!             println!("{}% of {}", p.percent, p.total);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
mod command;
pub mod error;
pub mod types;

pub use client::YtDlp;
pub use error::{Error, Result};
pub use types::{
    Container, DownloadEvent, DownloadOptions, DownloadProgress, Format, OutputFormat, VideoInfo
};
