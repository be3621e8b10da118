mod options;
mod progress;
mod video_info;

pub use options::{Container, DownloadOptions, OutputFormat};
pub use progress::{DownloadEvent, DownloadProgress};
pub use video_info::{Format, VideoInfo};
