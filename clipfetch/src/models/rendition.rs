use yt_dlp::{Format, VideoInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Muxed,
    VideoOnly,
    AudioOnly
}

impl MediaKind {
    pub fn has_video(self) -> bool {
        matches!(self, MediaKind::Muxed | MediaKind::VideoOnly)
    }

    pub fn has_audio(self) -> bool {
        matches!(self, MediaKind::Muxed | MediaKind::AudioOnly)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeEstimate {
    Exact(u64),
    Approximate(u64)
}

impl SizeEstimate {
    pub fn bytes(self) -> u64 {
        match self {
            SizeEstimate::Exact(b) | SizeEstimate::Approximate(b) => b
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rendition {
    pub id: String,
    pub kind: MediaKind,
    pub ext: String,
    pub height: Option<u32>,
    pub size: Option<SizeEstimate>,
    /// kbps
    pub audio_bitrate: Option<f64>,
    /// Hz
    pub sample_rate: Option<u32>
}

impl Rendition {
    /// Normalizes one raw format. Entries without an id, an extension or a
    /// size are rejected, as are entries that carry neither stream.
    pub fn from_format(format: &Format) -> Option<Self> {
        let id = format.format_id.trim();
        if id.is_empty() {
            return None;
        }

        let ext = format.ext.as_deref().map(str::trim).filter(|e| !e.is_empty())?;

        let size = match (format.filesize, format.filesize_approx) {
            (Some(bytes), _) => SizeEstimate::Exact(bytes),
            (None, Some(bytes)) => SizeEstimate::Approximate(bytes),
            (None, None) => return None
        };

        let kind = match (format.has_video(), format.has_audio()) {
            (true, true) => MediaKind::Muxed,
            (true, false) => MediaKind::VideoOnly,
            (false, true) => MediaKind::AudioOnly,
            (false, false) => return None
        };

        Some(Self {
            id: id.to_string(),
            kind,
            ext: ext.to_string(),
            height: format.height.filter(|_| kind.has_video()),
            size: Some(size),
            audio_bitrate: format.abr.filter(|_| kind.has_audio()),
            sample_rate: format.asr.filter(|_| kind.has_audio())
        })
    }
}

/// All selectable renditions of one URL, in the order the extractor listed
/// them.
#[derive(Debug, Clone)]
pub struct RenditionCatalog {
    pub title: String,
    pub renditions: Vec<Rendition>
}

impl RenditionCatalog {
    pub fn from_video_info(info: &VideoInfo) -> Self {
        let renditions: Vec<Rendition> = info.formats.iter().filter_map(Rendition::from_format).collect();

        tracing::debug!(
            total = info.formats.len(),
            eligible = renditions.len(),
            "normalized formats"
        );

        Self {
            title: sanitize_title(&info.title),
            renditions
        }
    }

    pub fn get(&self, id: &str) -> Option<&Rendition> {
        self.renditions.iter().find(|r| r.id == id)
    }
}

pub fn sanitize_title(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') && !c.is_control())
        .collect();

    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "video".to_string()
    } else {
        cleaned.to_string()
    }
}
