/// One parsed `<percent>% of <size> at <rate> ETA <time>` line. Size, rate
/// and ETA are kept as the tool printed them.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    pub percent: f64,
    pub total: String,
    pub rate: String,
    pub eta: String
}

impl DownloadProgress {
    pub fn is_complete(&self) -> bool {
        self.percent >= 100.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    Extracting { url: String },
    /// `[download] Destination: ...`, verbatim.
    Destination { line: String, filename: String },
    Progress(DownloadProgress),
    MergingFormats { filename: Option<String> },
    /// A stderr line. Never a failure by itself.
    Diagnostic { message: String },
    Finished { filename: String }
}

impl DownloadEvent {
    pub fn is_finished(&self) -> bool {
        matches!(self, DownloadEvent::Finished { .. })
    }
}
