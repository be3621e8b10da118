use std::collections::BTreeMap;

use crate::error::JobError;
use crate::models::{Rendition, RenditionCatalog, SizeEstimate};

/// Menu tiers, highest first.
pub const TIERS: [u32; 8] = [2160, 1440, 1080, 720, 480, 360, 240, 144];

pub const VIDEO_DIVIDER: &str = "── Video ──";
pub const AUDIO_DIVIDER: &str = "── Audio ──";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuItem {
    Divider(&'static str),
    Choice { label: String, id: String }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionMenu {
    items: Vec<MenuItem>
}

impl SelectionMenu {
    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    /// `(label, id)` pairs in menu order, dividers skipped.
    pub fn choices(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().filter_map(|item| match item {
            MenuItem::Choice { label, id } => Some((label.as_str(), id.as_str())),
            MenuItem::Divider(_) => None
        })
    }

    pub fn video_choices(&self) -> Vec<(&str, &str)> {
        self.section(VIDEO_DIVIDER)
    }

    pub fn audio_choices(&self) -> Vec<(&str, &str)> {
        self.section(AUDIO_DIVIDER)
    }

    pub fn is_empty(&self) -> bool {
        self.choices().next().is_none()
    }

    fn section(&self, divider: &str) -> Vec<(&str, &str)> {
        self.items
            .iter()
            .skip_while(|item| !matches!(item, MenuItem::Divider(d) if *d == divider))
            .skip(1)
            .map_while(|item| match item {
                MenuItem::Choice { label, id } => Some((label.as_str(), id.as_str())),
                MenuItem::Divider(_) => None
            })
            .collect()
    }
}

/// Builds the menu: at most one video rendition per resulting height, then
/// every audio-only rendition in catalog order.
///
/// For each tier the first mp4/webm video rendition of exactly that height is
/// taken. Without one, the first video rendition of any height is taken and
/// filed under its own height, so a later tier can overwrite an earlier
/// tier's pick when both land on the same height.
pub fn select(catalog: &RenditionCatalog, tiers: &[u32]) -> SelectionMenu {
    let mut by_height: BTreeMap<Option<u32>, &Rendition> = BTreeMap::new();

    for &tier in tiers {
        let exact = catalog
            .renditions
            .iter()
            .find(|r| r.kind.has_video() && r.height == Some(tier) && matches!(r.ext.as_str(), "mp4" | "webm"));

        let picked = exact.or_else(|| catalog.renditions.iter().find(|r| r.kind.has_video()));

        if let Some(rendition) = picked {
            if exact.is_none() {
                tracing::debug!(tier, fallback = %rendition.id, height = ?rendition.height, "no exact match for tier");
            }
            by_height.insert(rendition.height, rendition);
        }
    }

    let mut items = vec![MenuItem::Divider(VIDEO_DIVIDER)];
    items.extend(by_height.values().rev().map(|r| MenuItem::Choice {
        label: video_label(r),
        id: r.id.clone()
    }));

    items.push(MenuItem::Divider(AUDIO_DIVIDER));
    items.extend(
        catalog
            .renditions
            .iter()
            .filter(|r| !r.kind.has_video() && r.kind.has_audio())
            .map(|r| MenuItem::Choice {
                label: audio_label(r),
                id: r.id.clone()
            })
    );

    SelectionMenu { items }
}

/// Looks the operator's input up among all selectable renditions, not only
/// the ones shown in the menu.
pub fn resolve_choice<'a>(catalog: &'a RenditionCatalog, id: &str) -> Result<&'a Rendition, JobError> {
    let id = id.trim();
    catalog
        .get(id)
        .ok_or_else(|| JobError::UnknownRenditionSelected(id.to_string()))
}

fn video_label(r: &Rendition) -> String {
    let height = r.height.map_or_else(|| "?".to_string(), |h| format!("{h}p"));
    format!("📹 {height} | {} | {}", r.ext, format_size(r.size))
}

fn audio_label(r: &Rendition) -> String {
    let quality = match (r.audio_bitrate, r.sample_rate) {
        (Some(abr), _) => format!("{abr:.0} kbps"),
        (None, Some(asr)) => format!("{asr} Hz"),
        (None, None) => "N/A".to_string()
    };
    format!("🎵 Audio | {} | {quality} | {}", r.ext, format_size(r.size))
}

#[allow(clippy::cast_precision_loss)]
fn format_size(size: Option<SizeEstimate>) -> String {
    match size {
        Some(size) => format!("{:.2} MB", size.bytes() as f64 / (1024.0 * 1024.0)),
        None => "Size N/A".to_string()
    }
}
