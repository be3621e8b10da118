mod rendition;
mod settings;

pub use rendition::{MediaKind, Rendition, RenditionCatalog, SizeEstimate};
pub use settings::Settings;
