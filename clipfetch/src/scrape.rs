use std::path::Path;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::error::JobError;
use crate::platform::SourceUrl;

static SOURCE_ELEMENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("video source[src], video[src]").expect("selector parses"));
static OPEN_GRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:video"][content]"#).expect("selector parses"));

/// Which extraction point to try first on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preference {
    SourceElement,
    OpenGraph
}

/// Finds the video URL in a page, resolving relative references against
/// the page URL.
pub fn extract_video_url(html: &str, page: &Url, preference: Preference) -> Option<Url> {
    let document = Html::parse_document(html);

    let from_source = || {
        document
            .select(&SOURCE_ELEMENT)
            .find_map(|el| el.value().attr("src"))
    };
    let from_open_graph = || {
        document
            .select(&OPEN_GRAPH)
            .find_map(|el| el.value().attr("content"))
    };

    let raw = match preference {
        Preference::SourceElement => from_source().or_else(from_open_graph),
        Preference::OpenGraph => from_open_graph().or_else(from_source)
    }?;

    page.join(raw.trim()).ok()
}

/// GETs the page, extracts the video URL and streams the video into `dest`.
pub async fn fetch_to(
    client: &reqwest::Client,
    source: &SourceUrl,
    preference: Preference,
    dest: &Path
) -> Result<(), JobError> {
    tracing::info!("Scraping {} for a video URL", source);

    let html = client
        .get(source.as_str())
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let video_url = extract_video_url(&html, source.url(), preference)
        .ok_or_else(|| JobError::ScrapeExtractionFailed(source.to_string()))?;

    tracing::info!("Downloading {} to {}", video_url, dest.display());

    let mut response = client.get(video_url).send().await?.error_for_status()?;
    let mut file = tokio::fs::File::create(dest).await?;
    let mut written: u64 = 0;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    tracing::debug!("Wrote {} bytes to {}", written, dest.display());
    Ok(())
}
