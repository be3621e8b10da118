use std::fmt;

use url::Url;

use crate::error::JobError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Youtube,
    Tiktok,
    Instagram,
    Facebook,
    Twitter,
    Unknown
}

/// Registrable domains per platform. A host matches a domain when it is the
/// domain itself or one of its subdomains; no host can match two entries.
const HOST_DOMAINS: &[(&str, Platform)] = &[
    ("youtube.com", Platform::Youtube),
    ("youtu.be", Platform::Youtube),
    ("tiktok.com", Platform::Tiktok),
    ("instagram.com", Platform::Instagram),
    ("facebook.com", Platform::Facebook),
    ("fb.com", Platform::Facebook),
    ("twitter.com", Platform::Twitter),
    ("x.com", Platform::Twitter)
];

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Tiktok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::Twitter => "twitter",
            Platform::Unknown => "unknown"
        }
    }

    /// Sources that serve one combined audio+video stream per quality.
    pub fn has_merged_streams(self) -> bool {
        matches!(self, Platform::Tiktok)
    }

    fn from_host(host: &str) -> Self {
        let host = host.to_ascii_lowercase();
        HOST_DOMAINS
            .iter()
            .find(|(domain, _)| host_matches(&host, domain))
            .map_or(Platform::Unknown, |(_, platform)| *platform)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// A validated absolute URL together with the platform its host belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrl {
    url: Url,
    platform: Platform
}

impl SourceUrl {
    /// Parses and classifies `raw`. TikTok URLs are reduced to scheme, host
    /// and path here, before anything touches the network.
    pub fn parse(raw: &str) -> Result<Self, JobError> {
        let mut url = Url::parse(raw.trim()).map_err(|e| JobError::InvalidUrl(format!("{raw}: {e}")))?;

        let platform = match url.host_str() {
            Some(host) if !host.is_empty() => Platform::from_host(host),
            _ => return Err(JobError::InvalidUrl(format!("{raw}: missing host")))
        };

        if platform == Platform::Tiktok {
            url.set_query(None);
            url.set_fragment(None);
        }

        Ok(Self { url, platform })
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

pub fn classify(url: &str) -> Result<Platform, JobError> {
    SourceUrl::parse(url).map(|source| source.platform())
}
