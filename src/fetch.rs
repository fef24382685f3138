use std::path::Path;
use std::time::Duration;

use once_cell::sync::Lazy;
use ureq::ResponseExt;
use url::Url;

use crate::error::{Result, WortblickError};

/// Default HTTP request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Shared HTTP agent for connection pooling
static HTTP_AGENT: Lazy<ureq::Agent> = Lazy::new(|| {
    ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)))
        .build()
        .into()
});

/// A page loaded for reading
#[derive(Debug, Clone)]
pub struct PageContent {
    /// Final URL after redirects, or the file path
    pub location: String,
    /// Raw HTML content
    pub html: String,
}

/// Parse `source` as an http(s) URL; anything else is a file path
pub fn parse_web_url(source: &str) -> Option<Url> {
    Url::parse(source)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

/// Load a page from a URL or a local HTML file
pub fn load_page(source: &str) -> Result<PageContent> {
    match parse_web_url(source) {
        Some(url) => fetch_http(&url),
        None => read_file(Path::new(source)),
    }
}

fn read_file(path: &Path) -> Result<PageContent> {
    let html = std::fs::read_to_string(path)?;
    Ok(PageContent {
        location: path.display().to_string(),
        html,
    })
}

/// Fetch using HTTP (ureq)
fn fetch_http(url: &Url) -> Result<PageContent> {
    let response = HTTP_AGENT
        .get(url.as_str())
        .header(
            "User-Agent",
            concat!("Mozilla/5.0 (compatible; wortblick/", env!("CARGO_PKG_VERSION"), ")"),
        )
        .header("Accept", "text/html,application/xhtml+xml")
        .call()?;

    let final_url = response.get_uri().to_string();
    let html = response.into_body().read_to_string()?;
    if html.trim().is_empty() {
        return Err(WortblickError::ExtractionFailure);
    }
    log::debug!("Fetched {} bytes from {}", html.len(), final_url);

    Ok(PageContent {
        location: final_url,
        html,
    })
}
