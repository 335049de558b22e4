//! Reader-page extractor working on server-rendered markup

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

use super::ContentExtractor;
use crate::config::{ExtractorConfig, FetchConfig};
use crate::error::{Error, ExtractionError};
use crate::types::{Extraction, ImageRef};

// Patterns are literals; failure to compile is a programming error
#[allow(clippy::expect_used)]
static H1_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1\b[^>]*>(.*?)</h1\s*>").expect("valid regex"));

#[allow(clippy::expect_used)]
static IMG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<img\b[^>]*>").expect("valid regex"));

#[allow(clippy::expect_used)]
static ATTR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid regex")
});

#[allow(clippy::expect_used)]
static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

/// Fetches a reader page over HTTP and reads title and page images from it
///
/// The page URL comes from [`ExtractorConfig::page_url_template`], with
/// `{work}` and `{segment}` replaced by the percent-encoded identifiers. The
/// first `<h1>` is the canonical title; every `<img>` whose class list holds
/// [`ExtractorConfig::image_class`] is a page, ordered by its `data-index`.
pub struct HttpPageExtractor {
    client: reqwest::Client,
    config: ExtractorConfig,
    timeout: Duration,
}

impl HttpPageExtractor {
    /// Create an extractor with its own HTTP client
    pub fn new(config: ExtractorConfig, fetch: &FetchConfig) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(fetch.extraction_timeout)
            .user_agent(&fetch.user_agent)
            .build()
            .map_err(|e| Error::Other(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            timeout: fetch.extraction_timeout,
        })
    }

    /// Reader page URL for a segment
    pub fn page_url(&self, work: &str, segment: &str) -> String {
        self.config
            .page_url_template
            .replace("{work}", &urlencoding::encode(work))
            .replace("{segment}", &urlencoding::encode(segment))
    }

    /// Pull the title and page images out of reader-page markup
    ///
    /// Relative image sources are resolved against `page_url`.
    pub fn parse_page(&self, page_url: &str, html: &str) -> Result<Extraction, ExtractionError> {
        let title = H1_PATTERN
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| clean_text(m.as_str()))
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ExtractionError::Markup {
                reason: "no <h1> title found".into(),
            })?;

        let base = url::Url::parse(page_url).ok();
        let mut images = Vec::new();

        for tag in IMG_PATTERN.find_iter(html) {
            let attrs = parse_attributes(tag.as_str());

            let has_class = attrs
                .iter()
                .find(|(name, _)| name == "class")
                .is_some_and(|(_, classes)| {
                    classes
                        .split_whitespace()
                        .any(|c| c == self.config.image_class)
                });
            if !has_class {
                continue;
            }

            let src = attribute(&attrs, "src")
                .or_else(|| attribute(&attrs, "data-src"))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ExtractionError::Markup {
                    reason: "page image without src".into(),
                })?;

            let position = attribute(&attrs, "data-index")
                .and_then(|v| v.trim().parse::<u32>().ok())
                .ok_or_else(|| ExtractionError::Markup {
                    reason: format!("page image {} has no numeric data-index", src),
                })?;

            let url = match &base {
                Some(base) => base
                    .join(src)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| src.to_string()),
                None => src.to_string(),
            };

            images.push(ImageRef { url, position });
        }

        if images.is_empty() {
            return Err(ExtractionError::Markup {
                reason: format!("no img.{} elements found", self.config.image_class),
            });
        }

        images.sort_by_key(|image| image.position);

        Ok(Extraction { title, images })
    }

    /// Client timeouts are reported as [`ExtractionError::Timeout`]
    fn transport_error(&self, url: &str, error: reqwest::Error) -> ExtractionError {
        if error.is_timeout() {
            ExtractionError::Timeout {
                secs: self.timeout.as_secs(),
            }
        } else {
            ExtractionError::Network {
                url: url.to_string(),
                reason: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl ContentExtractor for HttpPageExtractor {
    async fn extract(&self, work: &str, segment: &str) -> Result<Extraction, ExtractionError> {
        let url = self.page_url(work, segment);
        tracing::debug!(url = %url, "Fetching reader page");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| self.transport_error(&url, e))?;

        let extraction = self.parse_page(&url, &html)?;
        tracing::debug!(
            url = %url,
            title = %extraction.title,
            pages = extraction.images.len(),
            "Reader page parsed"
        );

        Ok(extraction)
    }

    fn name(&self) -> &'static str {
        "http-page"
    }
}

fn parse_attributes(tag: &str) -> Vec<(String, String)> {
    ATTR_PATTERN
        .captures_iter(tag)
        .filter_map(|c| {
            let name = c.get(1)?.as_str().to_ascii_lowercase();
            let value = c.get(2).or_else(|| c.get(3)).or_else(|| c.get(4))?;
            Some((name, decode_entities(value.as_str())))
        })
        .collect()
}

fn attribute<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

fn clean_text(fragment: &str) -> String {
    let text = TAG_PATTERN.replace_all(fragment, " ");
    decode_entities(&text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
