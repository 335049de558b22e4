//! Content extraction: turning `(work, segment)` into a title and page images
//!
//! The pipeline only sees the [`ContentExtractor`] trait, so it can run
//! against [`HttpPageExtractor`] in production and a deterministic stub in
//! tests.

use async_trait::async_trait;

use crate::error::ExtractionError;
use crate::types::Extraction;

mod html;

pub use html::HttpPageExtractor;

/// Source of segment contents
///
/// Implementations must not return partial results: either every page of the
/// segment is listed or the call fails.
///
/// # Examples
///
/// ```no_run
/// use segment_dl::config::{ExtractorConfig, FetchConfig};
/// use segment_dl::extractor::{ContentExtractor, HttpPageExtractor};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let extractor = HttpPageExtractor::new(ExtractorConfig::default(), &FetchConfig::default())?;
/// let extraction = extractor.extract("one-piece", "1100").await?;
/// println!("{} has {} pages", extraction.title, extraction.images.len());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Resolve the canonical title and ordered page images of a segment
    async fn extract(&self, work: &str, segment: &str) -> Result<Extraction, ExtractionError>;

    /// Name of this implementation, for logging
    fn name(&self) -> &'static str;
}

/// Extractor that always returns the same result
///
/// Useful when the page list is already known, and as a test double.
#[derive(Debug, Clone)]
pub struct StaticExtractor {
    extraction: Extraction,
}

impl StaticExtractor {
    /// Serve `extraction` for every request
    pub fn new(extraction: Extraction) -> Self {
        Self { extraction }
    }
}

#[async_trait]
impl ContentExtractor for StaticExtractor {
    async fn extract(&self, _work: &str, _segment: &str) -> Result<Extraction, ExtractionError> {
        Ok(self.extraction.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
