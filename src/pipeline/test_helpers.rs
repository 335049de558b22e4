//! Shared test helpers for creating SegmentPipeline instances in tests.

use crate::assembler::PdfRenderer;
use crate::config::Config;
use crate::db::Database;
use crate::error::ExtractionError;
use crate::extractor::ContentExtractor;
use crate::pipeline::SegmentPipeline;
use crate::types::{Extraction, ImageRef};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Extractor stub that counts calls and can be slowed down
pub(crate) struct CountingExtractor {
    extraction: Extraction,
    delay: Duration,
    calls: AtomicUsize,
}

impl CountingExtractor {
    pub(crate) fn new(extraction: Extraction) -> Self {
        Self {
            extraction,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentExtractor for CountingExtractor {
    async fn extract(&self, _work: &str, _segment: &str) -> Result<Extraction, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.extraction.clone())
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// Extractor stub with a fixed extraction per work
pub(crate) struct PerWorkExtractor {
    extractions: HashMap<String, Extraction>,
}

impl PerWorkExtractor {
    pub(crate) fn new<'a>(entries: impl IntoIterator<Item = (&'a str, Extraction)>) -> Self {
        Self {
            extractions: entries
                .into_iter()
                .map(|(work, extraction)| (work.to_string(), extraction))
                .collect(),
        }
    }
}

#[async_trait]
impl ContentExtractor for PerWorkExtractor {
    async fn extract(&self, work: &str, _segment: &str) -> Result<Extraction, ExtractionError> {
        self.extractions
            .get(work)
            .cloned()
            .ok_or_else(|| ExtractionError::Markup {
                reason: format!("no stub extraction for {work}"),
            })
    }

    fn name(&self) -> &'static str {
        "per-work"
    }
}

/// PNG of the given size, filled with one colour
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_pixel(width, height, image::Rgb([30, 120, 200]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// Serve one PNG per position at `/pages/<position>.png`, each `10 + position`
/// pixels wide, and return the matching image references
pub(crate) async fn serve_pages(server: &MockServer, positions: &[u32]) -> Vec<ImageRef> {
    let mut images = Vec::new();
    for &position in positions {
        let route = format!("/pages/{}.png", position);
        Mock::given(method("GET"))
            .and(path(route.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(10 + position, 16)))
            .mount(server)
            .await;
        images.push(ImageRef {
            url: format!("{}{}", server.uri(), route),
            position,
        });
    }
    images
}

/// Directories currently under the staging root, sorted by name
pub(crate) fn staging_dirs(temp_dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(temp_dir.path().join("staging"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Configuration rooted in `temp_dir` with rate limiting off
pub(crate) fn test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = temp_dir.path().join("test.db");
    config.storage.staging_dir = temp_dir.path().join("staging");
    config.storage.documents_dir = temp_dir.path().join("documents");
    config.server.api.rate_limit.enabled = false;
    config.fetch.retry.max_attempts = 0;
    config
}

/// Pipeline over `extractor` with the real PDF renderer.
/// Returns the pipeline and the tempdir (which must be kept alive).
pub(crate) async fn create_test_pipeline(
    extractor: Arc<dyn ContentExtractor>,
) -> (SegmentPipeline, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);
    let pipeline = create_pipeline_with_config(config, extractor).await;
    (pipeline, temp_dir)
}

/// Pipeline over `extractor` with an explicit configuration
pub(crate) async fn create_pipeline_with_config(
    config: Config,
    extractor: Arc<dyn ContentExtractor>,
) -> SegmentPipeline {
    std::fs::create_dir_all(&config.storage.staging_dir).unwrap();
    std::fs::create_dir_all(&config.storage.documents_dir).unwrap();

    let db = Database::new(&config.persistence.database_path)
        .await
        .unwrap();

    SegmentPipeline::from_parts(config, Arc::new(db), extractor, Arc::new(PdfRenderer::new()))
        .unwrap()
}
