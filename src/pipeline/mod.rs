//! Pipeline orchestration: one acquire request from admission to document.
//!
//! The `SegmentPipeline` struct and its methods are organized by domain:
//! - [`acquire`] - The per-request state machine
//! - [`locks`] - Per-segment advisory locks

mod acquire;
mod locks;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use locks::SegmentLocks;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::assembler::{DocumentAssembler, PageRenderer, PdfRenderer};
use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::extractor::{ContentExtractor, HttpPageExtractor};
use crate::rate_limiter::RateLimiter;
use crate::retriever::ImageRetriever;
use crate::types::Event;

/// Segment acquisition pipeline (cloneable - all fields are Arc-wrapped)
///
/// Owns every component a request passes through. The rate limiter and the
/// state store are the only state shared between concurrent requests.
#[derive(Clone)]
pub struct SegmentPipeline {
    /// Segment state store
    /// Public for integration tests to inspect segment records
    pub db: Arc<Database>,
    /// Per-client admission control
    pub(crate) limiter: Arc<RateLimiter>,
    /// Source of titles and page lists
    pub(crate) extractor: Arc<dyn ContentExtractor>,
    /// Page image downloader
    pub(crate) retriever: ImageRetriever,
    /// Document writer
    pub(crate) assembler: DocumentAssembler,
    /// Serializes runs for the same segment
    pub(crate) locks: SegmentLocks,
    /// Caps concurrently running pipelines (max_concurrent_pipelines)
    pub(crate) concurrent_limit: Arc<tokio::sync::Semaphore>,
    /// Cleared during shutdown
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration
    pub(crate) config: Arc<Config>,
}

impl SegmentPipeline {
    /// Create a pipeline with the HTTP extractor and PDF renderer
    ///
    /// Validates the configuration, creates the storage directories and opens
    /// (or creates) the database.
    pub async fn new(config: Config) -> Result<Self> {
        let extractor = Arc::new(HttpPageExtractor::new(
            config.extractor.clone(),
            &config.fetch,
        )?);
        Self::with_extractor(config, extractor).await
    }

    /// Create a pipeline that takes segment contents from `extractor`
    pub async fn with_extractor(
        config: Config,
        extractor: Arc<dyn ContentExtractor>,
    ) -> Result<Self> {
        config.validate()?;

        for dir in [&config.storage.staging_dir, &config.storage.documents_dir] {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create directory '{}': {}", dir.display(), e),
                ))
            })?;
        }

        let db = Database::new(&config.persistence.database_path).await?;

        Self::from_parts(config, Arc::new(db), extractor, Arc::new(PdfRenderer::new()))
    }

    /// Assemble a pipeline from already constructed components
    ///
    /// Fails with [`Error::Config`] when `config` does not validate.
    pub fn from_parts(
        config: Config,
        db: Arc<Database>,
        extractor: Arc<dyn ContentExtractor>,
        renderer: Arc<dyn PageRenderer>,
    ) -> Result<Self> {
        config.validate()?;

        let limiter = Arc::new(RateLimiter::new(config.server.api.rate_limit.clone()));
        let retriever = ImageRetriever::new(config.fetch.clone())?;
        let assembler = DocumentAssembler::new(config.storage.documents_dir.clone(), renderer);
        let concurrent_limit = Arc::new(tokio::sync::Semaphore::new(
            config.fetch.max_concurrent_pipelines,
        ));
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        tracing::info!(
            extractor = extractor.name(),
            max_concurrent_pipelines = config.fetch.max_concurrent_pipelines,
            max_concurrent_fetches = config.fetch.max_concurrent_fetches,
            "Segment pipeline initialized"
        );

        Ok(Self {
            db,
            limiter,
            extractor,
            retriever,
            assembler,
            locks: SegmentLocks::new(),
            concurrent_limit,
            accepting_new: Arc::new(AtomicBool::new(true)),
            event_tx,
            config: Arc::new(config),
        })
    }

    /// Subscribe to pipeline events
    ///
    /// Each subscriber receives every event. A subscriber that falls more than
    /// 1000 events behind gets `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Location of the assembled document for a title
    pub fn document_path(&self, title: &str) -> PathBuf {
        self.assembler.document_path(title)
    }

    /// Emit an event to all subscribers; dropped when nobody listens
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Stop accepting requests and wait for running pipelines
    ///
    /// Waits at most 30 seconds for in-flight runs to finish.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");
        self.accepting_new.store(false, Ordering::SeqCst);

        let permits = u32::try_from(self.config.fetch.max_concurrent_pipelines).unwrap_or(u32::MAX);
        let drained = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            self.concurrent_limit.acquire_many(permits),
        )
        .await;

        match drained {
            Ok(Ok(_permits)) => tracing::info!("All running pipelines finished"),
            Ok(Err(_)) => tracing::debug!("Pipeline semaphore already closed"),
            Err(_) => tracing::warn!("Timeout waiting for pipelines, proceeding with shutdown"),
        }
        self.concurrent_limit.close();

        self.emit_event(Event::Shutdown);
        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Spawn the REST API server in a background task
    pub fn spawn_api_server(&self) -> tokio::task::JoinHandle<Result<()>> {
        let pipeline = Arc::new(self.clone());
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(pipeline, config).await })
    }
}
