//! # segment-dl
//!
//! Acquires one segment (e.g. a chapter) of a work from a reader site and
//! assembles its page images, in page order, into a single PDF.
//!
//! Each request passes through a per-client rate limiter, a dedup check
//! against a persistent segment store, content extraction, concurrent image
//! retrieval into a staging area, and document assembly. Repeat requests for
//! an assembled segment are answered from the stored document.
//!
//! ## Quick Start
//!
//! ```no_run
//! use segment_dl::{AcquireRequest, Config, SegmentPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = SegmentPipeline::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = pipeline.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let outcome = pipeline
//!         .acquire(AcquireRequest::new("some-work", "12"), "local")
//!         .await?;
//!     println!("{} -> {}", outcome.title(), outcome.document().display());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// PDF assembly from staged page images
pub mod assembler;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Content extraction (title and page list for a segment)
pub mod extractor;
/// Pipeline orchestration
pub mod pipeline;
/// Per-client request throttling
pub mod rate_limiter;
/// Concurrent page image download
pub mod retriever;
/// Retry logic with exponential backoff
pub mod retry;
/// Per-run staging directories
pub mod staging;
/// Core types and events
pub mod types;
/// Path and title helpers
pub mod utils;

// Re-export commonly used types
pub use assembler::{AssembledDocument, DocumentAssembler, PageRenderer, PdfRenderer};
pub use config::Config;
pub use db::Database;
pub use error::{
    ApiError, AssemblyError, DatabaseError, Error, ErrorDetail, ExtractionError, Result,
    RetrievalError, ToHttpStatus,
};
pub use extractor::{ContentExtractor, HttpPageExtractor, StaticExtractor};
pub use pipeline::SegmentPipeline;
pub use rate_limiter::RateLimiter;
pub use types::{
    AcquireMode, AcquireOutcome, AcquireRequest, Event, Extraction, ImageInfo, ImageRef,
    PipelineStage, SegmentInfo,
};

/// Serve the REST API until a termination signal arrives, then shut down.
///
/// Stops accepting connections on the signal, then calls the pipeline's
/// `shutdown()` so running acquisitions can finish.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use segment_dl::{Config, SegmentPipeline, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pipeline = SegmentPipeline::new(Config::default()).await?;
///
///     // Serve with automatic signal handling
///     run_with_shutdown(pipeline).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(pipeline: SegmentPipeline) -> Result<()> {
    let config = pipeline.get_config();
    let listener = api::bind(&config).await?;
    let pipeline = std::sync::Arc::new(pipeline);

    api::serve(listener, pipeline.clone(), config, wait_for_signal()).await?;
    pipeline.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
