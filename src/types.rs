//! Core types and events for segment-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

/// How the caller wants the result of an acquisition delivered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AcquireMode {
    /// Structured success payload carrying the canonical title
    #[default]
    Inline,
    /// Redirect to the document-retrieval endpoint
    Download,
}

/// One "acquire segment" request
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct AcquireRequest {
    /// Work identifier as used by the reader site (required)
    #[serde(default)]
    pub work: Option<String>,
    /// Segment identifier within the work (e.g. a chapter number)
    #[serde(default)]
    pub segment: Option<String>,
    /// Delivery mode
    #[serde(default)]
    pub mode: AcquireMode,
}

impl AcquireRequest {
    /// Build a request for `work` / `segment`
    pub fn new(work: impl Into<String>, segment: impl Into<String>) -> Self {
        Self {
            work: Some(work.into()),
            segment: Some(segment.into()),
            mode: AcquireMode::Inline,
        }
    }

    /// Switch the delivery mode
    pub fn with_mode(mut self, mode: AcquireMode) -> Self {
        self.mode = mode;
        self
    }
}

/// A page image reference produced by content extraction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImageRef {
    /// Remote location of the image
    pub url: String,
    /// Ordinal that decides the page's place in the document
    pub position: u32,
}

/// Result of content extraction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Extraction {
    /// Canonical title reported by the source
    pub title: String,
    /// Page images in source order
    pub images: Vec<ImageRef>,
}

/// Successful result of [`SegmentPipeline::acquire`]
///
/// [`SegmentPipeline::acquire`]: crate::pipeline::SegmentPipeline::acquire
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The segment was fetched and assembled by this request
    Assembled {
        /// Canonical title of the work
        title: String,
        /// Path of the assembled document
        document: PathBuf,
        /// Number of pages in the document
        pages: usize,
    },
    /// The segment had already been assembled; nothing was fetched
    Cached {
        /// Canonical title of the work
        title: String,
        /// Path of the existing document
        document: PathBuf,
    },
}

impl AcquireOutcome {
    /// Canonical title, whichever way the document was produced
    pub fn title(&self) -> &str {
        match self {
            AcquireOutcome::Assembled { title, .. } | AcquireOutcome::Cached { title, .. } => {
                title
            }
        }
    }

    /// Path of the document
    pub fn document(&self) -> &PathBuf {
        match self {
            AcquireOutcome::Assembled { document, .. }
            | AcquireOutcome::Cached { document, .. } => document,
        }
    }

    /// Whether the result was served without fetching
    pub fn is_cached(&self) -> bool {
        matches!(self, AcquireOutcome::Cached { .. })
    }
}

/// Pipeline states for one request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Rate limiter accepted the request
    Admitted,
    /// Segment already assembled, fetch skipped
    Deduped,
    /// Segment needs fetching
    Fresh,
    /// Content extractor running
    Extracting,
    /// Page images downloading
    Retrieving,
    /// Image records being written
    Persisting,
    /// Document being rendered
    Assembling,
    /// Document ready
    Done,
    /// Pipeline aborted
    Failed,
}

impl PipelineStage {
    /// Whether no further transition can follow
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineStage::Deduped | PipelineStage::Done | PipelineStage::Failed
        )
    }
}

/// Event emitted during a pipeline run
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A pipeline moved to a new stage
    Stage {
        /// Work identifier from the request
        work: String,
        /// Segment identifier from the request
        segment: String,
        /// The stage entered
        stage: PipelineStage,
    },

    /// A document was written
    Assembled {
        /// Work identifier from the request
        work: String,
        /// Segment identifier from the request
        segment: String,
        /// Canonical title
        title: String,
        /// Number of pages
        pages: usize,
    },

    /// A pipeline failed
    Failed {
        /// Work identifier from the request
        work: String,
        /// Segment identifier from the request
        segment: String,
        /// The stage that was running
        stage: PipelineStage,
        /// Error message
        error: String,
    },

    /// Pipeline shutting down
    Shutdown,
}

/// Segment record as exposed by the admin API
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SegmentInfo {
    /// Work identifier
    pub work: String,
    /// Segment identifier
    pub segment: String,
    /// Canonical title, once extraction succeeded
    pub canonical_title: Option<String>,
    /// Number of acquire requests seen for this segment
    pub request_count: i64,
    /// Client that sent the latest request
    pub last_client: Option<String>,
    /// First request time
    pub first_seen_at: DateTime<Utc>,
    /// Latest request time
    pub last_seen_at: DateTime<Utc>,
    /// When the document was last assembled
    pub completed_at: Option<DateTime<Utc>>,
}

/// Image record as exposed by the admin API
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ImageInfo {
    /// Page position
    pub position: u32,
    /// Local path the page was staged at
    pub local_path: String,
}
