//! Error types for segment-dl
//!
//! This module provides the error taxonomy for the acquisition pipeline:
//! - Stage-specific error types (extraction, retrieval, assembly, storage)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for segment-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for segment-dl
///
/// Every pipeline stage reports through one of these variants. None of them is
/// retried by the pipeline itself.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "staging_dir")
        key: Option<String>,
    },

    /// Request rejected by the per-client rate limiter
    #[error("too many requests: retry after {retry_after_secs} seconds")]
    Throttled {
        /// Seconds until the client's window resets
        retry_after_secs: u64,
    },

    /// Request is missing a required field or carries an invalid value
    #[error("invalid request: {0}")]
    Validation(String),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Content extraction failed
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Page image retrieval failed
    #[error("retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    /// Document assembly failed
    #[error("assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new requests
    #[error("shutdown in progress: not accepting new requests")]
    ShuttingDown,

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Errors raised while turning a (work, segment) pair into an ordered image list
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The reader page could not be fetched
    #[error("failed to fetch reader page {url}: {reason}")]
    Network {
        /// The reader page URL
        url: String,
        /// Underlying transport failure
        reason: String,
    },

    /// The reader page answered with a non-success status
    #[error("reader page {url} returned HTTP {status}")]
    Status {
        /// The reader page URL
        url: String,
        /// HTTP status code returned
        status: u16,
    },

    /// The markup did not contain the expected elements
    #[error("unexpected page structure: {reason}")]
    Markup {
        /// What was missing or malformed
        reason: String,
    },

    /// Extraction exceeded the configured deadline
    #[error("extraction timed out after {secs} seconds")]
    Timeout {
        /// The deadline that was exceeded
        secs: u64,
    },
}

/// Errors raised while downloading page images into a staging area
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The image request could not be completed
    #[error("failed to fetch page {position} from {url}: {reason}")]
    Fetch {
        /// Position of the page in the segment
        position: u32,
        /// Image URL
        url: String,
        /// Underlying transport failure
        reason: String,
    },

    /// The image server answered with a non-success status
    #[error("page {position} at {url} returned HTTP {status}")]
    Status {
        /// Position of the page in the segment
        position: u32,
        /// Image URL
        url: String,
        /// HTTP status code returned
        status: u16,
    },

    /// Writing the staged file failed
    #[error("failed to write page {position} to {path}: {reason}")]
    Write {
        /// Position of the page in the segment
        position: u32,
        /// Staging file path
        path: PathBuf,
        /// Underlying I/O failure
        reason: String,
    },

    /// The same position appeared twice in one segment
    #[error("duplicate page position {position}")]
    DuplicatePosition {
        /// The repeated position
        position: u32,
    },
}

/// Errors raised while rendering a staging area into a document
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// The staging area holds no pages
    #[error("staging area {path} contains no pages")]
    EmptyStaging {
        /// Staging directory
        path: PathBuf,
    },

    /// The staging area could not be listed
    #[error("cannot read staging area {path}: {reason}")]
    Unreadable {
        /// Staging directory
        path: PathBuf,
        /// Underlying I/O failure
        reason: String,
    },

    /// A staging entry name does not encode a page position
    #[error("staging entry {name} is not a page position")]
    InvalidEntry {
        /// Offending file name
        name: String,
    },

    /// The renderer rejected a page
    #[error("failed to render page {path}: {reason}")]
    Render {
        /// Page image that failed
        path: PathBuf,
        /// Renderer failure
        reason: String,
    },

    /// The finished document could not be written
    #[error("failed to write document {path}: {reason}")]
    Persist {
        /// Document path
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "rate_limited",
///     "message": "too many requests: retry after 4 seconds",
///     "details": {
///       "retry_after_seconds": 4
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::Validation(_) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 429 Too Many Requests
            Error::Throttled { .. } => 429,

            // 500 Internal Server Error - every pipeline stage failure is fatal
            Error::Database(_) => 500,
            Error::Extraction(_) => 500,
            Error::Retrieval(_) => 500,
            Error::Assembly(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Throttled { .. } => "rate_limited",
            Error::Validation(_) => "validation_error",
            Error::Database(_) => "database_error",
            Error::Extraction(e) => match e {
                ExtractionError::Timeout { .. } => "extraction_timeout",
                _ => "extraction_failed",
            },
            Error::Retrieval(_) => "retrieval_failed",
            Error::Assembly(e) => match e {
                AssemblyError::EmptyStaging { .. } => "empty_staging",
                _ => "assembly_failed",
            },
            Error::Io(_) => "io_error",
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        // Add contextual details for specific error types
        let details = match &error {
            Error::Throttled { retry_after_secs } => Some(serde_json::json!({
                "retry_after_seconds": retry_after_secs,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::Extraction(ExtractionError::Status { url, status }) => {
                Some(serde_json::json!({
                    "url": url,
                    "status": status,
                }))
            }
            Error::Retrieval(
                RetrievalError::Fetch { position, url, .. }
                | RetrievalError::Status { position, url, .. },
            ) => Some(serde_json::json!({
                "position": position,
                "url": url,
            })),
            Error::Assembly(AssemblyError::EmptyStaging { path }) => Some(serde_json::json!({
                "staging": path,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
