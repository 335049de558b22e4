//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`segments`] - Segment acquisition
//! - [`documents`] - Assembled document retrieval
//! - [`admin`] - Segment and image records (admin token required)
//! - [`system`] - Health, events, OpenAPI

use serde::{Deserialize, Serialize};

mod admin;
mod documents;
mod segments;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use admin::*;
pub use documents::*;
pub use segments::*;
pub use system::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Query parameters for GET /document
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DocumentQuery {
    /// Canonical title of the work, as returned by GET /acquire
    #[serde(default)]
    pub work: Option<String>,
}

/// Response body for GET /acquire in inline mode
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AcquireResponse {
    /// Always "success"
    pub status: String,
    /// The canonical title of the work
    pub data: Vec<String>,
}

impl AcquireResponse {
    /// Successful acquisition of `title`
    pub fn success(title: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            data: vec![title.into()],
        }
    }
}
