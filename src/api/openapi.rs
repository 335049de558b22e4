//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the segment-dl REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the segment-dl REST API
///
/// The document is served at:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "segment-dl REST API",
        version = "0.1.0",
        description = "Acquire a work's segment as a single PDF, retrieve assembled documents, and inspect segment records",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        // Segments
        crate::api::routes::acquire_segment,

        // Documents
        crate::api::routes::get_document,

        // Admin
        crate::api::routes::list_segments,
        crate::api::routes::list_segment_images,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::AcquireMode,
        crate::types::AcquireRequest,
        crate::types::PipelineStage,
        crate::types::Event,
        crate::types::SegmentInfo,
        crate::types::ImageInfo,

        // API request/response types from routes
        crate::api::routes::AcquireResponse,
        crate::api::routes::DocumentQuery,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "segments", description = "Segment acquisition - Fetch a segment's pages and assemble them"),
        (name = "documents", description = "Documents - Download assembled PDFs"),
        (name = "admin", description = "Admin - Inspect segment and image records"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security addon to add the admin token scheme to the OpenAPI spec
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "admin_token",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-Admin-Access-Token"),
                    ),
                ),
            );
        }
    }
}
