//! REST API server module
//!
//! Exposes segment acquisition, document retrieval and the admin record views
//! over HTTP, with an OpenAPI 3 description of every route.

use crate::{Config, Result, SegmentPipeline};
use axum::{Router, http::HeaderValue, middleware, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod client_key;
pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Segments
/// - `GET /acquire?work=&segment=&mode=` - Acquire a segment
///
/// ## Documents
/// - `GET /document?work=` - Download an assembled document
///
/// ## Admin (requires `X-Admin-Access-Token`)
/// - `GET /admin/segments` - List segment records
/// - `GET /admin/segments/:work/:segment/images` - List a segment's images
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /events` - Server-sent events stream
pub fn create_router(pipeline: Arc<SegmentPipeline>, config: Arc<Config>) -> Router {
    let state = AppState::new(pipeline, config.clone());

    let admin = Router::new()
        .route("/admin/segments", get(routes::list_segments))
        .route(
            "/admin/segments/:work/:segment/images",
            get(routes::list_segment_images),
        )
        .route_layer(middleware::from_fn_with_state(
            config.server.api.admin_token.clone(),
            auth::require_admin_token,
        ));

    let router = Router::new()
        // Segments
        .route("/acquire", get(routes::acquire_segment))
        // Documents
        .route("/document", get(routes::get_document))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream))
        .merge(admin);

    // Merge Swagger UI routes if enabled in config (before applying state).
    // SwaggerUi serves its own copy of the document, so it needs a path of its own.
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` or an empty list allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server stops. The service is built with
/// `ConnectInfo<SocketAddr>` so handlers can key rate limiting on the peer IP.
///
/// # Example
///
/// ```no_run
/// use segment_dl::{Config, SegmentPipeline};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let pipeline = Arc::new(SegmentPipeline::new((*config).clone()).await?);
///
/// segment_dl::api::start_api_server(pipeline, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(pipeline: Arc<SegmentPipeline>, config: Arc<Config>) -> Result<()> {
    let listener = bind(&config).await?;
    serve(listener, pipeline, config, std::future::pending()).await
}

/// Bind the configured address
pub async fn bind(config: &Config) -> Result<TcpListener> {
    let bind_address = config.server.api.bind_address;
    tracing::info!(address = %bind_address, "Starting API server");

    TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)
}

/// Serve the API on `listener` until `shutdown` resolves
pub async fn serve<F>(
    listener: TcpListener,
    pipeline: Arc<SegmentPipeline>,
    config: Arc<Config>,
    shutdown: F,
) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    if let Ok(address) = listener.local_addr() {
        tracing::info!(address = %address, "API server listening");
    }

    let app = create_router(pipeline, config);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
