//! Segment acquisition handler.

use crate::api::AppState;
use crate::api::client_key::ClientKey;
use crate::error::Result;
use crate::types::{AcquireMode, AcquireRequest};
use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};

use super::AcquireResponse;

/// GET /acquire - Acquire a segment
///
/// Runs the full pipeline for a fresh segment, or answers from the stored
/// document when the segment was already assembled.
#[utoipa::path(
    get,
    path = "/acquire",
    tag = "segments",
    params(
        ("work" = String, Query, description = "Work identifier"),
        ("segment" = Option<String>, Query, description = "Segment identifier"),
        ("mode" = Option<AcquireMode>, Query, description = "inline (default) or download")
    ),
    responses(
        (status = 200, description = "Segment assembled or already available", body = AcquireResponse),
        (status = 303, description = "Redirect to GET /document (download mode)"),
        (status = 400, description = "Missing or blank work", body = crate::error::ApiError),
        (status = 429, description = "Client exceeded its rate limit", body = crate::error::ApiError),
        (status = 500, description = "A pipeline stage failed", body = crate::error::ApiError)
    )
)]
pub async fn acquire_segment(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
    Query(request): Query<AcquireRequest>,
) -> Result<Response> {
    let mode = request.mode;
    let outcome = state.pipeline.acquire(request, &client).await?;

    let response = match mode {
        AcquireMode::Inline => Json(AcquireResponse::success(outcome.title())).into_response(),
        AcquireMode::Download => Redirect::to(&format!(
            "/document?work={}",
            urlencoding::encode(outcome.title())
        ))
        .into_response(),
    };
    Ok(response)
}
