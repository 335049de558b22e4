//! Admin handlers: segment and image records.

use crate::api::AppState;
use crate::error::{Error, Result};
use crate::types::{ImageInfo, SegmentInfo};
use axum::{
    Json,
    extract::{Path, State},
};

/// GET /admin/segments - List every segment seen, most recent first
#[utoipa::path(
    get,
    path = "/admin/segments",
    tag = "admin",
    responses(
        (status = 200, description = "Segment records", body = Vec<SegmentInfo>),
        (status = 401, description = "Missing or invalid admin token", body = crate::error::ApiError)
    ),
    security(("admin_token" = []))
)]
pub async fn list_segments(State(state): State<AppState>) -> Result<Json<Vec<SegmentInfo>>> {
    let segments = state.pipeline.db.list_segments().await?;
    Ok(Json(segments.into_iter().map(SegmentInfo::from).collect()))
}

/// GET /admin/segments/:work/:segment/images - List a segment's page images
#[utoipa::path(
    get,
    path = "/admin/segments/{work}/{segment}/images",
    tag = "admin",
    params(
        ("work" = String, Path, description = "Work identifier"),
        ("segment" = String, Path, description = "Segment identifier")
    ),
    responses(
        (status = 200, description = "Image records ordered by position", body = Vec<ImageInfo>),
        (status = 401, description = "Missing or invalid admin token", body = crate::error::ApiError),
        (status = 404, description = "Segment not found", body = crate::error::ApiError)
    ),
    security(("admin_token" = []))
)]
pub async fn list_segment_images(
    State(state): State<AppState>,
    Path((work, segment)): Path<(String, String)>,
) -> Result<Json<Vec<ImageInfo>>> {
    if state.pipeline.db.get_segment(&work, &segment).await?.is_none() {
        return Err(Error::NotFound(format!("segment '{}' of '{}'", segment, work)));
    }

    let images = state.pipeline.db.list_images(&work, &segment).await?;
    Ok(Json(images.into_iter().map(ImageInfo::from).collect()))
}
