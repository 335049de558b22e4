//! Document retrieval handler.

use crate::api::AppState;
use crate::error::{Error, Result};
use crate::utils::sanitize_title;
use axum::{
    body::Body,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

use super::DocumentQuery;

/// GET /document - Download an assembled document
#[utoipa::path(
    get,
    path = "/document",
    tag = "documents",
    params(
        ("work" = String, Query, description = "Canonical title of the work")
    ),
    responses(
        (status = 200, description = "The PDF document", content_type = "application/pdf"),
        (status = 400, description = "Missing or blank work", body = crate::error::ApiError),
        (status = 404, description = "No document for this title", body = crate::error::ApiError)
    )
)]
pub async fn get_document(
    State(state): State<AppState>,
    Query(query): Query<DocumentQuery>,
) -> Result<Response> {
    let title = query
        .work
        .as_deref()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .ok_or_else(|| Error::Validation("work is required".into()))?;

    let path = state.pipeline.document_path(title);
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotFound(format!("no document for '{}'", title)));
        }
        Err(e) => return Err(Error::Io(e)),
    };
    let length = file.metadata().await?.len();

    tracing::debug!(title, path = %path.display(), bytes = length, "Serving document");

    let disposition = format!("attachment; filename=\"{}.pdf\"", sanitize_title(title));
    let mut response = (StatusCode::OK, Body::from_stream(ReaderStream::new(file))).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/pdf"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}
