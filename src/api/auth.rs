//! Admin authentication middleware for the REST API
//!
//! Admin routes require an `X-Admin-Access-Token` header matching
//! `ApiConfig::admin_token`. When no token is configured the admin routes are
//! closed: every request receives 401 Unauthorized.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

/// Header carrying the admin secret
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-access-token";

/// Authentication middleware guarding the admin routes
///
/// # Arguments
///
/// * `State(expected_token)` - The configured admin secret, if any
/// * `request` - The incoming HTTP request
/// * `next` - The next middleware/handler in the chain
///
/// # Returns
///
/// Returns either:
/// - 401 Unauthorized if no secret is configured, or the header is missing or wrong
/// - The response from the next handler if authentication succeeds
///
/// # Examples
///
/// ```no_run
/// use axum::{Router, middleware};
/// use segment_dl::api::auth::require_admin_token;
///
/// let token = Some("secret-token-123".to_string());
/// let router: Router = Router::new()
///     .layer(middleware::from_fn_with_state(
///         token,
///         require_admin_token
///     ));
/// ```
pub async fn require_admin_token(
    State(expected_token): State<Option<String>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected_token) = expected_token.filter(|t| !t.is_empty()) else {
        return unauthorized_response("Admin access is disabled");
    };

    let provided = request
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(token) if constant_time_eq(token.as_bytes(), expected_token.as_bytes()) => {
            next.run(request).await
        }
        Some(_) => unauthorized_response("Invalid admin access token"),
        None => unauthorized_response("Missing X-Admin-Access-Token header"),
    }
}

/// Constant-time byte comparison to prevent timing side-channel attacks.
/// Always compares all bytes regardless of where the first mismatch occurs.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

fn unauthorized_response(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(ApiError::unauthorized(message))).into_response()
}
