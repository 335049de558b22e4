//! Client identification for rate limiting
//!
//! The client key is the leftmost address in `X-Forwarded-For` when present,
//! otherwise the peer IP of the TCP connection.

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use std::convert::Infallible;
use std::net::SocketAddr;

/// Key used when neither a forwarding header nor a peer address is available
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derive the client key from request headers and the peer address
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    match (forwarded, peer) {
        (Some(forwarded), _) => forwarded.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        (None, None) => UNKNOWN_CLIENT.to_string(),
    }
}

/// Extractor yielding the requesting client's key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for ClientKey
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientKey(client_key(&parts.headers, peer)))
    }
}
