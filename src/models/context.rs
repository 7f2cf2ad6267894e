//! Ambient request metadata consumed by the record builder.

use std::net::SocketAddr;

use axum::http::{header, HeaderMap, HeaderName};

/// Per-request values that come from the transport rather than the body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Value of the request's own `User-Agent` header.
    pub user_agent: Option<String>,
    /// Resolved client address, or empty when nothing is known.
    pub ip: String,
}

impl RequestContext {
    /// Resolve user agent and client address from request parts.
    ///
    /// The client address is the first entry of `forwarded_header` when that
    /// header is trusted and non-empty, otherwise the peer address.
    #[must_use]
    pub fn from_parts(
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
        forwarded_header: Option<&HeaderName>,
    ) -> Self {
        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let forwarded = forwarded_header
            .and_then(|name| headers.get(name))
            .and_then(|v| v.to_str().ok())
            .and_then(first_forwarded_entry);

        let ip = forwarded
            .or_else(|| peer.map(|addr| addr.ip().to_string()))
            .unwrap_or_default();

        Self { user_agent, ip }
    }
}

/// First non-empty entry of a `client, proxy1, proxy2` chain.
fn first_forwarded_entry(raw: &str) -> Option<String> {
    raw.split(',')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}
