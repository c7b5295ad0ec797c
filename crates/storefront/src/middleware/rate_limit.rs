//! Rate limiting for the sign-in endpoints, using governor and
//! `tower_governor`.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use thiserror::Error;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Seconds to replenish one auth request.
const AUTH_REPLENISH_SECONDS: u64 = 6;

/// Auth requests allowed in a burst.
const AUTH_BURST: u32 = 10;

#[derive(Debug, Error)]
#[error("invalid rate limiter configuration: {0}")]
pub struct RateLimitError(&'static str);

/// Client IP key extractor.
///
/// Prefers the proxy headers (`x-forwarded-for`, then `x-real-ip`) and falls
/// back to the socket peer address when the server was started with connect
/// info.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

fn header_ip<T>(req: &Request<T>, name: &str) -> Option<IpAddr> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse().ok())
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        header_ip(req, "x-forwarded-for")
            .or_else(|| header_ip(req, "x-real-ip"))
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Rate limiter for auth endpoints: one request every 6 seconds per IP
/// after a burst of 10.
///
/// # Errors
///
/// Returns `RateLimitError` if governor rejects the quota.
pub fn auth_rate_limiter() -> Result<RateLimiterLayer, RateLimitError> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(AUTH_REPLENISH_SECONDS)
        .burst_size(AUTH_BURST)
        .finish()
        .ok_or(RateLimitError("auth quota"))?;
    Ok(GovernorLayer::new(Arc::new(config)))
}
