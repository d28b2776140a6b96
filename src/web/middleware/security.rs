//! Security headers middleware.

use axum::{
    body::Body,
    extract::State,
    http::{header::HeaderValue, Request},
    middleware::Next,
    response::Response,
};

use crate::config::WebConfig;

/// Which optional security headers to send.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityPolicy {
    /// Send Strict-Transport-Security.
    pub hsts: bool,
}

impl From<&WebConfig> for SecurityPolicy {
    fn from(config: &WebConfig) -> Self {
        Self { hsts: config.hsts }
    }
}

/// Security headers middleware.
///
/// Adds the following headers to all responses:
/// - X-Content-Type-Options: nosniff
/// - X-Frame-Options: DENY
/// - X-XSS-Protection: 1; mode=block
/// - Content-Security-Policy (inline scripts allowed for the notice page)
/// - Strict-Transport-Security, when enabled
pub async fn security_headers(
    State(policy): State<SecurityPolicy>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "X-XSS-Protection",
        HeaderValue::from_static("1; mode=block"),
    );
    headers.insert(
        "Content-Security-Policy",
        HeaderValue::from_static("default-src 'self'; script-src 'self' 'unsafe-inline'"),
    );

    if policy.hsts {
        headers.insert(
            "Strict-Transport-Security",
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        );
    }

    response
}
