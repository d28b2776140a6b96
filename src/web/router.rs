//! Router configuration.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::docs::create_docs_router;
use super::handlers::{health_check, send_email, AppState};
use super::middleware::{security_headers, SecurityPolicy};
use crate::config::WebConfig;

/// Create the main router.
///
/// Mounts the form endpoint, the health check and, depending on
/// configuration, the API documentation and the static contact form.
pub fn create_router(app_state: Arc<AppState>, web: &WebConfig) -> Router {
    let body_limit = app_state.upload.body_limit_bytes();

    let mail_routes = Router::new()
        .route("/send-email", post(send_email))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(app_state);

    let mut router = Router::new()
        .merge(mail_routes)
        .merge(create_health_router());

    if web.docs_enabled {
        router = router.merge(create_docs_router(&web.cors_origins));
    }

    if web.serve_static {
        if let Some(static_router) = create_static_router(&web.static_path) {
            router = router.merge(static_router);
        }
    }

    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(middleware::from_fn_with_state(
                SecurityPolicy::from(web),
                security_headers,
            )),
    )
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Create a router serving static files, or `None` if the directory is missing.
pub fn create_static_router(path: &str) -> Option<Router> {
    if !Path::new(path).is_dir() {
        tracing::warn!("Static file directory not found: {}", path);
        return None;
    }
    Some(Router::new().fallback_service(ServeDir::new(path)))
}
