//! OpenAPI document and Swagger UI.

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::dto::SendEmailForm;
use super::handlers;
use super::middleware::create_cors_layer;
use crate::mail::MailOutcome;

/// Path of the Swagger UI.
pub const SWAGGER_UI_PATH: &str = "/docs";

/// Path of the OpenAPI document.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Email Sending API",
        version = "1.0.0",
        description = "API for sending emails with attachments"
    ),
    paths(handlers::mail::send_email, handlers::health::health_check),
    components(schemas(SendEmailForm, MailOutcome)),
    tags(
        (name = "mail", description = "Contact form relay"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

/// Create the documentation router.
pub fn create_docs_router(cors_origins: &[String]) -> Router {
    Router::new()
        .merge(SwaggerUi::new(SWAGGER_UI_PATH).url(OPENAPI_PATH, ApiDoc::openapi()))
        .layer(create_cors_layer(cors_origins))
}
