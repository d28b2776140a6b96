//! Mail handlers.

use axum::{extract::State, http::StatusCode, response::Response};
use std::sync::Arc;
use utoipa;

use crate::web::dto::{render_outcome, MailForm, NoticeFormat};
use crate::web::handlers::AppState;

/// POST /send-email - Relay a contact form submission as an email.
///
/// Responds 200 on success and 500 on any validation or delivery failure. The
/// body is a notice page that returns to the form, or JSON when requested.
#[utoipa::path(
    post,
    path = "/send-email",
    tag = "mail",
    request_body(
        content = SendEmailForm,
        content_type = "multipart/form-data",
        description = "Contact form fields and up to 5 attachments"
    ),
    responses(
        (status = 200, description = "Email sent", body = MailOutcome),
        (status = 400, description = "Malformed form body", body = MailOutcome),
        (status = 413, description = "Too many or too large attachments", body = MailOutcome),
        (status = 500, description = "Validation or delivery failure", body = MailOutcome)
    )
)]
pub async fn send_email(
    State(state): State<Arc<AppState>>,
    format: NoticeFormat,
    MailForm(submission): MailForm,
) -> Response {
    let outcome = state.mail.handle(submission).await;

    let status = if outcome.ok {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    render_outcome(&outcome, status, format)
}
