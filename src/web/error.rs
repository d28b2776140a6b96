//! Rejections raised at the HTTP boundary, before the mail handler runs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::dto::{render_outcome, NoticeFormat};
use crate::mail::MailOutcome;

/// Rejection codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionCode {
    /// Malformed form body (400).
    BadRequest,
    /// Too many or too large attachments (413).
    PayloadTooLarge,
}

impl RejectionCode {
    /// Get the HTTP status code for this rejection.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RejectionCode::BadRequest => StatusCode::BAD_REQUEST,
            RejectionCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

/// A form submission rejected before reaching the handler.
///
/// Rendered as the same failure notice the handler produces.
#[derive(Debug)]
pub struct FormRejection {
    code: RejectionCode,
    message: String,
    format: NoticeFormat,
}

impl FormRejection {
    /// Create a new rejection.
    pub fn new(code: RejectionCode, message: impl Into<String>, format: NoticeFormat) -> Self {
        Self {
            code,
            message: message.into(),
            format,
        }
    }

    /// Create a bad request rejection.
    pub fn bad_request(message: impl Into<String>, format: NoticeFormat) -> Self {
        Self::new(RejectionCode::BadRequest, message, format)
    }

    /// Create a payload too large rejection.
    pub fn payload_too_large(message: impl Into<String>, format: NoticeFormat) -> Self {
        Self::new(RejectionCode::PayloadTooLarge, message, format)
    }

    pub fn code(&self) -> RejectionCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for FormRejection {
    fn into_response(self) -> Response {
        tracing::warn!(code = ?self.code, "Form rejected: {}", self.message);
        render_outcome(
            &MailOutcome::failure(self.message),
            self.code.status_code(),
            self.format,
        )
    }
}

impl std::fmt::Display for FormRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for FormRejection {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_code_status() {
        assert_eq!(
            RejectionCode::BadRequest.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RejectionCode::PayloadTooLarge.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_rejection_constructors() {
        let err = FormRejection::bad_request("bad", NoticeFormat::Html);
        assert_eq!(err.code(), RejectionCode::BadRequest);
        assert_eq!(err.message(), "bad");

        let err = FormRejection::payload_too_large("big", NoticeFormat::Json);
        assert_eq!(err.code(), RejectionCode::PayloadTooLarge);
        assert_eq!(err.to_string(), "PayloadTooLarge: big");
    }

    #[test]
    fn test_rejection_response_status() {
        let response =
            FormRejection::payload_too_large("Too many files", NoticeFormat::Html).into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
