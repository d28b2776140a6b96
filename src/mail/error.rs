//! Errors raised while handling a form submission.

use thiserror::Error;

/// Failure of a single mail request.
///
/// Both kinds render the same way at the response layer. The display text is the
/// bare message so it can be shown to the submitter as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailError {
    /// The submission was rejected before any network call.
    #[error("{0}")]
    Validation(String),

    /// The delivery collaborator failed (auth, connection, remote rejection).
    #[error("{0}")]
    Delivery(String),
}

impl MailError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn delivery(message: impl Into<String>) -> Self {
        Self::Delivery(message.into())
    }

    /// Whether the error was raised before dispatch.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
