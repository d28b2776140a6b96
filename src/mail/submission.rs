//! Inbound form submissions and their validation.

use bytes::Bytes;
use validator::Validate;

use super::MailError;

/// Message for a missing required field.
pub const REQUIRED_FIELDS_MESSAGE: &str = "All fields are required";

/// Message for a recipient list with no addresses in it.
pub const NO_RECIPIENTS_MESSAGE: &str = "At least one recipient is required";

/// An uploaded file, held in memory for the duration of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Original filename as sent by the browser.
    pub filename: String,
    /// Raw file content.
    pub content: Bytes,
    /// Declared content type.
    pub content_type: String,
}

/// Per-request SMTP settings that replace the configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmtpOverrides {
    pub host: Option<String>,
    pub port: Option<String>,
    pub secure: Option<String>,
    pub user: Option<String>,
    pub pass: Option<String>,
}

/// A contact form submission.
#[derive(Debug, Clone, Default, Validate)]
pub struct MailSubmission {
    /// Sender display name.
    #[validate(length(min = 1))]
    pub name: String,
    /// Reply address of the submitter.
    #[validate(length(min = 1))]
    pub sender_email: String,
    #[validate(length(min = 1))]
    pub subject: String,
    #[validate(length(min = 1))]
    pub message: String,
    /// Comma separated recipient addresses.
    #[validate(length(min = 1))]
    pub recipients: String,
    /// Uploaded files in upload order.
    pub attachments: Vec<Attachment>,
    pub overrides: SmtpOverrides,
}

impl MailSubmission {
    /// Check that every required text field is non-empty.
    pub fn check_required(&self) -> Result<(), MailError> {
        self.validate()
            .map_err(|_| MailError::validation(REQUIRED_FIELDS_MESSAGE))
    }

    /// Parse and validate the recipient list.
    pub fn recipient_list(&self) -> Result<Vec<String>, MailError> {
        parse_recipients(&self.recipients)
    }
}

/// Split a comma separated recipient list and validate every address.
///
/// Entries that are empty after trimming are dropped before the format check,
/// so `"a@b.com,"` is one recipient and `","` is none.
pub fn parse_recipients(raw: &str) -> Result<Vec<String>, MailError> {
    let recipients: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect();

    if recipients.is_empty() {
        return Err(MailError::validation(NO_RECIPIENTS_MESSAGE));
    }

    if let Some(invalid) = recipients.iter().find(|r| !is_valid_address(r)) {
        return Err(MailError::validation(format!(
            "Invalid email format: {invalid}"
        )));
    }

    Ok(recipients)
}

/// Basic address shape check: `local@domain.tld`.
///
/// No whitespace and exactly one `@`. The domain needs a `.` with at least one
/// character on each side.
pub fn is_valid_address(address: &str) -> bool {
    if address.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let last = domain.len().saturating_sub(1);
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i < last)
}
