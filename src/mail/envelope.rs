//! Outbound message assembly.

use super::{Attachment, MailSubmission};

/// A fully assembled message ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailEnvelope {
    /// Display name of the sender.
    pub from_name: String,
    /// Account address the message is sent from.
    pub from_address: String,
    /// Recipients joined with `", "`.
    pub to: String,
    pub subject: String,
    /// Plain text body.
    pub text: String,
    pub attachments: Vec<Attachment>,
}

impl MailEnvelope {
    /// Build the envelope for a validated submission.
    ///
    /// The submitter's address goes into the subject line, since the message is
    /// sent from the relay account rather than from the submitter.
    pub fn new(submission: MailSubmission, recipients: &[String], account_user: &str) -> Self {
        Self {
            subject: format!(
                "{} [From: {}]",
                submission.subject, submission.sender_email
            ),
            from_name: submission.name,
            from_address: account_user.to_string(),
            to: recipients.join(", "),
            text: submission.message,
            attachments: submission.attachments,
        }
    }

    /// The From header value, `"<name>" <account>`.
    pub fn from(&self) -> String {
        format!("\"{}\" <{}>", self.from_name, self.from_address)
    }
}
