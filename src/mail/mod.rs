//! Mail module for mailrelay.
//!
//! Turns a contact form submission into one outbound email:
//! - Submission validation (required fields, recipient addresses)
//! - Transport selection (OAuth2 or plain SMTP)
//! - Envelope assembly, including attachments
//! - Delivery through a [`Mailer`]

mod envelope;
mod error;
mod handler;
mod mailer;
mod oauth;
mod submission;
mod transport;

pub use envelope::MailEnvelope;
pub use error::MailError;
pub use handler::{MailOutcome, MailRequestHandler};
pub use mailer::{build_message, Mailer, SmtpMailer};
pub use oauth::TokenClient;
pub use submission::{
    is_valid_address, parse_recipients, Attachment, MailSubmission, SmtpOverrides,
    NO_RECIPIENTS_MESSAGE, REQUIRED_FIELDS_MESSAGE,
};
pub use transport::{
    resolve_transport, well_known_service, OAuth2Transport, SmtpTransport, TransportConfig,
    WellKnownService, DEFAULT_OAUTH_EXPIRES_IN,
};
