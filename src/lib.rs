//! mailrelay - contact form mail relay
//!
//! Accepts a web form submission and relays it as an email over plain SMTP
//! or OAuth2-authenticated SMTP.

pub mod config;
pub mod error;
pub mod logging;
pub mod mail;
pub mod web;

pub use config::{Config, MailSettings};
pub use error::{RelayError, Result};
pub use mail::{
    MailEnvelope, MailError, MailOutcome, MailRequestHandler, MailSubmission, Mailer, SmtpMailer,
    TransportConfig,
};
pub use web::WebServer;
