//! HTTP handlers.

pub mod health;
pub mod mail;

pub use health::*;
pub use mail::*;

use crate::config::UploadConfig;
use crate::mail::MailRequestHandler;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Mail request handler.
    pub mail: MailRequestHandler,
    /// Upload limits for the form extractor.
    pub upload: UploadConfig,
}

impl AppState {
    /// Create a new application state.
    pub fn new(mail: MailRequestHandler, upload: UploadConfig) -> Self {
        Self { mail, upload }
    }
}
