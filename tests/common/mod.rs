//! Common test utilities for mailrelay integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_test::multipart::MultipartForm;
use axum_test::TestServer;
use mailrelay::config::{Config, SmtpConfig};
use mailrelay::web::create_router;
use mailrelay::web::handlers::AppState;
use mailrelay::{MailEnvelope, MailError, MailRequestHandler, Mailer, TransportConfig};

/// Mailer stub that records every send call.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(TransportConfig, MailEnvelope)>>,
    fail_with: Option<String>,
}

impl RecordingMailer {
    /// A mailer whose sends always succeed.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A mailer whose sends always fail with the given message.
    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail_with: Some(message.to_string()),
        })
    }

    /// All recorded send calls.
    pub fn sent(&self) -> Vec<(TransportConfig, MailEnvelope)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        transport: &TransportConfig,
        envelope: &MailEnvelope,
    ) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap()
            .push((transport.clone(), envelope.clone()));
        match &self.fail_with {
            Some(message) => Err(MailError::delivery(message.clone())),
            None => Ok(()),
        }
    }
}

/// Create a test configuration with SMTP defaults and no static files.
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.smtp = SmtpConfig {
        host: "smtp.example.com".to_string(),
        port: 587,
        secure: false,
        user: "relay@example.com".to_string(),
        pass: "secret".to_string(),
    };
    config.web.serve_static = false;
    config
}

/// Create a test server around the router.
pub fn create_test_server(config: &Config, mailer: Arc<RecordingMailer>) -> TestServer {
    let handler = MailRequestHandler::new(config.mail_settings(), mailer);
    let app_state = Arc::new(AppState::new(handler, config.upload.clone()));
    let router = create_router(app_state, &config.web);

    TestServer::new(router).expect("Failed to create test server")
}

/// A complete, valid form.
pub fn valid_form() -> MultipartForm {
    MultipartForm::new()
        .add_text("name", "Ada Lovelace")
        .add_text("email", "ada@example.com")
        .add_text("subject", "Hello")
        .add_text("message", "This is a test message.")
        .add_text("recipients", " a@b.com , c@d.com ")
}
