//! Mail request handling.

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::config::MailSettings;

use super::{resolve_transport, MailEnvelope, MailError, MailSubmission, Mailer, TransportConfig};

/// Result of handling one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MailOutcome {
    /// Whether the message was handed to the mail server.
    pub ok: bool,
    /// Failure message, absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MailOutcome {
    pub fn success() -> Self {
        Self {
            ok: true,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: Some(message.into()),
        }
    }
}

impl From<Result<(), MailError>> for MailOutcome {
    fn from(result: Result<(), MailError>) -> Self {
        match result {
            Ok(()) => Self::success(),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

/// Validates submissions, resolves the transport and dispatches the message.
#[derive(Clone)]
pub struct MailRequestHandler {
    settings: Arc<MailSettings>,
    mailer: Arc<dyn Mailer>,
}

impl MailRequestHandler {
    /// Create a handler with fixed settings and a delivery collaborator.
    pub fn new(settings: MailSettings, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            settings: Arc::new(settings),
            mailer,
        }
    }

    /// Validate a submission and assemble what is needed to send it.
    ///
    /// Checks run in order and stop at the first failure: required fields,
    /// recipient list, recipient format.
    pub fn prepare(
        &self,
        submission: MailSubmission,
    ) -> Result<(TransportConfig, MailEnvelope), MailError> {
        submission.check_required()?;
        let recipients = submission.recipient_list()?;

        let transport = resolve_transport(&submission.overrides, &self.settings);
        let envelope = MailEnvelope::new(submission, &recipients, transport.user());

        Ok((transport, envelope))
    }

    /// Validate and send a submission. One delivery attempt, no retry.
    pub async fn dispatch(&self, submission: MailSubmission) -> Result<(), MailError> {
        let (transport, envelope) = self.prepare(submission)?;

        tracing::info!(
            transport = transport.kind(),
            recipients = %envelope.to,
            attachments = envelope.attachments.len(),
            "Sending mail"
        );

        self.mailer.send(&transport, &envelope).await
    }

    /// Handle a submission and report the outcome.
    pub async fn handle(&self, submission: MailSubmission) -> MailOutcome {
        let result = self.dispatch(submission).await;
        match &result {
            Ok(()) => tracing::info!("Mail sent"),
            Err(e) => tracing::warn!(
                validation = e.is_validation(),
                error = %e,
                "Mail request failed"
            ),
        }
        result.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SmtpConfig;
    use crate::mail::{Attachment, SmtpOverrides};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubMailer {
        sent: Mutex<Vec<(TransportConfig, MailEnvelope)>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl Mailer for StubMailer {
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

    fn settings() -> MailSettings {
        MailSettings {
            smtp: SmtpConfig {
                host: "smtp.example.com".to_string(),
                port: 587,
                secure: false,
                user: "relay@example.com".to_string(),
                pass: "secret".to_string(),
            },
            ..Default::default()
        }
    }

    fn submission() -> MailSubmission {
        MailSubmission {
            name: "Ada".to_string(),
            sender_email: "ada@example.com".to_string(),
            subject: "Hello".to_string(),
            message: "Body".to_string(),
            recipients: "a@b.com, c@d.com".to_string(),
            ..Default::default()
        }
    }

    fn handler(mailer: Arc<StubMailer>) -> MailRequestHandler {
        MailRequestHandler::new(settings(), mailer)
    }

    #[test]
    fn test_outcome_from_result() {
        assert_eq!(MailOutcome::from(Ok::<(), MailError>(())), MailOutcome::success());
        assert_eq!(
            MailOutcome::from(Err::<(), MailError>(MailError::delivery("boom"))),
            MailOutcome::failure("boom")
        );
    }

    #[test]
    fn test_outcome_serialize() {
        let json = serde_json::to_value(MailOutcome::success()).unwrap();
        assert_eq!(json, serde_json::json!({ "ok": true }));

        let json = serde_json::to_value(MailOutcome::failure("nope")).unwrap();
        assert_eq!(json, serde_json::json!({ "ok": false, "message": "nope" }));
    }

    #[test]
    fn test_prepare_builds_envelope() {
        let handler = handler(Arc::new(StubMailer::default()));

        let (transport, envelope) = handler.prepare(submission()).unwrap();

        assert_eq!(transport.kind(), "smtp");
        assert_eq!(envelope.from(), "\"Ada\" <relay@example.com>");
        assert_eq!(envelope.to, "a@b.com, c@d.com");
        assert_eq!(envelope.subject, "Hello [From: ada@example.com]");
    }

    #[test]
    fn test_prepare_from_uses_override_user() {
        let handler = handler(Arc::new(StubMailer::default()));
        let mut submission = submission();
        submission.overrides = SmtpOverrides {
            user: Some("other@example.com".to_string()),
            ..Default::default()
        };

        let (_, envelope) = handler.prepare(submission).unwrap();
        assert_eq!(envelope.from_address, "other@example.com");
    }

    #[test]
    fn test_prepare_required_checked_before_recipients() {
        let handler = handler(Arc::new(StubMailer::default()));
        let mut submission = submission();
        submission.name.clear();
        submission.recipients = "not-an-email".to_string();

        let err = handler.prepare(submission).unwrap_err();
        assert_eq!(err, MailError::validation("All fields are required"));
    }

    #[tokio::test]
    async fn test_handle_success_sends_once() {
        let mailer = Arc::new(StubMailer::default());
        let handler = handler(mailer.clone());

        let outcome = handler.handle(submission()).await;

        assert_eq!(outcome, MailOutcome::success());
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1.to, "a@b.com, c@d.com");
    }

    #[tokio::test]
    async fn test_handle_validation_failure_skips_mailer() {
        let mailer = Arc::new(StubMailer::default());
        let handler = handler(mailer.clone());
        let mut submission = submission();
        submission.recipients = "a@b.com, not-an-email".to_string();

        let outcome = handler.handle(submission).await;

        assert_eq!(
            outcome,
            MailOutcome::failure("Invalid email format: not-an-email")
        );
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handle_delivery_failure_not_retried() {
        let mailer = Arc::new(StubMailer {
            fail_with: Some("535 Authentication failed".to_string()),
            ..Default::default()
        });
        let handler = handler(mailer.clone());

        let outcome = handler.handle(submission()).await;

        assert_eq!(outcome, MailOutcome::failure("535 Authentication failed"));
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_handle_passes_attachments() {
        let mailer = Arc::new(StubMailer::default());
        let handler = handler(mailer.clone());
        let mut submission = submission();
        submission.attachments = vec![
            Attachment {
                filename: "a.txt".to_string(),
                content: Bytes::from_static(b"first"),
                content_type: "text/plain".to_string(),
            },
            Attachment {
                filename: "b.pdf".to_string(),
                content: Bytes::from_static(b"%PDF"),
                content_type: "application/pdf".to_string(),
            },
        ];

        handler.handle(submission).await;

        let sent = mailer.sent.lock().unwrap();
        let attachments = &sent[0].1.attachments;
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0].filename, "a.txt");
        assert_eq!(attachments[1].filename, "b.pdf");
        assert_eq!(attachments[1].content_type, "application/pdf");
    }
}
