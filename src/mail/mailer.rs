//! Mail delivery.

use async_trait::async_trait;
use lettre::message::header::{ContentType, To};
use lettre::message::{Attachment as LettreAttachment, Mailbox, Mailboxes, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::oauth::TokenClient;
use super::transport::{well_known_service, OAuth2Transport, SmtpTransport};
use super::{MailEnvelope, MailError, TransportConfig};

/// Async delivery collaborator.
///
/// Implementations perform exactly one send attempt per call.
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    /// Send the envelope over the given transport.
    async fn send(&self, transport: &TransportConfig, envelope: &MailEnvelope)
        -> Result<(), MailError>;
}

/// SMTP mailer using lettre.
///
/// A new connection is opened for every message.
#[derive(Debug, Clone, Default)]
pub struct SmtpMailer {
    tokens: TokenClient,
}

impl SmtpMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the transport for a plain SMTP configuration.
    fn smtp_transport(
        smtp: &SmtpTransport,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let builder = if smtp.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host).map_err(delivery_error)?
        } else {
            let tls = TlsParameters::new(smtp.host.clone()).map_err(delivery_error)?;
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host)
                .tls(Tls::Opportunistic(tls))
        };

        let mut builder = builder.port(smtp.port);
        if !smtp.user.is_empty() {
            builder = builder.credentials(Credentials::new(smtp.user.clone(), smtp.pass.clone()));
        }

        Ok(builder.build())
    }

    /// Build the transport for an OAuth2 configuration.
    async fn oauth_transport(
        &self,
        oauth: &OAuth2Transport,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let service = well_known_service(&oauth.service)
            .ok_or_else(|| MailError::delivery(format!("Unknown mail service: {}", oauth.service)))?;

        let access_token = self.tokens.access_token(oauth).await?;

        let builder = if service.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(service.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(service.host)
        }
        .map_err(delivery_error)?;

        Ok(builder
            .port(service.port)
            .credentials(Credentials::new(oauth.user.clone(), access_token))
            .authentication(vec![Mechanism::Xoauth2])
            .build())
    }
}

/// Build a lettre Message from an envelope.
pub fn build_message(envelope: &MailEnvelope) -> Result<Message, MailError> {
    let from_address: Address = envelope.from_address.parse().map_err(|_| {
        MailError::delivery(format!("Invalid sender address: {}", envelope.from_address))
    })?;
    let from = Mailbox::new(Some(envelope.from_name.clone()), from_address);

    let to: Mailboxes = envelope
        .to
        .parse()
        .map_err(|_| MailError::delivery(format!("Invalid recipient address: {}", envelope.to)))?;

    let builder = Message::builder()
        .from(from)
        .mailbox(To::from(to))
        .subject(&envelope.subject);

    let text = SinglePart::plain(envelope.text.clone());

    let message = if envelope.attachments.is_empty() {
        builder.singlepart(text)
    } else {
        let mut parts = MultiPart::mixed().singlepart(text);
        for attachment in &envelope.attachments {
            let content_type = ContentType::parse(&attachment.content_type)
                .or_else(|_| ContentType::parse("application/octet-stream"))
                .map_err(delivery_error)?;
            parts = parts.singlepart(
                LettreAttachment::new(attachment.filename.clone())
                    .body(attachment.content.to_vec(), content_type),
            );
        }
        builder.multipart(parts)
    };

    message.map_err(delivery_error)
}

fn delivery_error<E: std::fmt::Display>(e: E) -> MailError {
    MailError::delivery(e.to_string())
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(
        &self,
        transport: &TransportConfig,
        envelope: &MailEnvelope,
    ) -> Result<(), MailError> {
        let message = build_message(envelope)?;

        let smtp = match transport {
            TransportConfig::Smtp(smtp) => Self::smtp_transport(smtp)?,
            TransportConfig::OAuth2(oauth) => self.oauth_transport(oauth).await?,
        };

        let response = smtp.send(message).await.map_err(delivery_error)?;
        tracing::debug!(code = %response.code(), "SMTP server accepted message");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::Attachment;
    use bytes::Bytes;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Single-connection SMTP server that records every line the client sends.
    ///
    /// Advertises AUTH but not STARTTLS, so opportunistic TLS stays in plaintext.
    async fn spawn_smtp_server(reject_rcpt: bool) -> (u16, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read, mut write) = stream.into_split();
            let mut lines = BufReader::new(read).lines();
            let mut transcript = Vec::new();
            let mut in_data = false;

            write.write_all(b"220 localhost ESMTP test\r\n").await.unwrap();

            while let Ok(Some(line)) = lines.next_line().await {
                transcript.push(line.clone());

                if in_data {
                    if line == "." {
                        in_data = false;
                        write.write_all(b"250 2.0.0 Queued\r\n").await.unwrap();
                    }
                    continue;
                }

                let command = line.to_ascii_uppercase();
                let reply: &[u8] = if command.starts_with("EHLO") {
                    b"250-localhost\r\n250-AUTH PLAIN LOGIN\r\n250 8BITMIME\r\n"
                } else if command.starts_with("AUTH") {
                    b"235 2.7.0 Authentication successful\r\n"
                } else if command.starts_with("RCPT") && reject_rcpt {
                    b"550 5.1.1 Mailbox unavailable\r\n"
                } else if command.starts_with("DATA") {
                    in_data = true;
                    b"354 End data with <CR><LF>.<CR><LF>\r\n"
                } else if command.starts_with("QUIT") {
                    let _ = write.write_all(b"221 2.0.0 Bye\r\n").await;
                    break;
                } else {
                    b"250 2.0.0 OK\r\n"
                };
                if write.write_all(reply).await.is_err() {
                    break;
                }
            }

            transcript
        });

        (port, handle)
    }

    fn local_smtp(port: u16, user: &str) -> TransportConfig {
        TransportConfig::Smtp(SmtpTransport {
            host: "127.0.0.1".to_string(),
            port,
            secure: false,
            user: user.to_string(),
            pass: if user.is_empty() { String::new() } else { "secret".to_string() },
        })
    }

    fn count(transcript: &[String], prefix: &str) -> usize {
        transcript.iter().filter(|l| l.starts_with(prefix)).count()
    }

    fn envelope() -> MailEnvelope {
        MailEnvelope {
            from_name: "Ada".to_string(),
            from_address: "relay@example.com".to_string(),
            to: "a@b.com, c@d.com".to_string(),
            subject: "Hello [From: ada@example.com]".to_string(),
            text: "Body text".to_string(),
            attachments: vec![],
        }
    }

    fn formatted(message: &Message) -> String {
        String::from_utf8_lossy(&message.formatted()).to_string()
    }

    #[test]
    fn test_build_message_headers() {
        let message = build_message(&envelope()).unwrap();
        let raw = formatted(&message);

        assert!(
            raw.contains("From: \"Ada\" <relay@example.com>")
                || raw.contains("From: Ada <relay@example.com>")
        );
        assert!(raw.contains("To: a@b.com, c@d.com"));
        assert!(raw.contains("Subject: Hello [From: ada@example.com]"));
        assert!(raw.contains("Body text"));

        let recipients = message.envelope().to();
        assert_eq!(recipients.len(), 2);
    }

    #[test]
    fn test_build_message_with_attachments() {
        let mut envelope = envelope();
        envelope.attachments = vec![
            Attachment {
                filename: "notes.txt".to_string(),
                content: Bytes::from_static(b"hello"),
                content_type: "text/plain".to_string(),
            },
            Attachment {
                filename: "blob.bin".to_string(),
                content: Bytes::from_static(b"\x00\x01"),
                content_type: "not a mime type".to_string(),
            },
        ];

        let raw = formatted(&build_message(&envelope).unwrap());

        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("filename=\"notes.txt\""));
        assert!(raw.contains("filename=\"blob.bin\""));
        assert!(raw.contains("application/octet-stream"));
    }

    #[test]
    fn test_build_message_invalid_sender() {
        let mut envelope = envelope();
        envelope.from_address = String::new();

        let err = build_message(&envelope).unwrap_err();
        assert_eq!(err, MailError::delivery("Invalid sender address: "));
    }

    #[tokio::test]
    async fn test_send_unknown_service() {
        let transport = TransportConfig::OAuth2(OAuth2Transport {
            service: "carrier-pigeon".to_string(),
            user: "relay@example.com".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "refresh".to_string(),
            access_token: Some("token".to_string()),
            expires_in: 3600,
            token_url: "http://127.0.0.1:1/token".to_string(),
        });

        let err = SmtpMailer::new()
            .send(&transport, &envelope())
            .await
            .unwrap_err();
        assert_eq!(err, MailError::delivery("Unknown mail service: carrier-pigeon"));
    }

    #[tokio::test]
    async fn test_send_connection_refused() {
        let transport = TransportConfig::Smtp(SmtpTransport {
            host: "127.0.0.1".to_string(),
            port: 1,
            secure: false,
            user: String::new(),
            pass: String::new(),
        });

        let err = SmtpMailer::new()
            .send(&transport, &envelope())
            .await
            .unwrap_err();
        assert!(!err.is_validation());
    }

    #[tokio::test]
    async fn test_send_over_smtp() {
        let (port, server) = spawn_smtp_server(false).await;
        let mut envelope = envelope();
        envelope.attachments = vec![Attachment {
            filename: "notes.txt".to_string(),
            content: Bytes::from_static(b"hello"),
            content_type: "text/plain".to_string(),
        }];

        SmtpMailer::new()
            .send(&local_smtp(port, "relay@example.com"), &envelope)
            .await
            .unwrap();

        let transcript = server.await.unwrap();
        assert_eq!(count(&transcript, "AUTH PLAIN"), 1);
        assert_eq!(count(&transcript, "MAIL FROM:<relay@example.com>"), 1);
        assert_eq!(count(&transcript, "RCPT TO:<a@b.com>"), 1);
        assert_eq!(count(&transcript, "RCPT TO:<c@d.com>"), 1);
        assert_eq!(count(&transcript, "RCPT TO:"), 2);
        assert_eq!(count(&transcript, "DATA"), 1);
        assert!(transcript.iter().any(|l| l == "To: a@b.com, c@d.com"));
        assert!(transcript
            .iter()
            .any(|l| l.starts_with("Content-Type: multipart/mixed")));
        assert!(transcript.iter().any(|l| l.contains("filename=\"notes.txt\"")));
    }

    #[tokio::test]
    async fn test_send_without_credentials_skips_auth() {
        let (port, server) = spawn_smtp_server(false).await;

        SmtpMailer::new()
            .send(&local_smtp(port, ""), &envelope())
            .await
            .unwrap();

        let transcript = server.await.unwrap();
        assert_eq!(count(&transcript, "AUTH"), 0);
        assert_eq!(count(&transcript, "DATA"), 1);
    }

    #[tokio::test]
    async fn test_send_rejected_recipient() {
        let (port, server) = spawn_smtp_server(true).await;

        let err = SmtpMailer::new()
            .send(&local_smtp(port, "relay@example.com"), &envelope())
            .await
            .unwrap_err();
        assert!(!err.is_validation());

        let transcript = server.await.unwrap();
        assert_eq!(count(&transcript, "DATA"), 0);
        assert_eq!(count(&transcript, "MAIL FROM:"), 1);
    }
}
