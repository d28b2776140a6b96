//! Transport selection.
//!
//! A request is delivered either through an OAuth2 (XOAUTH2) authenticated
//! mail service or through plain SMTP. The choice is made once per request by
//! [`resolve_transport`] and never cached.

use crate::config::MailSettings;

use super::SmtpOverrides;

/// Access token lifetime assumed when none is configured.
pub const DEFAULT_OAUTH_EXPIRES_IN: u64 = 3600;

/// OAuth2 authenticated transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuth2Transport {
    /// Well-known service name, e.g. `gmail`.
    pub service: String,
    /// Account user. Mail is sent from this address.
    pub user: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub access_token: Option<String>,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    /// Endpoint for exchanging the refresh token.
    pub token_url: String,
}

/// Plain SMTP transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpTransport {
    pub host: String,
    pub port: u16,
    /// Implicit TLS when set, opportunistic STARTTLS otherwise.
    pub secure: bool,
    pub user: String,
    pub pass: String,
}

/// Resolved transport configuration for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    OAuth2(OAuth2Transport),
    Smtp(SmtpTransport),
}

impl TransportConfig {
    /// The authenticated account the message is sent from.
    pub fn user(&self) -> &str {
        match self {
            TransportConfig::OAuth2(oauth) => &oauth.user,
            TransportConfig::Smtp(smtp) => &smtp.user,
        }
    }

    /// Short label for log records.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportConfig::OAuth2(_) => "oauth2",
            TransportConfig::Smtp(_) => "smtp",
        }
    }
}

/// Connection parameters of a well-known mail service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WellKnownService {
    pub host: &'static str,
    pub port: u16,
    pub secure: bool,
}

/// Look up a mail service by name (case-insensitive).
pub fn well_known_service(name: &str) -> Option<WellKnownService> {
    match name.to_ascii_lowercase().as_str() {
        "gmail" | "googlemail" => Some(WellKnownService {
            host: "smtp.gmail.com",
            port: 465,
            secure: true,
        }),
        "outlook" | "outlook365" | "hotmail" | "office365" => Some(WellKnownService {
            host: "smtp.office365.com",
            port: 587,
            secure: false,
        }),
        "yahoo" => Some(WellKnownService {
            host: "smtp.mail.yahoo.com",
            port: 465,
            secure: true,
        }),
        _ => None,
    }
}

/// Pick the transport for a request.
///
/// OAuth2 wins whenever it is fully configured, and request overrides are then
/// ignored. Otherwise each SMTP setting comes from the request when given and
/// from the configuration when not.
pub fn resolve_transport(overrides: &SmtpOverrides, settings: &MailSettings) -> TransportConfig {
    let oauth = &settings.oauth;
    if oauth.is_configured() {
        return TransportConfig::OAuth2(OAuth2Transport {
            service: oauth.service.clone(),
            user: settings.smtp.user.clone(),
            client_id: oauth.client_id.clone(),
            client_secret: oauth.client_secret.clone(),
            refresh_token: oauth.refresh_token.clone(),
            access_token: oauth.access_token.clone().filter(|t| !t.is_empty()),
            expires_in: oauth.expires_in.unwrap_or(DEFAULT_OAUTH_EXPIRES_IN),
            token_url: oauth.token_url.clone(),
        });
    }

    let smtp = &settings.smtp;
    let port = non_empty(&overrides.port)
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(smtp.port);
    // Any submitted value decides, even an empty one.
    let secure = match &overrides.secure {
        Some(value) => value == "true",
        None => smtp.secure,
    };

    TransportConfig::Smtp(SmtpTransport {
        host: non_empty(&overrides.host).unwrap_or(&smtp.host).to_string(),
        port,
        secure,
        user: non_empty(&overrides.user).unwrap_or(&smtp.user).to_string(),
        pass: non_empty(&overrides.pass).unwrap_or(&smtp.pass).to_string(),
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
