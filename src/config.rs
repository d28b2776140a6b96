//! Configuration module for mailrelay.

use serde::Deserialize;
use std::path::Path;

use crate::{RelayError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Default SMTP transport settings.
///
/// Form submissions may override host, port, secure, user and pass per request.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    /// SMTP server hostname.
    #[serde(default = "default_smtp_host")]
    pub host: String,
    /// SMTP server port.
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// Use implicit TLS instead of STARTTLS.
    #[serde(default)]
    pub secure: bool,
    /// Account user. Also the address mail is sent from.
    #[serde(default)]
    pub user: String,
    /// Account password.
    #[serde(default)]
    pub pass: String,
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            secure: false,
            user: String::new(),
            pass: String::new(),
        }
    }
}

/// OAuth2 (XOAUTH2) settings.
///
/// OAuth2 is used when `client_id`, `client_secret` and `refresh_token` are all set.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    /// Well-known mail service name.
    #[serde(default = "default_oauth_service")]
    pub service: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Pre-issued access token, used instead of a refresh round trip.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Token endpoint used to exchange the refresh token.
    #[serde(default = "default_token_url")]
    pub token_url: String,
}

fn default_oauth_service() -> String {
    "gmail".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            service: default_oauth_service(),
            client_id: String::new(),
            client_secret: String::new(),
            refresh_token: String::new(),
            access_token: None,
            expires_in: None,
            token_url: default_token_url(),
        }
    }
}

impl OAuthConfig {
    /// Whether all three credentials needed for OAuth2 are present.
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty() && !self.refresh_token.is_empty()
    }
}

/// Upload limits enforced at the HTTP boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Maximum number of attachments per submission.
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// Maximum size of a single attachment in megabytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_mb: u64,
}

fn default_max_files() -> usize {
    5
}

fn default_max_file_size() -> u64 {
    10
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_file_size_mb: default_max_file_size(),
        }
    }
}

impl UploadConfig {
    /// Maximum size of a single attachment in bytes.
    pub fn max_file_size_bytes(&self) -> usize {
        (self.max_file_size_mb * 1024 * 1024) as usize
    }

    /// Request body limit large enough for a full set of attachments plus form fields.
    pub fn body_limit_bytes(&self) -> usize {
        self.max_file_size_bytes() * self.max_files + 1024 * 1024
    }
}

/// Web configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Whether to serve static files (the contact form).
    #[serde(default = "default_serve_static")]
    pub serve_static: bool,
    /// Path to static files directory.
    #[serde(default = "default_static_path")]
    pub static_path: String,
    /// Whether to mount the Swagger UI and OpenAPI document.
    #[serde(default = "default_docs_enabled")]
    pub docs_enabled: bool,
    /// CORS allowed origins for the documentation endpoints.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Send Strict-Transport-Security.
    #[serde(default = "default_hsts")]
    pub hsts: bool,
}

fn default_serve_static() -> bool {
    true
}

fn default_static_path() -> String {
    "public".to_string()
}

fn default_docs_enabled() -> bool {
    true
}

fn default_hsts() -> bool {
    true
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            serve_static: default_serve_static(),
            static_path: default_static_path(),
            docs_enabled: default_docs_enabled(),
            cors_origins: vec![],
            hsts: default_hsts(),
        }
    }
}

/// HTTPS settings.
///
/// When both paths are set the application is served over TLS on `port` and
/// the plain HTTP listener only redirects to it.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    /// PEM certificate chain.
    #[serde(default)]
    pub cert_path: String,
    /// PEM private key.
    #[serde(default)]
    pub key_path: String,
    /// HTTPS port.
    #[serde(default = "default_https_port")]
    pub port: u16,
}

fn default_https_port() -> u16 {
    443
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: String::new(),
            key_path: String::new(),
            port: default_https_port(),
        }
    }
}

impl TlsConfig {
    /// Whether HTTPS is configured.
    pub fn is_enabled(&self) -> bool {
        !self.cert_path.is_empty() && !self.key_path.is_empty()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/mailrelay.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Process-wide mail settings handed to the mail handler.
#[derive(Debug, Clone, Default)]
pub struct MailSettings {
    pub smtp: SmtpConfig,
    pub oauth: OAuthConfig,
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Default SMTP settings.
    #[serde(default)]
    pub smtp: SmtpConfig,
    /// OAuth2 settings.
    #[serde(default)]
    pub oauth: OAuthConfig,
    /// Upload limits.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Web configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// HTTPS configuration.
    #[serde(default)]
    pub tls: TlsConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(RelayError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    ///
    /// A `.env` file in the working directory is loaded first, if present.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        dotenvy::dotenv().ok();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| RelayError::Validation(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `PORT`
    /// - `SMTP_HOST`, `SMTP_PORT`, `SMTP_SECURE`, `SMTP_USER`, `SMTP_PASS`
    /// - `OAUTH_CLIENT_ID`, `OAUTH_CLIENT_SECRET`, `OAUTH_REFRESH_TOKEN`,
    ///   `OAUTH_ACCESS_TOKEN`, `OAUTH_EXPIRES_IN`
    /// - `SSL_CERT_PATH`, `SSL_KEY_PATH`, `HTTPS_PORT`
    ///
    /// Empty values are ignored.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(port) = get("PORT") {
            self.server.port = parse_number("PORT", &port)?;
        }
        if let Some(host) = get("SMTP_HOST") {
            self.smtp.host = host;
        }
        if let Some(port) = get("SMTP_PORT") {
            self.smtp.port = parse_number("SMTP_PORT", &port)?;
        }
        if let Some(secure) = get("SMTP_SECURE") {
            self.smtp.secure = secure == "true";
        }
        if let Some(user) = get("SMTP_USER") {
            self.smtp.user = user;
        }
        if let Some(pass) = get("SMTP_PASS") {
            self.smtp.pass = pass;
        }
        if let Some(client_id) = get("OAUTH_CLIENT_ID") {
            self.oauth.client_id = client_id;
        }
        if let Some(client_secret) = get("OAUTH_CLIENT_SECRET") {
            self.oauth.client_secret = client_secret;
        }
        if let Some(refresh_token) = get("OAUTH_REFRESH_TOKEN") {
            self.oauth.refresh_token = refresh_token;
        }
        if let Some(access_token) = get("OAUTH_ACCESS_TOKEN") {
            self.oauth.access_token = Some(access_token);
        }
        if let Some(expires_in) = get("OAUTH_EXPIRES_IN") {
            self.oauth.expires_in = Some(parse_number("OAUTH_EXPIRES_IN", &expires_in)?);
        }
        if let Some(cert_path) = get("SSL_CERT_PATH") {
            self.tls.cert_path = cert_path;
        }
        if let Some(key_path) = get("SSL_KEY_PATH") {
            self.tls.key_path = key_path;
        }
        if let Some(port) = get("HTTPS_PORT") {
            self.tls.port = parse_number("HTTPS_PORT", &port)?;
        }

        Ok(())
    }

    /// Validate the configuration.
    ///
    /// Returns an error if the upload limits would reject every attachment, or
    /// if only one of the TLS certificate and key is set.
    pub fn validate(&self) -> Result<()> {
        if self.tls.cert_path.is_empty() != self.tls.key_path.is_empty() {
            return Err(RelayError::Validation(
                "tls.cert_path and tls.key_path must be set together".to_string(),
            ));
        }
        if self.upload.max_files == 0 {
            return Err(RelayError::Validation(
                "upload.max_files must be at least 1".to_string(),
            ));
        }
        if self.upload.max_file_size_mb == 0 {
            return Err(RelayError::Validation(
                "upload.max_file_size_mb must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Mail settings for the request handler.
    pub fn mail_settings(&self) -> MailSettings {
        MailSettings {
            smtp: self.smtp.clone(),
            oauth: self.oauth.clone(),
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RelayError::Config(format!("{key} must be a number, got {value:?}")))
}
