//! Web server for mailrelay.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tower_http::compression::CompressionLayer;

use crate::config::Config;
use crate::mail::{MailRequestHandler, Mailer};
use crate::{RelayError, Result};

use super::handlers::AppState;
use super::router::create_router;
use super::tls::{load_acceptor, redirect_router, serve_tls};

/// HTTPS listener settings.
struct HttpsListener {
    addr: SocketAddr,
    acceptor: TlsAcceptor,
}

/// Addresses the server actually bound.
#[derive(Debug, Clone, Copy)]
pub struct BoundAddrs {
    /// Plain HTTP listener. Redirects to HTTPS when TLS is configured.
    pub http: SocketAddr,
    /// HTTPS listener, when TLS is configured.
    pub https: Option<SocketAddr>,
}

/// Web server for the form relay.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Fully assembled router.
    router: Router,
    https: Option<HttpsListener>,
}

impl WebServer {
    /// Create a new web server with the given delivery collaborator.
    pub fn new(config: &Config, mailer: Arc<dyn Mailer>) -> Result<Self> {
        let addr = socket_addr(&config.server.host, config.server.port)?;

        let https = if config.tls.is_enabled() {
            Some(HttpsListener {
                addr: socket_addr(&config.server.host, config.tls.port)?,
                acceptor: load_acceptor(&config.tls)?,
            })
        } else {
            None
        };

        let handler = MailRequestHandler::new(config.mail_settings(), mailer);
        let app_state = Arc::new(AppState::new(handler, config.upload.clone()));

        let router = create_router(app_state, &config.web).layer(CompressionLayer::new());

        Ok(Self {
            addr,
            router,
            https,
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Whether the application is served over HTTPS.
    pub fn is_tls(&self) -> bool {
        self.https.is_some()
    }

    /// Run the web server until it fails.
    ///
    /// With TLS configured the application is served on the HTTPS port and the
    /// HTTP port only redirects.
    pub async fn run(self) -> Result<()> {
        let http_listener = TcpListener::bind(self.addr).await?;

        let Some(https) = self.https else {
            tracing::info!("Web server listening on http://{}", http_listener.local_addr()?);
            axum::serve(http_listener, self.router).await?;
            return Ok(());
        };

        let https_listener = TcpListener::bind(https.addr).await?;
        let https_port = https_listener.local_addr()?.port();
        tracing::info!("Web server listening on https://{}", https_listener.local_addr()?);
        tracing::info!(
            "Redirecting http://{} to HTTPS",
            http_listener.local_addr()?
        );

        tokio::try_join!(
            async {
                axum::serve(http_listener, redirect_router(https_port))
                    .await
                    .map_err(RelayError::from)
            },
            serve_tls(https_listener, https.acceptor, self.router),
        )?;
        Ok(())
    }

    /// Run the server in the background and return the actual bound address.
    ///
    /// This is the address serving the application: the HTTPS listener when
    /// TLS is configured. Useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let addrs = self.run_with_addrs().await?;
        Ok(addrs.https.unwrap_or(addrs.http))
    }

    /// Run the server in the background and return every bound address.
    pub async fn run_with_addrs(self) -> Result<BoundAddrs> {
        let http_listener = TcpListener::bind(self.addr).await?;
        let http = http_listener.local_addr()?;

        let Some(https) = self.https else {
            tracing::info!("Web server listening on http://{}", http);
            tokio::spawn(async move {
                if let Err(e) = axum::serve(http_listener, self.router).await {
                    tracing::error!("Web server error: {}", e);
                }
            });
            return Ok(BoundAddrs { http, https: None });
        };

        let https_listener = TcpListener::bind(https.addr).await?;
        let https_addr = https_listener.local_addr()?;
        tracing::info!("Web server listening on https://{}", https_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(http_listener, redirect_router(https_addr.port())).await {
                tracing::error!("Redirect server error: {}", e);
            }
        });
        tokio::spawn(async move {
            if let Err(e) = serve_tls(https_listener, https.acceptor, self.router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(BoundAddrs {
            http,
            https: Some(https_addr),
        })
    }
}

fn socket_addr(host: &str, port: u16) -> Result<SocketAddr> {
    format!("{host}:{port}")
        .parse()
        .map_err(|e| RelayError::Config(format!("invalid server address: {e}")))
}
