//! HTTPS serving and the plain HTTP redirect.

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header::HOST, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    Router,
};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tokio_rustls::rustls::{self, pki_types::CertificateDer, ServerConfig};
use tokio_rustls::TlsAcceptor;

use crate::config::TlsConfig;
use crate::{RelayError, Result};

/// Port browsers assume for `https://` URLs.
const DEFAULT_HTTPS_PORT: u16 = 443;

/// Build a TLS acceptor from the configured PEM certificate chain and key.
pub fn load_acceptor(config: &TlsConfig) -> Result<TlsAcceptor> {
    let certs = load_certs(&config.cert_path)?;
    let key = {
        let mut reader = BufReader::new(open(&config.key_path)?);
        rustls_pemfile::private_key(&mut reader)
            .map_err(|e| RelayError::Config(format!("failed to read {}: {e}", config.key_path)))?
            .ok_or_else(|| {
                RelayError::Config(format!("no private key found in {}", config.key_path))
            })?
    };

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut server_config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| RelayError::Config(format!("TLS setup failed: {e}")))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| RelayError::Config(format!("invalid certificate or key: {e}")))?;
    server_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(server_config)))
}

fn open(path: &str) -> Result<File> {
    File::open(path).map_err(|e| RelayError::Config(format!("failed to open {path}: {e}")))
}

fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = BufReader::new(open(path)?);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| RelayError::Config(format!("failed to read {path}: {e}")))?;

    if certs.is_empty() {
        return Err(RelayError::Config(format!("no certificates found in {path}")));
    }
    Ok(certs)
}

/// Accept TLS connections and serve the router on each of them.
pub async fn serve_tls(listener: TcpListener, acceptor: TlsAcceptor, router: Router) -> Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!("Failed to accept connection: {}", e);
                continue;
            }
        };

        let acceptor = acceptor.clone();
        let service = TowerToHyperService::new(router.clone());

        tokio::spawn(async move {
            let stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::debug!(%peer, "TLS handshake failed: {}", e);
                    return;
                }
            };

            if let Err(e) = Builder::new(TokioExecutor::new())
                .serve_connection_with_upgrades(TokioIo::new(stream), service)
                .await
            {
                tracing::debug!(%peer, "HTTPS connection closed with error: {}", e);
            }
        });
    }
}

/// Router for the plain HTTP listener: every request is sent to HTTPS.
pub fn redirect_router(https_port: u16) -> Router {
    Router::new()
        .fallback(redirect_to_https)
        .with_state(https_port)
}

async fn redirect_to_https(
    State(https_port): State<u16>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let Some(host) = headers.get(HOST).and_then(|v| v.to_str().ok()) else {
        return (StatusCode::BAD_REQUEST, "Missing Host header").into_response();
    };

    Redirect::permanent(&https_location(host, &uri, https_port)).into_response()
}

/// The `https://` URL for a request that arrived over plain HTTP.
///
/// The port of the `Host` header belongs to the HTTP listener and is replaced
/// with the HTTPS port, which is omitted when it is 443.
pub fn https_location(host: &str, uri: &Uri, https_port: u16) -> String {
    let hostname = match host.strip_prefix('[') {
        // IPv6 literal, keep the brackets.
        Some(rest) => match rest.find(']') {
            Some(end) => &host[..end + 2],
            None => host,
        },
        None => host.split(':').next().unwrap_or(host),
    };

    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");

    if https_port == DEFAULT_HTTPS_PORT {
        format!("https://{hostname}{path}")
    } else {
        format!("https://{hostname}:{https_port}{path}")
    }
}
