//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use cloud_ha::config::loader::{parse_config, ConfigFormat};
use cloud_ha::config::Configuration;
use cloud_ha::health::AvailabilityEngine;
use cloud_ha::routing::InMemoryRouteBackend;
use cloud_ha::FailoverController;

/// Start a listener that accepts and immediately closes connections.
pub async fn start_tcp_responder() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a mock HTTP backend that answers every request with `status`.
#[allow(dead_code)]
pub async fn start_http_backend(status: u16) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;

                let status_text = match status {
                    200 => "200 OK",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    503 => "503 Service Unavailable",
                    _ => "200 OK",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
                    status_text
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// A local address with nothing listening on it.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

/// JSON for a device named `name` with one `tcp_ping` address.
pub fn tcp_device(name: &str, addr: SocketAddr) -> String {
    format!(
        r#"{{"{}": {{"addresses": [{{"test": "tcp_ping", "ip": "{}", "port": {}}}]}}}}"#,
        name,
        addr.ip(),
        addr.port()
    )
}

/// Parse a JSON configuration document, panicking on error.
pub fn config_from_json(json: &str) -> Configuration {
    parse_config(json, ConfigFormat::Json).unwrap()
}

/// Controller with real network probes over `backend`.
#[allow(dead_code)]
pub fn controller(config: &Configuration, backend: &InMemoryRouteBackend) -> FailoverController {
    let engine = AvailabilityEngine::with_network_prober(config.probe.clone()).unwrap();
    FailoverController::new(engine, Arc::new(backend.clone()))
}

/// Prober double: hosts (or urls) in the list fail, everything else passes.
#[allow(dead_code)]
pub struct ScriptedProber {
    failing: std::collections::HashSet<String>,
    calls: std::sync::atomic::AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedProber {
    pub fn failing(targets: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            failing: targets.iter().map(|t| t.to_string()).collect(),
            calls: std::sync::atomic::AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl cloud_ha::health::Prober for ScriptedProber {
    async fn probe(&self, check: &cloud_ha::health::Check, _timeout: Duration) -> bool {
        use cloud_ha::health::Check;

        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let target = match check {
            Check::TcpPing { host, .. } | Check::SslPing { host, .. } => host,
            Check::HttpPing { url } => url,
        };
        !self.failing.contains(target)
    }
}

/// Start an HTTPS backend with a freshly generated self-signed certificate
/// for `localhost`. Every request gets `200 OK`.
#[allow(dead_code)]
pub async fn start_tls_backend() -> SocketAddr {
    let key_pair = rcgen::KeyPair::generate().unwrap();
    let cert = rcgen::CertificateParams::new(vec!["localhost".to_string()])
        .unwrap()
        .self_signed(&key_pair)
        .unwrap();

    let server_cert = rustls::pki_types::CertificateDer::from(cert.der().to_vec());
    let server_key = rustls::pki_types::PrivateKeyDer::try_from(key_pair.serialize_der()).unwrap();
    let server_config = rustls::ServerConfig::builder_with_provider(
        rustls::crypto::ring::default_provider().into(),
    )
    .with_safe_default_protocol_versions()
    .unwrap()
    .with_no_client_auth()
    .with_single_cert(vec![server_cert], server_key)
    .unwrap();
    let acceptor = tokio_rustls::TlsAcceptor::from(Arc::new(server_config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                let Ok(mut stream) = acceptor.accept(socket).await else {
                    return;
                };
                let mut buf = [0u8; 1024];
                if let Ok(n) = stream.read(&mut buf).await {
                    if n > 0 {
                        let response = "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok";
                        let _ = stream.write_all(response.as_bytes()).await;
                    }
                }
                let _ = stream.shutdown().await;
            });
        }
    });

    addr
}
