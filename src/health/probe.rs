//! Reachability probes.
//!
//! # Responsibilities
//! - Resolve a configured address into a closed set of checks
//! - Run one attempt of a check with a timeout
//! - Normalize every failure (refusal, unreachable, timeout, bad status)
//!   into `false`; probe errors never reach the caller
//!
//! # Design Decisions
//! - No retries here; repetition belongs to the address evaluator
//! - TLS and HTTPS probes skip certificate validation
//! - HTTP probes succeed only on status 200

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time;
use tokio_rustls::TlsConnector;
use url::Url;

use crate::config::schema::Address;
use crate::health::tls;

const USER_AGENT: &str = "cloud-ha-health-check";

/// A resolved reachability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    /// TCP connect to `host:port`.
    TcpPing { host: String, port: u16 },
    /// TLS handshake with `host:port`.
    SslPing { host: String, port: u16 },
    /// HTTP GET expecting status 200.
    HttpPing { url: String },
}

/// Why an address cannot be probed. Such addresses cast no vote.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsupportedCheck {
    #[error("no test specified")]
    MissingTest,

    #[error("unsupported test '{0}'")]
    UnknownTest(String),

    #[error("{test} needs both ip and port")]
    MissingEndpoint { test: String },

    #[error("http_ping needs a url")]
    MissingUrl,
}

impl Check {
    /// Resolve the check configured on `address`.
    pub fn from_address(address: &Address) -> Result<Self, UnsupportedCheck> {
        let test = address
            .test
            .as_deref()
            .ok_or(UnsupportedCheck::MissingTest)?;

        match test {
            "tcp_ping" | "ssl_ping" => {
                let (Some(host), Some(port)) = (address.ip.clone(), address.port) else {
                    return Err(UnsupportedCheck::MissingEndpoint {
                        test: test.to_string(),
                    });
                };
                if test == "tcp_ping" {
                    Ok(Check::TcpPing { host, port })
                } else {
                    Ok(Check::SslPing { host, port })
                }
            }
            "http_ping" => address
                .url
                .clone()
                .map(|url| Check::HttpPing { url })
                .ok_or(UnsupportedCheck::MissingUrl),
            other => Err(UnsupportedCheck::UnknownTest(other.to_string())),
        }
    }

    /// Configured test name, used as a log and metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Check::TcpPing { .. } => "tcp_ping",
            Check::SslPing { .. } => "ssl_ping",
            Check::HttpPing { .. } => "http_ping",
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::TcpPing { host, port } | Check::SslPing { host, port } => {
                write!(f, "{} {}:{}", self.kind(), host, port)
            }
            Check::HttpPing { url } => write!(f, "http_ping {}", url),
        }
    }
}

/// Executes a single probe attempt.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Returns true iff the target answered within `timeout`.
    async fn probe(&self, check: &Check, timeout: Duration) -> bool;
}

/// Errors building the network prober.
#[derive(Debug, Error)]
pub enum ProbeSetupError {
    #[error("TLS setup failed: {0}")]
    Tls(#[from] rustls::Error),

    #[error("HTTP client setup failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Prober that talks to the network.
#[derive(Clone)]
pub struct NetworkProber {
    http: reqwest::Client,
    tls: TlsConnector,
}

impl NetworkProber {
    pub fn new() -> Result<Self, ProbeSetupError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .no_proxy()
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            tls: tls::probe_connector()?,
        })
    }

    async fn tcp_ping(&self, host: &str, port: u16, timeout: Duration) -> bool {
        match time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                tracing::debug!(host, port, error = %e, "tcp_ping unable to connect");
                false
            }
            Err(_) => {
                tracing::debug!(host, port, "tcp_ping timed out");
                false
            }
        }
    }

    async fn ssl_ping(&self, host: &str, port: u16, timeout: Duration) -> bool {
        match time::timeout(timeout, self.handshake(host, port)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::debug!(host, port, error = %e, "ssl_ping handshake failed");
                false
            }
            Err(_) => {
                tracing::debug!(host, port, "ssl_ping timed out");
                false
            }
        }
    }

    async fn handshake(&self, host: &str, port: u16) -> std::io::Result<()> {
        let name = tls::server_name(host).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid server name '{}'", host),
            )
        })?;
        let stream = TcpStream::connect((host, port)).await?;
        self.tls.connect(name, stream).await?;
        Ok(())
    }

    async fn http_ping(&self, url: &str, timeout: Duration) -> bool {
        let url = match Url::parse(url) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(url, error = %e, "http_ping given an invalid url");
                return false;
            }
        };

        match self.http.get(url.clone()).timeout(timeout).send().await {
            Ok(response) if response.status() == reqwest::StatusCode::OK => true,
            Ok(response) => {
                tracing::debug!(url = %url, status = %response.status(), "http_ping received non-200 response");
                false
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "http_ping unable to connect");
                false
            }
        }
    }
}

impl fmt::Debug for NetworkProber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkProber").finish_non_exhaustive()
    }
}

#[async_trait]
impl Prober for NetworkProber {
    async fn probe(&self, check: &Check, timeout: Duration) -> bool {
        match check {
            Check::TcpPing { host, port } => self.tcp_ping(host, *port, timeout).await,
            Check::SslPing { host, port } => self.ssl_ping(host, *port, timeout).await,
            Check::HttpPing { url } => self.http_ping(url, timeout).await,
        }
    }
}
