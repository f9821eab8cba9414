//! TCP connectivity probe
//!
//! A single bounded-timeout TCP connect to a well-known host:port. The
//! connection is closed as soon as it is established. Any failure (timeout,
//! refusal, name resolution of the probe host) reports "unreachable".

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

use crate::config::GeneralSettings;
use crate::traits::ConnectivityProbe;

/// Default timeout for one probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Connectivity probe based on a TCP handshake
#[derive(Debug, Clone)]
pub struct TcpProbe {
    target: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: &str, port: &str, timeout: Duration) -> Self {
        Self {
            target: join_host_port(host, port),
            timeout,
        }
    }

    /// Build a probe from the general settings with the default timeout
    pub fn from_settings(settings: &GeneralSettings) -> Self {
        Self::new(
            &settings.connectivity_check_ip,
            &settings.connectivity_check_port,
            DEFAULT_PROBE_TIMEOUT,
        )
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

#[async_trait]
impl ConnectivityProbe for TcpProbe {
    async fn is_reachable(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(self.target.as_str())).await {
            Ok(Ok(stream)) => {
                drop(stream);
                true
            }
            Ok(Err(e)) => {
                debug!("Connectivity probe to {} failed: {}", self.target, e);
                false
            }
            Err(_) => {
                debug!(
                    "Connectivity probe to {} timed out after {:?}",
                    self.target, self.timeout
                );
                false
            }
        }
    }
}

/// Join host and port, bracketing IPv6 literals
fn join_host_port(host: &str, port: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}
