//! Outbound connectivity probe.
//!
//! A single short-timeout TCP connect to a well-known address. Any socket
//! error (timeout, refusal, resolution failure) means "offline". Callers
//! decide retry cadence; the probe itself never retries.

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

use crate::config::ConnectivityConfig;

/// Boundary trait for the connectivity check.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Whether outbound network reachability currently holds.
    async fn is_connected(&self) -> bool;
}

/// TCP-based probe against a configured well-known address.
pub struct TcpProbe {
    address: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(config: &ConnectivityConfig) -> Self {
        Self {
            address: config.address.clone(),
            timeout: config.timeout(),
        }
    }
}

#[async_trait]
impl ConnectivityProbe for TcpProbe {
    async fn is_connected(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("Connectivity probe to {} failed: {}", self.address, e);
                false
            }
            Err(_) => {
                debug!("Connectivity probe to {} timed out", self.address);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_probe_succeeds_against_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let probe = TcpProbe {
            address: addr.to_string(),
            timeout: Duration::from_secs(1),
        };
        assert!(probe.is_connected().await);
    }

    #[tokio::test]
    async fn test_probe_fails_against_closed_port() {
        // Bind then drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = TcpProbe {
            address: addr.to_string(),
            timeout: Duration::from_secs(1),
        };
        assert!(!probe.is_connected().await);
    }

    #[tokio::test]
    async fn test_probe_fails_on_unresolvable_host() {
        let probe = TcpProbe {
            address: "plume-test.invalid:53".to_string(),
            timeout: Duration::from_secs(1),
        };
        assert!(!probe.is_connected().await);
    }
}
