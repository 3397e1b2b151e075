//! SNMP transport adapter
//!
//! One GET per call, bounded by a timeout, never retried here (the snapshot
//! reader owns retry policy). The production transport shells out to the
//! net-snmp `snmpget` tool and uses the system `ping` for reachability.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

/// Where and how to reach one device's agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// `host` or `host:port`
    pub address: String,
    /// SNMP v2c community string
    pub community: String,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, community: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            community: community.into(),
        }
    }

    /// Host part of the address, without an SNMP port suffix.
    pub fn host(&self) -> &str {
        match self.address.rsplit_once(':') {
            // a single colon is host:port, more than one is an IPv6 literal
            Some((host, port)) if !host.contains(':') && port.parse::<u16>().is_ok() => host,
            _ => &self.address,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Request for {oid} timed out after {after:?}")]
    Timeout { oid: String, after: Duration },
    #[error("Device unreachable: {0}")]
    Unreachable(String),
}

/// Single-register request/response against a device
#[async_trait]
pub trait SnmpTransport: Send + Sync {
    /// Read one OID and return the raw value string.
    async fn get(&self, endpoint: &Endpoint, oid: &str) -> Result<String, TransportError>;

    /// Network-level reachability check.
    async fn reachable(&self, endpoint: &Endpoint) -> bool;
}

/// net-snmp `snmpget` backed transport
#[derive(Debug, Clone)]
pub struct SnmpGet {
    snmpget: String,
    ping: String,
    timeout: Duration,
}

impl SnmpGet {
    pub fn new(timeout: Duration) -> Self {
        Self::with_programs("snmpget", "ping", timeout)
    }

    pub fn with_programs(snmpget: impl Into<String>, ping: impl Into<String>, timeout: Duration) -> Self {
        Self {
            snmpget: snmpget.into(),
            ping: ping.into(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn timeout_secs(&self) -> String {
        self.timeout.as_secs().max(1).to_string()
    }
}

#[async_trait]
impl SnmpTransport for SnmpGet {
    async fn get(&self, endpoint: &Endpoint, oid: &str) -> Result<String, TransportError> {
        debug!(address = %endpoint.address, oid, "snmpget");

        // -Oqvte: bare value, numeric enums and raw timeticks; -r 0: no net-snmp retries
        let secs = self.timeout_secs();
        let request = AsyncCommand::new(&self.snmpget)
            .args(["-v2c", "-c", endpoint.community.as_str(), "-Oqvte", "-t", secs.as_str(), "-r", "0"])
            .arg(&endpoint.address)
            .arg(oid)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        // snmpget enforces its own -t; the outer bound only catches a hung process
        let deadline = self.timeout + Duration::from_secs(1);
        let output = match tokio::time::timeout(deadline, request).await {
            Err(_) => {
                return Err(TransportError::Timeout {
                    oid: oid.to_string(),
                    after: self.timeout,
                })
            }
            Ok(Err(e)) => {
                return Err(TransportError::Unreachable(format!(
                    "failed to run {}: {}",
                    self.snmpget, e
                )))
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.starts_with("Timeout") {
                return Err(TransportError::Timeout {
                    oid: oid.to_string(),
                    after: self.timeout,
                });
            }
            return Err(TransportError::Unreachable(if stderr.is_empty() {
                format!("{} exited with {}", self.snmpget, output.status)
            } else {
                stderr
            }));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(TransportError::Unreachable(format!("empty response for {oid}")));
        }
        Ok(stdout)
    }

    async fn reachable(&self, endpoint: &Endpoint) -> bool {
        let secs = self.timeout_secs();
        let probe = AsyncCommand::new(&self.ping)
            .args(["-c", "1", "-W", secs.as_str()])
            .arg(endpoint.host())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(self.timeout + Duration::from_secs(1), probe).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                debug!(host = endpoint.host(), error = %e, "ping failed to start");
                false
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_host() {
        assert_eq!(Endpoint::new("10.0.0.5", "public").host(), "10.0.0.5");
        assert_eq!(Endpoint::new("10.0.0.5:1161", "public").host(), "10.0.0.5");
        assert_eq!(Endpoint::new("fe80::1", "public").host(), "fe80::1");
    }

    #[tokio::test]
    async fn test_get_returns_trimmed_stdout() {
        // echo stands in for snmpget and prints its own arguments
        let transport = SnmpGet::with_programs("echo", "true", Duration::from_secs(2));
        let endpoint = Endpoint::new("10.0.0.5", "secret");
        let raw = transport.get(&endpoint, "1.3.6.1.2.1.1.1.0").await.unwrap();

        assert!(raw.starts_with("-v2c -c secret -Oqvte -t 2 -r 0 10.0.0.5"));
        assert!(raw.ends_with("1.3.6.1.2.1.1.1.0"));
    }

    #[tokio::test]
    async fn test_failed_request_is_unreachable() {
        let transport = SnmpGet::with_programs("false", "false", Duration::from_secs(1));
        let endpoint = Endpoint::new("10.0.0.5", "public");
        let err = transport.get(&endpoint, "1.3.6.1.2.1.1.1.0").await.unwrap_err();
        assert!(matches!(err, TransportError::Unreachable(_)));
        assert!(!transport.reachable(&endpoint).await);
    }

    #[tokio::test]
    async fn test_missing_program_is_unreachable() {
        let transport = SnmpGet::with_programs(
            "/nonexistent/snmpget",
            "/nonexistent/ping",
            Duration::from_secs(1),
        );
        let endpoint = Endpoint::new("10.0.0.5", "public");
        assert!(matches!(
            transport.get(&endpoint, "1.3.6.1.2.1.1.1.0").await,
            Err(TransportError::Unreachable(_))
        ));
        assert!(!transport.reachable(&endpoint).await);
    }

    #[tokio::test]
    async fn test_reachable_follows_ping_status() {
        let transport = SnmpGet::with_programs("echo", "true", Duration::from_secs(1));
        assert!(transport.reachable(&Endpoint::new("127.0.0.1", "public")).await);
    }
}
