// Shared transport configuration for building reqwest::Client instances.
//
// The vMix client keeps one pooled client for the process lifetime so
// keep-alive connections are reused across commands.

use std::time::Duration;

use crate::error::Error;

const USER_AGENT: &str = concat!("lyrisync/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound for a whole request, connect included.
    pub timeout: Duration,
    /// Upper bound for the TCP connect phase alone.
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

impl TransportConfig {
    /// Transport with a single overall timeout; connect is bounded by the same value.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            connect_timeout: timeout,
        }
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout.min(self.timeout))
            .user_agent(USER_AGENT)
            .build()
            .map_err(Error::Transport)
    }
}
