//! Stream client settings.

use std::time::Duration;

use osdlyrics_core::{validate_endpoint, StreamConfig};
use url::Url;

use crate::error::{Result, StreamError};

/// Source name used in logs
pub const PROVIDER_NAME: &str = "sse";

/// Default connect timeout. There is no read timeout: the stream is long-lived.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default wait between connection attempts
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Resolved settings for [`SseLyricClient`](crate::SseLyricClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSettings {
    pub endpoint: Url,
    pub connect_timeout: Duration,
    pub reconnect_delay: Duration,
}

impl StreamSettings {
    /// Settings for `endpoint` with default timings.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidEndpoint`] if `endpoint` is not an
    /// absolute http(s) URL.
    pub fn new(endpoint: &str) -> Result<Self> {
        Ok(Self {
            endpoint: parse_endpoint(endpoint)?,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        })
    }

    /// Resolve the `[stream]` config section. An empty URL means the default
    /// endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidEndpoint`] for a bad URL.
    pub fn from_config(config: &StreamConfig) -> Result<Self> {
        Ok(Self {
            endpoint: parse_endpoint(config.endpoint())?,
            connect_timeout: non_zero_or(config.connect_timeout(), DEFAULT_CONNECT_TIMEOUT),
            reconnect_delay: non_zero_or(config.reconnect_delay(), DEFAULT_RECONNECT_DELAY),
        })
    }

    #[must_use]
    pub const fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url> {
    validate_endpoint(endpoint).map_err(|e| StreamError::InvalidEndpoint {
        url: endpoint.to_string(),
        reason: e.to_string(),
    })
}

fn non_zero_or(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
