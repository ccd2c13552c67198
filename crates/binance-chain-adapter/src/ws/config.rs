/*
[INPUT]:  Endpoint override, proxy, timeouts and reconnect backoff
[OUTPUT]: Validated stream URLs and backoff delays for the session
[POS]:    WebSocket layer - stream session configuration
[UPDATE]: When adding tunables to the stream session
*/

use std::time::Duration;

use url::Url;

use super::error::{Result, StreamError};
use super::message::SymbolsEncoding;

/// Public testnet stream host; the session connects to `{endpoint}/api`.
pub const TESTNET_STREAM_URL: &str = "wss://testnet-dex.binance.org";

const STREAM_PATH: &str = "/api";

/// Exponential backoff applied between reconnect attempts.
///
/// The attempt counter only resets once a connection has stayed up for
/// `stable_after`; a server that accepts and immediately drops keeps
/// backing off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub stable_after: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            stable_after: Duration::from_secs(10),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (1-based), doubling up to `max_backoff`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(1u32 << exp)
            .min(self.max_backoff)
    }

    /// Retry counter to use after a connection that stayed up for `uptime`.
    pub fn attempt_after_disconnect(&self, retry_count: u32, uptime: Duration) -> u32 {
        if uptime >= self.stable_after {
            1
        } else {
            retry_count.saturating_add(1)
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub endpoint: String,
    /// HTTP proxy used to tunnel the stream connection
    pub proxy: Option<String>,
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
    pub symbols_encoding: SymbolsEncoding,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            endpoint: TESTNET_STREAM_URL.to_string(),
            proxy: None,
            connect_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
            symbols_encoding: SymbolsEncoding::default(),
        }
    }
}

impl StreamConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_symbols_encoding(mut self, encoding: SymbolsEncoding) -> Self {
        self.symbols_encoding = encoding;
        self
    }

    /// Full stream URL, `{endpoint}/api`.
    pub fn stream_url(&self) -> Result<Url> {
        let base = Url::parse(&self.endpoint)
            .map_err(|err| StreamError::Config(format!("invalid endpoint: {err}")))?;
        match base.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(StreamError::Config(format!(
                    "endpoint scheme must be ws or wss, got {other}"
                )));
            }
        }
        base.join(STREAM_PATH)
            .map_err(|err| StreamError::Config(format!("invalid endpoint: {err}")))
    }

    /// Parsed proxy URL. Only `http` proxies can tunnel the stream.
    pub fn proxy_url(&self) -> Result<Option<Url>> {
        let Some(proxy) = self.proxy.as_deref() else {
            return Ok(None);
        };
        let url =
            Url::parse(proxy).map_err(|err| StreamError::Config(format!("invalid proxy: {err}")))?;
        if url.scheme() != "http" {
            return Err(StreamError::Config(format!(
                "unsupported proxy scheme {:?}, only http is supported",
                url.scheme()
            )));
        }
        Ok(Some(url))
    }
}
