/*
[INPUT]:  HTTP configuration (base URL, timeouts, proxy)
[OUTPUT]: Configured reqwest client and the generic request executor
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use crate::http::{BinanceChainError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Public testnet REST host
pub const TESTNET_BASE_URL: &str = "https://testnet-dex.binance.org";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Outbound proxy for every request, e.g. `http://127.0.0.1:8080`
    pub proxy: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: TESTNET_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            proxy: None,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }
}

/// Raw request body with its content type
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Text(String),
}

/// Stateless client for the DEX REST API.
///
/// Every call is an independent attempt: no retries, no caching.
#[derive(Debug, Clone)]
pub struct BinanceChainClient {
    http_client: Client,
    base_url: Url,
}

impl BinanceChainClient {
    /// Create a new client against the public testnet
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout);

        if let Some(proxy_url) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|err| BinanceChainError::Config(format!("invalid proxy URL: {err}")))?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            http_client: builder.build()?,
            base_url: Url::parse(&config.base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Execute a request and decode the JSON response.
    ///
    /// A non-2xx status becomes [`BinanceChainError::Api`] carrying the raw body.
    pub async fn request<Q, T>(
        &self,
        method: Method,
        path: &str,
        query: Option<&Q>,
        body: Option<RequestBody>,
    ) -> Result<T>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut builder = self.request_builder(method, path)?;
        if let Some(query) = query {
            builder = builder.query(query);
        }
        builder = match body {
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Text(text)) => builder.header(CONTENT_TYPE, "text/plain").body(text),
            None => builder,
        };
        self.send_json(builder).await
    }

    pub(crate) fn request_builder(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(path)?;
        Ok(self.http_client.request(method, url))
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().clone();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%url, status = status.as_u16(), "request returned non-success status");
            return Err(BinanceChainError::api_error(status, body));
        }

        let bytes = response.bytes().await?;
        debug!(%url, bytes = bytes.len(), "request succeeded");
        Ok(serde_json::from_slice(&bytes)?)
    }
}
