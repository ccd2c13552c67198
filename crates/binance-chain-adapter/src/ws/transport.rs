/*
[INPUT]:  Stream endpoint URL and optional proxy
[OUTPUT]: A single duplex connection yielding Text/Binary/Closed/Error frames
[POS]:    WebSocket layer - transport (frames payloads, never interprets them)
[UPDATE]: When changing the socket library or frame mapping
*/

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, client_async_tls, connect_async};
use tracing::debug;
use url::Url;

use super::error::{Result, StreamError};
use super::tunnel;

/// One inbound event from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    /// The remote closed the connection or the stream ended.
    Closed,
    /// Terminal read failure.
    Error(String),
}

impl Frame {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Frame::Closed | Frame::Error(_))
    }
}

/// A live duplex connection. After a terminal frame it only yields `Closed`.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, text: String) -> Result<()>;

    /// Next inbound frame. Must be cancel-safe.
    async fn recv(&mut self) -> Frame;

    /// Release the connection. Idempotent.
    async fn close(&mut self);
}

/// Opens transports; the session calls it once per connect attempt.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &Url, proxy: Option<&Url>) -> Result<Box<dyn Transport>>;
}

/// tokio-tungstenite connector, tunnelling through an HTTP proxy when one is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, endpoint: &Url, proxy: Option<&Url>) -> Result<Box<dyn Transport>> {
        let stream = match proxy {
            None => {
                let (stream, _response) = connect_async(endpoint.as_str()).await?;
                stream
            }
            Some(proxy) => {
                let tcp = tunnel::open(proxy, endpoint).await?;
                let (stream, _response) = client_async_tls(endpoint.as_str(), tcp).await?;
                stream
            }
        };
        debug!(%endpoint, proxied = proxy.is_some(), "websocket handshake complete");
        Ok(Box::new(WsTransport::new(stream)))
    }
}

pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

impl WsTransport {
    pub fn new(stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        if self.closed {
            return Err(StreamError::Send("transport is closed".to_string()));
        }
        self.stream
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|err| StreamError::Send(err.to_string()))
    }

    async fn recv(&mut self) -> Frame {
        if self.closed {
            return Frame::Closed;
        }
        loop {
            match self.stream.next().await {
                Some(Ok(WsMessage::Text(text))) => return Frame::Text(text.to_string()),
                Some(Ok(WsMessage::Binary(bytes))) => return Frame::Binary(bytes.to_vec()),
                // tungstenite answers pings on the next read/flush.
                Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => {}
                Some(Ok(WsMessage::Frame(_))) => {}
                Some(Ok(WsMessage::Close(frame))) => {
                    debug!(?frame, "close frame received");
                    self.closed = true;
                    return Frame::Closed;
                }
                Some(Err(err)) => {
                    self.closed = true;
                    return Frame::Error(err.to_string());
                }
                None => {
                    self.closed = true;
                    return Frame::Closed;
                }
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(err) = self.stream.close(None).await {
            debug!(error = %err, "websocket close handshake failed");
        }
    }
}
