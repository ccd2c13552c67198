/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for binance-chain-adapter tests

#![allow(dead_code)]

use std::time::Duration;

use binance_chain_adapter::ws::ReconnectPolicy;
use binance_chain_adapter::{BinanceChainClient, ClientConfig, StreamConfig};
use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use wiremock::MockServer;

pub const WAIT: Duration = Duration::from_secs(5);
pub const TEST_ADDRESS: &str = "tbnb1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5lzv7xu";

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

pub fn client_for(server: &MockServer) -> BinanceChainClient {
    BinanceChainClient::with_config(ClientConfig::default().with_base_url(server.uri()))
        .expect("client init")
}

/// Stream config with fast reconnects against a local endpoint
pub fn fast_stream_config(endpoint: &str) -> StreamConfig {
    StreamConfig::default()
        .with_endpoint(endpoint)
        .with_reconnect(ReconnectPolicy {
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(50),
            stable_after: Duration::from_secs(10),
        })
}

/// One accepted websocket connection on the test server
pub struct ServerConn {
    pub path: String,
    pub ws: WebSocketStream<TcpStream>,
}

impl ServerConn {
    /// Next text frame as JSON, skipping control frames.
    pub async fn next_json(&mut self) -> serde_json::Value {
        loop {
            let message = tokio::time::timeout(WAIT, self.ws.next())
                .await
                .expect("frame within timeout")
                .expect("connection open")
                .expect("valid frame");
            if let Message::Text(text) = message {
                return serde_json::from_str(text.as_str()).expect("JSON frame");
            }
        }
    }
}

/// Local websocket server handing every accepted connection to the test.
pub async fn spawn_ws_server() -> (String, mpsc::UnboundedReceiver<ServerConn>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (conn_tx, conn_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let (path_tx, path_rx) = std::sync::mpsc::channel();
            let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                let _ = path_tx.send(request.uri().path().to_string());
                Ok(response)
            };
            let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
                continue;
            };
            let path = path_rx.recv().unwrap_or_default();
            if conn_tx.send(ServerConn { path, ws }).is_err() {
                break;
            }
        }
    });

    (format!("ws://{addr}"), conn_rx)
}

/// Minimal HTTP CONNECT proxy; returns its URL and a counter channel of tunnels.
pub async fn spawn_connect_proxy() -> (String, mpsc::UnboundedReceiver<String>) {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (tunnel_tx, tunnel_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut client, _)) = listener.accept().await {
            let tunnel_tx = tunnel_tx.clone();
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut byte = [0u8; 1];
                while !head.ends_with(b"\r\n\r\n") {
                    match client.read(&mut byte).await {
                        Ok(1) => head.push(byte[0]),
                        _ => return,
                    }
                }
                let head = String::from_utf8_lossy(&head).into_owned();
                let Some(authority) = head.split_whitespace().nth(1).map(str::to_string) else {
                    return;
                };
                let Ok(mut upstream) = TcpStream::connect(&authority).await else {
                    let _ = client.write_all(b"HTTP/1.1 502 Bad Gateway\r\n\r\n").await;
                    return;
                };
                if client
                    .write_all(b"HTTP/1.1 200 Connection established\r\n\r\n")
                    .await
                    .is_err()
                {
                    return;
                }
                let _ = tunnel_tx.send(authority);
                let _ = tokio::io::copy_bidirectional(&mut client, &mut upstream).await;
            });
        }
    });

    (format!("http://{addr}"), tunnel_rx)
}
