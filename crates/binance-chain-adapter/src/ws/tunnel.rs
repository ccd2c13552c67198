/*
[INPUT]:  HTTP proxy URL and target stream endpoint
[OUTPUT]: TCP stream tunnelled to the target via HTTP CONNECT
[POS]:    WebSocket layer - proxy support for the transport
[UPDATE]: When supporting new proxy schemes
*/

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;
use url::Url;

use super::error::{Result, StreamError};

const MAX_RESPONSE_HEAD: usize = 8 * 1024;

/// Open a CONNECT tunnel through `proxy` to the host and port of `target`.
pub async fn open(proxy: &Url, target: &Url) -> Result<TcpStream> {
    if proxy.scheme() != "http" {
        return Err(StreamError::Config(format!(
            "unsupported proxy scheme {:?}, only http is supported",
            proxy.scheme()
        )));
    }

    let proxy_host = socket_host(proxy)?;
    let proxy_port = proxy.port_or_known_default().unwrap_or(80);
    let authority = authority(target)?;

    let mut stream = TcpStream::connect((proxy_host, proxy_port))
        .await
        .map_err(|err| StreamError::Connection(format!("proxy connect failed: {err}")))?;

    let request = connect_request(proxy, &authority)?;
    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|err| StreamError::Connection(format!("proxy write failed: {err}")))?;

    let head = read_response_head(&mut stream).await?;
    let status = parse_status(&head)?;
    if !(200..300).contains(&status) {
        return Err(StreamError::Connection(format!(
            "proxy refused tunnel to {authority} with status {status}"
        )));
    }

    debug!(%authority, status, "proxy tunnel established");
    Ok(stream)
}

fn socket_host(url: &Url) -> Result<&str> {
    let host = url
        .host_str()
        .ok_or_else(|| StreamError::Config(format!("url {url} has no host")))?;
    Ok(host.trim_start_matches('[').trim_end_matches(']'))
}

fn authority(target: &Url) -> Result<String> {
    let host = target
        .host_str()
        .ok_or_else(|| StreamError::Config(format!("url {target} has no host")))?;
    let port = target
        .port_or_known_default()
        .ok_or_else(|| StreamError::Config(format!("url {target} has no port")))?;
    Ok(format!("{host}:{port}"))
}

fn connect_request(proxy: &Url, authority: &str) -> Result<String> {
    let mut request = format!("CONNECT {authority} HTTP/1.1\r\nHost: {authority}\r\n");
    if !proxy.username().is_empty() {
        let username = decode_credential(proxy.username())?;
        let password = decode_credential(proxy.password().unwrap_or(""))?;
        request.push_str(&format!(
            "Proxy-Authorization: Basic {}\r\n",
            BASE64.encode(format!("{username}:{password}"))
        ));
    }
    request.push_str("\r\n");
    Ok(request)
}

/// Url keeps userinfo percent-encoded; the proxy expects the raw text.
fn decode_credential(value: &str) -> Result<String> {
    urlencoding::decode(value)
        .map(|decoded| decoded.into_owned())
        .map_err(|err| StreamError::Config(format!("proxy credentials are not UTF-8: {err}")))
}

async fn read_response_head(stream: &mut TcpStream) -> Result<String> {
    let mut head = Vec::with_capacity(256);
    let mut byte = [0u8; 1];

    // Byte-at-a-time so nothing past the head is consumed from the tunnel.
    while !head.ends_with(b"\r\n\r\n") {
        if head.len() >= MAX_RESPONSE_HEAD {
            return Err(StreamError::Connection(
                "proxy response head too large".to_string(),
            ));
        }
        let read = stream
            .read(&mut byte)
            .await
            .map_err(|err| StreamError::Connection(format!("proxy read failed: {err}")))?;
        if read == 0 {
            return Err(StreamError::Connection(
                "proxy closed connection during CONNECT".to_string(),
            ));
        }
        head.push(byte[0]);
    }

    Ok(String::from_utf8_lossy(&head).into_owned())
}

fn parse_status(head: &str) -> Result<u16> {
    head.lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| StreamError::Connection("malformed proxy response".to_string()))
}
