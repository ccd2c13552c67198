/*
[INPUT]:  Subscribe parameters and raw inbound text frames
[OUTPUT]: Outbound command JSON and decoded inbound messages
[POS]:    WebSocket layer - wire codec (no per-topic payload schemas)
[UPDATE]: When the command shape or inbound envelope changes
*/

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::StreamError;

/// Stream topics published by the DEX node.
pub mod topic {
    pub const ORDERS: &str = "orders";
    pub const ACCOUNTS: &str = "accounts";
    pub const TRANSFERS: &str = "transfers";
    pub const TRADES: &str = "trades";
    pub const MARKET_DIFF: &str = "marketDiff";
    pub const MARKET_DEPTH: &str = "marketDepth";
    pub const KLINE_1M: &str = "kline_1m";
    pub const KLINE_3M: &str = "kline_3m";
    pub const KLINE_5M: &str = "kline_5m";
    pub const KLINE_15M: &str = "kline_15m";
    pub const KLINE_30M: &str = "kline_30m";
    pub const KLINE_1H: &str = "kline_1h";
    pub const KLINE_2H: &str = "kline_2h";
    pub const KLINE_4H: &str = "kline_4h";
    pub const KLINE_6H: &str = "kline_6h";
    pub const KLINE_8H: &str = "kline_8h";
    pub const KLINE_12H: &str = "kline_12h";
    pub const KLINE_1D: &str = "kline_1d";
    pub const KLINE_3D: &str = "kline_3d";
    pub const KLINE_1W: &str = "kline_1w";
    pub const KLINE_1MON: &str = "kline_1M";
    pub const TICKER: &str = "ticker";
    pub const ALL_TICKERS: &str = "allTickers";
    pub const MINI_TICKER: &str = "miniTicker";
    pub const ALL_MINI_TICKERS: &str = "allMiniTickers";
    pub const BLOCK_HEIGHT: &str = "blockheight";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Subscribe,
    Unsubscribe,
}

/// How a subscription's symbol list is put on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SymbolsEncoding {
    /// Symbols travel in their own `symbols` array.
    #[default]
    Distinct,
    /// Older clients wrote the owner address again when symbols were given and
    /// never sent the symbols themselves. Only for nodes that expect that.
    AddressField,
}

/// Outbound control command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub method: Method,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<String>>,
}

impl Command {
    pub fn subscribe(
        topic: &str,
        address: Option<&str>,
        symbols: Option<&[String]>,
        encoding: SymbolsEncoding,
    ) -> Self {
        let mut command = Command {
            method: Method::Subscribe,
            topic: topic.to_string(),
            address: address.map(|address| Value::String(address.to_string())),
            symbols: None,
        };

        if let Some(symbols) = symbols.filter(|symbols| !symbols.is_empty()) {
            match encoding {
                SymbolsEncoding::Distinct => command.symbols = Some(symbols.to_vec()),
                SymbolsEncoding::AddressField => {
                    // An absent address is written as an explicit null.
                    command.address = Some(
                        address
                            .map(|address| Value::String(address.to_string()))
                            .unwrap_or(Value::Null),
                    );
                }
            }
        }

        command
    }

    pub fn unsubscribe(topic: &str) -> Self {
        Command {
            method: Method::Unsubscribe,
            topic: topic.to_string(),
            address: None,
            symbols: None,
        }
    }

    pub fn to_json(&self) -> String {
        // Serializing a struct of strings and values cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Decoded text frame. `Raw` keeps frames that were not valid JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Json(Value),
    Raw(String),
}

impl Inbound {
    /// Topic the server attributed the payload to.
    pub fn stream(&self) -> Option<&str> {
        match self {
            Inbound::Json(value) => value.get("stream").and_then(Value::as_str),
            Inbound::Raw(_) => None,
        }
    }

    /// Split into `(stream, data)` for routing. A missing `data` key yields `Null`.
    pub fn into_routed(self) -> Option<InboundMessage> {
        match self {
            Inbound::Json(Value::Object(mut map)) => {
                let stream = match map.remove("stream") {
                    Some(Value::String(stream)) => stream,
                    _ => return None,
                };
                let data = map.remove("data").unwrap_or(Value::Null);
                Some(InboundMessage { stream, data })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub stream: String,
    #[serde(default)]
    pub data: Value,
}

/// Parse a text frame, falling back to the raw string on malformed JSON.
pub fn decode(text: &str) -> (Inbound, Option<StreamError>) {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => (Inbound::Json(value), None),
        Err(err) => (
            Inbound::Raw(text.to_string()),
            Some(StreamError::Decode(err.to_string())),
        ),
    }
}
