/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust structs with serialization support
[POS]:    Data layer - typed responses for the endpoints whose shape is stable
[UPDATE]: When API schema changes or new types added
*/

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Block time as reported by the API node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockTime {
    pub ap_time: String,
    pub block_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSequence {
    pub sequence: i64,
}

/// Price level encoded as `[price, quantity]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthLevel(
    #[serde(with = "rust_decimal::serde::str")] pub Decimal,
    #[serde(with = "rust_decimal::serde::str")] pub Decimal,
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthBook {
    pub asks: Vec<DepthLevel>,
    pub bids: Vec<DepthLevel>,
    #[serde(default)]
    pub height: i64,
}

/// Candlestick bar encoded as a positional array:
/// `[open_time, open, high, low, close, volume, close_time, quote_volume, trades]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline(
    pub i64,
    #[serde(with = "rust_decimal::serde::str")] pub Decimal,
    #[serde(with = "rust_decimal::serde::str")] pub Decimal,
    #[serde(with = "rust_decimal::serde::str")] pub Decimal,
    #[serde(with = "rust_decimal::serde::str")] pub Decimal,
    #[serde(with = "rust_decimal::serde::str")] pub Decimal,
    pub i64,
    #[serde(with = "rust_decimal::serde::str")] pub Decimal,
    pub u64,
);

impl Kline {
    pub fn open_time(&self) -> i64 {
        self.0
    }

    pub fn open(&self) -> Decimal {
        self.1
    }

    pub fn high(&self) -> Decimal {
        self.2
    }

    pub fn low(&self) -> Decimal {
        self.3
    }

    pub fn close(&self) -> Decimal {
        self.4
    }

    pub fn volume(&self) -> Decimal {
        self.5
    }

    pub fn close_time(&self) -> i64 {
        self.6
    }

    pub fn quote_volume(&self) -> Decimal {
        self.7
    }

    pub fn trade_count(&self) -> u64 {
        self.8
    }
}
