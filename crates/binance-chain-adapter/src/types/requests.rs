/*
[INPUT]:  Endpoint query parameters
[OUTPUT]: Serializable query structs; unset options never reach the query string
[POS]:    Data layer - request parameter definitions
[UPDATE]: When endpoint parameters change
*/

use serde::{Deserialize, Serialize};

use super::enums::{KlineInterval, OrderStatus, Side, TxSide, TxType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthQuery {
    pub symbol: String,
    /// Allowed limits: 5, 10, 20, 50, 100, 500, 1000.
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KlinesQuery {
    pub symbol: String,
    pub interval: KlineInterval,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(rename = "startTime")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(rename = "endTime")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
}

impl KlinesQuery {
    pub const DEFAULT_LIMIT: u32 = 300;

    pub fn new(symbol: impl Into<String>, interval: KlineInterval) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            limit: Some(Self::DEFAULT_LIMIT),
            start_time: None,
            end_time: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrdersQuery {
    pub address: String,
    pub offset: u32,
    pub limit: u32,
    pub total: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl OpenOrdersQuery {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            offset: 0,
            limit: 500,
            total: 0,
            symbol: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedOrdersQuery {
    pub address: String,
    pub offset: u32,
    pub limit: u32,
    pub total: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
}

impl ClosedOrdersQuery {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            offset: 0,
            limit: 500,
            total: 0,
            symbol: None,
            side: None,
            status: None,
            start: None,
            end: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradesQuery {
    pub offset: u32,
    pub limit: u32,
    pub total: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(rename = "buyerOrderId")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_order_id: Option<String>,
    #[serde(rename = "sellerOrderId")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(rename = "quoteAsset")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_asset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
}

impl Default for TradesQuery {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 500,
            total: 0,
            address: None,
            symbol: None,
            buyer_order_id: None,
            seller_order_id: None,
            side: None,
            height: None,
            quote_asset: None,
            start: None,
            end: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionsQuery {
    pub address: String,
    #[serde(rename = "blockHeight")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<TxSide>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(rename = "startTime")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(rename = "endTime")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(rename = "txAsset")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_asset: Option<String>,
    #[serde(rename = "txType")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_type: Option<TxType>,
}

impl TransactionsQuery {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            block_height: None,
            side: None,
            offset: None,
            limit: None,
            start_time: None,
            end_time: None,
            tx_asset: None,
            tx_type: None,
        }
    }
}
