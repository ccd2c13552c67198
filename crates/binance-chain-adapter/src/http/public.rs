/*
[INPUT]:  Symbols, limits and chain identifiers
[OUTPUT]: Chain info and market data (time, node, tokens, depth, klines, ticker)
[POS]:    HTTP layer - public endpoints (no owner address required)
[UPDATE]: When adding new public endpoints or changing response format
*/

use crate::http::{BinanceChainClient, RequestBody, Result};
use crate::types::{BlockTime, DepthBook, DepthQuery, Kline, KlinesQuery};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct SymbolFilter<'a> {
    symbol: &'a str,
}

#[derive(Serialize)]
struct BroadcastParams {
    sync: bool,
}

impl BinanceChainClient {
    pub(crate) async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request::<(), T>(Method::GET, path, None, None).await
    }

    /// Get the block time.
    ///
    /// GET /api/v1/time
    pub async fn get_time(&self) -> Result<BlockTime> {
        self.get("/api/v1/time").await
    }

    /// GET /api/v1/node-info
    pub async fn node_info(&self) -> Result<Value> {
        self.get("/api/v1/node-info").await
    }

    /// GET /api/v1/validators
    pub async fn validators(&self) -> Result<Value> {
        self.get("/api/v1/validators").await
    }

    /// GET /api/v1/peers
    pub async fn peers(&self) -> Result<Value> {
        self.get("/api/v1/peers").await
    }

    /// Get a transaction in JSON form.
    ///
    /// GET /api/v1/tx/{hash}?format=json
    pub async fn tx(&self, hash: &str) -> Result<Value> {
        let endpoint = format!("/api/v1/tx/{}", hash);
        self.request(Method::GET, &endpoint, Some(&[("format", "json")]), None)
            .await
    }

    /// GET /api/v1/tokens
    pub async fn tokens(&self) -> Result<Value> {
        self.get("/api/v1/tokens").await
    }

    /// GET /api/v1/markets
    pub async fn markets(&self) -> Result<Value> {
        self.get("/api/v1/markets").await
    }

    /// GET /api/v1/fees
    pub async fn fees(&self) -> Result<Value> {
        self.get("/api/v1/fees").await
    }

    /// Get the order book.
    ///
    /// GET /api/v1/depth?symbol={symbol}&limit={limit}
    pub async fn depth(&self, symbol: &str, limit: u32) -> Result<DepthBook> {
        let query = DepthQuery {
            symbol: symbol.to_string(),
            limit,
        };
        self.request(Method::GET, "/api/v1/depth", Some(&query), None)
            .await
    }

    /// Broadcast a signed, hex-encoded transaction.
    ///
    /// POST /api/v1/broadcast?sync={sync}
    pub async fn broadcast(&self, body: impl Into<String>, sync: bool) -> Result<Value> {
        let body = Some(RequestBody::Text(body.into()));
        if sync {
            let params = BroadcastParams { sync };
            self.request(Method::POST, "/api/v1/broadcast", Some(&params), body)
                .await
        } else {
            self.request::<(), _>(Method::POST, "/api/v1/broadcast", None, body)
                .await
        }
    }

    /// Get candlestick bars.
    ///
    /// GET /api/v1/klines?symbol={symbol}&interval={interval}&limit={limit}
    pub async fn klines(&self, query: &KlinesQuery) -> Result<Vec<Kline>> {
        self.request(Method::GET, "/api/v1/klines", Some(query), None)
            .await
    }

    /// 24 hour price change statistics, for one market or all of them.
    ///
    /// GET /api/v1/ticker/24hr?symbol={symbol}
    pub async fn ticker_24hr(&self, symbol: Option<&str>) -> Result<Value> {
        let filter = symbol.map(|symbol| SymbolFilter { symbol });
        self.request(Method::GET, "/api/v1/ticker/24hr", filter.as_ref(), None)
            .await
    }
}
