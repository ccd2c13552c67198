/*
[INPUT]:  Owner addresses, order ids and paging filters
[OUTPUT]: Account, order, trade and transaction history data
[POS]:    HTTP layer - address-scoped endpoints
[UPDATE]: When adding new account endpoints or changing query parameters
*/

use crate::http::{BinanceChainClient, Result};
use crate::types::{
    AccountSequence, ClosedOrdersQuery, OpenOrdersQuery, TradesQuery, TransactionsQuery,
};
use reqwest::Method;
use serde_json::Value;

impl BinanceChainClient {
    /// GET /api/v1/account/{address}
    pub async fn account(&self, address: &str) -> Result<Value> {
        let endpoint = format!("/api/v1/account/{}", address);
        self.get(&endpoint).await
    }

    /// GET /api/v1/account/{address}/sequence
    pub async fn account_sequence(&self, address: &str) -> Result<AccountSequence> {
        let endpoint = format!("/api/v1/account/{}/sequence", address);
        self.get(&endpoint).await
    }

    /// Get open orders for an address.
    ///
    /// GET /api/v1/orders/open?address={address}&offset={offset}&limit={limit}&total={total}
    pub async fn orders_open(&self, query: &OpenOrdersQuery) -> Result<Value> {
        self.request(Method::GET, "/api/v1/orders/open", Some(query), None)
            .await
    }

    /// Get closed orders for an address.
    ///
    /// GET /api/v1/orders/closed?address={address}&offset={offset}&limit={limit}&total={total}
    pub async fn orders_closed(&self, query: &ClosedOrdersQuery) -> Result<Value> {
        self.request(Method::GET, "/api/v1/orders/closed", Some(query), None)
            .await
    }

    /// GET /api/v1/orders/{order_id}
    pub async fn order(&self, order_id: &str) -> Result<Value> {
        let endpoint = format!("/api/v1/orders/{}", order_id);
        self.get(&endpoint).await
    }

    /// Get market trades, optionally filtered by owner address.
    ///
    /// GET /api/v1/trades
    pub async fn trades(&self, query: &TradesQuery) -> Result<Value> {
        self.request(Method::GET, "/api/v1/trades", Some(query), None)
            .await
    }

    /// Transactions for an address. Multisend transactions are not listed.
    ///
    /// GET /api/v1/transactions?address={address}
    pub async fn transactions(&self, query: &TransactionsQuery) -> Result<Value> {
        self.request(Method::GET, "/api/v1/transactions", Some(query), None)
            .await
    }
}
