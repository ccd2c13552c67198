/*
[INPUT]:  subscribe/unsubscribe calls from callers, lookups from the router
[OUTPUT]: Topic -> subscription mapping, replayed on every reconnect
[POS]:    WebSocket layer - durable subscription state (survives disconnects)
[UPDATE]: When subscription parameters or callback shape change
*/

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use serde_json::Value;

use super::message::{Command, SymbolsEncoding};

/// Asynchronous handler receiving the `data` part of each routed message.
pub type Callback = Arc<dyn Fn(Value) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wrap an async closure as a [`Callback`].
pub fn callback<F, Fut>(f: F) -> Callback
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |data: Value| -> BoxFuture<'static, ()> { Box::pin(f(data)) })
}

/// Last-known subscribe parameters for one topic.
#[derive(Clone)]
pub struct Subscription {
    pub address: Option<String>,
    pub symbols: Option<Vec<String>>,
    pub callback: Callback,
}

impl Subscription {
    pub fn new(callback: Callback) -> Self {
        Self {
            address: None,
            symbols: None,
            callback,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols = Some(symbols.into_iter().map(Into::into).collect());
        self
    }

    /// Subscribe command for this entry.
    pub fn command(&self, topic: &str, encoding: SymbolsEncoding) -> Command {
        Command::subscribe(
            topic,
            self.address.as_deref(),
            self.symbols.as_deref(),
            encoding,
        )
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("address", &self.address)
            .field("symbols", &self.symbols)
            .finish_non_exhaustive()
    }
}

/// Concurrent topic -> subscription map. One entry per topic; later puts win.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: DashMap<String, Subscription>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `topic`, returning the replaced one.
    pub fn put(&self, topic: impl Into<String>, subscription: Subscription) -> Option<Subscription> {
        self.entries.insert(topic.into(), subscription)
    }

    /// Remove the entry for `topic`. Absent topics are a no-op.
    pub fn remove(&self, topic: &str) -> Option<Subscription> {
        self.entries.remove(topic).map(|(_, subscription)| subscription)
    }

    pub fn get(&self, topic: &str) -> Option<Subscription> {
        self.entries.get(topic).map(|entry| entry.value().clone())
    }

    pub fn callback(&self, topic: &str) -> Option<Callback> {
        self.entries.get(topic).map(|entry| entry.callback.clone())
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.entries.contains_key(topic)
    }

    /// Snapshot of every entry. Order is not significant.
    pub fn all(&self) -> Vec<(String, Subscription)> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn topics(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
