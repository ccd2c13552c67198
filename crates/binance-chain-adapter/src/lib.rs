/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public Binance Chain DEX adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod http;
pub mod types;
pub mod ws;

// Re-export commonly used types from http
pub use http::{BinanceChainClient, BinanceChainError, ClientConfig, RequestBody, Result};

// Re-export all types
pub use types::*;

// Re-export commonly used types from ws
pub use ws::{
    Callback,
    ConnectionState,
    StreamConfig,
    StreamError,
    StreamHandle,
    StreamSession,
    Subscription,
    SymbolsEncoding,
    callback,
    topic,
};
