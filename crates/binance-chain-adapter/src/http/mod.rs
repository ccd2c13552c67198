/*
[INPUT]:  HTTP client configuration and API endpoints
[OUTPUT]: HTTP responses and typed API results
[POS]:    HTTP layer - REST API communication
[UPDATE]: When adding new endpoints or changing client behavior
*/

pub mod account;
pub mod client;
pub mod error;
pub mod public;

pub use error::{BinanceChainError, Result};

pub use client::{BinanceChainClient, ClientConfig, RequestBody, TESTNET_BASE_URL};
