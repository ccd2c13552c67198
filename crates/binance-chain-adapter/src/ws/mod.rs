/*
[INPUT]:  Stream configuration and topic subscriptions
[OUTPUT]: Order, account, trade, depth and kline updates routed to callbacks
[POS]:    WebSocket layer - real-time data streams
[UPDATE]: When adding new stream components or changing connection logic
*/

pub mod config;
pub mod error;
pub mod message;
pub mod registry;
pub mod session;
pub mod transport;
pub mod tunnel;

pub use config::{ReconnectPolicy, StreamConfig, TESTNET_STREAM_URL};
pub use error::StreamError;
pub use message::{Command, Inbound, InboundMessage, Method, SymbolsEncoding, topic};
pub use registry::{Callback, Subscription, SubscriptionRegistry, callback};
pub use session::{
    ConnectedHook, ConnectionState, StreamHandle, StreamSession, StreamSessionBuilder,
};
pub use transport::{Connector, Frame, Transport, WsConnector, WsTransport};
