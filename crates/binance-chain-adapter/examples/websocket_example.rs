/*
[INPUT]:  Stream endpoint and optional address/proxy from the environment
[OUTPUT]: Real-time kline, ticker and account updates printed to stdout
[POS]:    Examples - streaming session usage
[UPDATE]: When the stream session API changes
*/

use binance_chain_adapter::*;
use tokio::time::{Duration, sleep};

/// Example: streaming session with replayed subscriptions
///
/// Optional environment:
/// - `BNC_WS_URL`: stream endpoint (default testnet)
/// - `BNC_PROXY`: HTTP proxy used for the CONNECT tunnel
/// - `BNC_ADDRESS`: account address for the `orders` topic
/// - `BNC_SYMBOL`: market for the ticker topic (default `NNB-0AD_BNB`)
#[tokio::main]
async fn main() -> std::result::Result<(), StreamError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut config = StreamConfig::default();
    if let Ok(url) = std::env::var("BNC_WS_URL") {
        config = config.with_endpoint(url);
    }
    if let Ok(proxy) = std::env::var("BNC_PROXY") {
        config = config.with_proxy(proxy);
    }
    let symbol = std::env::var("BNC_SYMBOL").unwrap_or_else(|_| "NNB-0AD_BNB".to_string());

    let session = StreamSession::builder(config)
        .on_connected(|handle: StreamHandle| async move {
            println!("connected, {} topics live", handle.topics().len());
        })
        .start()?;

    session
        .subscribe(
            &KlineInterval::OneMinute.topic(),
            callback(|data| async move {
                println!("kline: {data}");
            }),
        )
        .await?;

    let ticker = Subscription::new(callback(|data| async move {
        println!("ticker: {data}");
    }))
    .with_symbols([symbol]);
    session.subscribe_with(topic::TICKER, ticker).await?;

    if let Ok(address) = std::env::var("BNC_ADDRESS") {
        let orders = Subscription::new(callback(|data| async move {
            println!("orders: {data}");
        }))
        .with_address(address);
        session.subscribe_with(topic::ORDERS, orders).await?;
    }

    sleep(Duration::from_secs(30)).await;

    session.unsubscribe(topic::TICKER).await?;
    println!("state before shutdown: {:?}", session.state());
    session.shutdown().await;
    Ok(())
}
