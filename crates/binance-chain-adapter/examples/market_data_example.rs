/*
[INPUT]:  DEX REST base URL (testnet by default)
[OUTPUT]: Server time, depth snapshot and recent klines
[POS]:    Examples - public REST endpoints
[UPDATE]: When public endpoints change
*/

use binance_chain_adapter::*;

/// Example: query public market data
///
/// Optional environment:
/// - `BNC_REST_URL`: override the REST base URL
/// - `BNC_SYMBOL`: market to inspect (default `NNB-0AD_BNB`)
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut config = ClientConfig::default();
    if let Ok(url) = std::env::var("BNC_REST_URL") {
        config = config.with_base_url(url);
    }
    let symbol = std::env::var("BNC_SYMBOL").unwrap_or_else(|_| "NNB-0AD_BNB".to_string());

    let client = BinanceChainClient::with_config(config)?;
    println!("Using {}", client.base_url());

    let time = client.get_time().await?;
    println!("Block time: {} (ap {})", time.block_time, time.ap_time);

    let book = client.depth(&symbol, 5).await?;
    println!("\nDepth for {symbol} at height {}:", book.height);
    for level in &book.asks {
        println!("  ask {} x {}", level.0, level.1);
    }
    for level in &book.bids {
        println!("  bid {} x {}", level.0, level.1);
    }

    let query = KlinesQuery {
        limit: Some(5),
        ..KlinesQuery::new(&symbol, KlineInterval::OneHour)
    };
    let klines = client.klines(&query).await?;
    println!("\nLast {} hourly klines:", klines.len());
    for kline in klines {
        println!(
            "  {} o={} h={} l={} c={} trades={}",
            kline.open_time(),
            kline.open(),
            kline.high(),
            kline.low(),
            kline.close(),
            kline.trade_count()
        );
    }

    Ok(())
}
