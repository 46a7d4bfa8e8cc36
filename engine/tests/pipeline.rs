//! End-to-end pipeline tests against a mock market data feed

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use parking_lot::Mutex;

use qk_engine::{
    AnalysisResult, AnalyzeError, EngineConfig, EngineState, FeedError, FeedResult,
    MarketDataFeed, QuantEngine,
};
use qk_risk::{OrderSide, VolatilityTier};
use qk_signals::Candle;

/// In-memory feed with per-symbol canned series and optional failures
struct MockFeed {
    series: Mutex<HashMap<String, Vec<Candle>>>,
    prices: Mutex<HashMap<String, f64>>,
}

impl MockFeed {
    fn new() -> Self {
        Self {
            series: Mutex::new(HashMap::new()),
            prices: Mutex::new(HashMap::new()),
        }
    }

    fn set_series(&self, symbol: &str, candles: Vec<Candle>) {
        let price = candles.last().map(|c| c.close).unwrap_or(0.0);
        self.series.lock().insert(symbol.to_string(), candles);
        self.prices.lock().insert(symbol.to_string(), price);
    }
}

#[async_trait]
impl MarketDataFeed for MockFeed {
    async fn backfill(
        &self,
        symbol: &str,
        _interval: &str,
        _limit: usize,
    ) -> FeedResult<Vec<Candle>> {
        self.series
            .lock()
            .get(symbol)
            .cloned()
            .ok_or_else(|| FeedError::BadStatus {
                endpoint: "/klines".to_string(),
                status: 400,
            })
    }

    async fn latest_price(&self, symbol: &str) -> FeedResult<f64> {
        self.prices
            .lock()
            .get(symbol)
            .copied()
            .ok_or_else(|| FeedError::BadStatus {
                endpoint: "/ticker/24hr".to_string(),
                status: 400,
            })
    }
}

fn candle(i: usize, close: f64, volume: f64) -> Candle {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    Candle {
        time: base + ChronoDuration::hours(i as i64),
        open: close,
        high: close + 0.5,
        low: close - 0.5,
        close,
        volume,
    }
}

/// Flat tape: every candle closes at 100 with no range
fn flat_series(n: usize) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let mut c = candle(i, 100.0, 10.0);
            c.high = 100.0;
            c.low = 100.0;
            c
        })
        .collect()
}

/// Sawtooth uptrend (+2, -1 alternating) with a volume spike on the
/// final up-candle
fn uptrend_series(n: usize) -> Vec<Candle> {
    let mut close = 100.0;
    (0..n)
        .map(|i| {
            if i > 0 {
                close += if i % 2 == 1 { 2.0 } else { -1.0 };
            }
            let volume = if i == n - 1 { 20.0 } else { 10.0 };
            candle(i, close, volume)
        })
        .collect()
}

fn config(symbols: &[&str]) -> EngineConfig {
    EngineConfig {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        interval: "1h".to_string(),
        history_limit: 500,
        refresh_secs: 1,
    }
}

async fn started_engine(symbols: &[&str], feed: Arc<MockFeed>) -> QuantEngine {
    let engine = QuantEngine::new(config(symbols), feed);
    engine.start().await.unwrap();
    engine
}

#[tokio::test]
async fn test_flat_market_is_neutral_low_volatility() {
    let feed = Arc::new(MockFeed::new());
    feed.set_series("BTCUSDT", flat_series(500));

    let engine = started_engine(&["BTCUSDT"], Arc::clone(&feed)).await;
    let result = engine.analyze("BTCUSDT").await.unwrap();
    engine.stop().await.unwrap();

    assert_eq!(result.symbol, "BTCUSDT");
    assert!(!result.signal.class.is_buy_family());
    assert!(!result.signal.class.is_sell_family());
    assert_eq!(result.risk.volatility, VolatilityTier::Low);
    assert_eq!(result.market.price, 100.0);
    assert_eq!(result.market.change_24h, 0.0);
}

#[tokio::test]
async fn test_uptrend_yields_buy_side_plan() {
    let feed = Arc::new(MockFeed::new());
    feed.set_series("BTCUSDT", uptrend_series(500));

    let engine = started_engine(&["BTCUSDT"], Arc::clone(&feed)).await;
    let result = engine.analyze("BTCUSDT").await.unwrap();
    engine.stop().await.unwrap();

    assert!(result.signal.class.is_buy_family(), "signal: {:?}", result.signal);
    assert!(!result.entries.is_empty());
    assert!(result.entries.len() <= 3);
    assert!(result.entries.iter().all(|e| e.side == OrderSide::Buy));
    for pair in result.entries.windows(2) {
        assert!((pair[0].win_rate, pair[0].strength) >= (pair[1].win_rate, pair[1].strength));
    }
    assert!(result.recommendation.starts_with("Consider LONG"));
}

#[tokio::test]
async fn test_broadcast_reaches_subscriber() {
    let feed = Arc::new(MockFeed::new());
    feed.set_series("BTCUSDT", flat_series(500));

    let engine = started_engine(&["BTCUSDT"], Arc::clone(&feed)).await;
    let mut sub = engine.subscribe();

    let result = tokio::time::timeout(Duration::from_secs(5), sub.receiver.recv())
        .await
        .expect("no broadcast within 5s")
        .expect("channel closed");
    assert_eq!(result.symbol, "BTCUSDT");

    engine.stop().await.unwrap();
    assert_eq!(engine.state(), EngineState::Stopped);
}

#[tokio::test]
async fn test_one_failing_symbol_does_not_block_others() {
    let feed = Arc::new(MockFeed::new());
    // ETHUSDT has no series, so its backfill and price lookups fail.
    feed.set_series("BTCUSDT", flat_series(500));

    let engine = started_engine(&["ETHUSDT", "BTCUSDT"], Arc::clone(&feed)).await;
    let mut sub = engine.subscribe();

    let result = tokio::time::timeout(Duration::from_secs(5), sub.receiver.recv())
        .await
        .expect("no broadcast within 5s")
        .expect("channel closed");
    assert_eq!(result.symbol, "BTCUSDT");

    let err = engine.analyze("ETHUSDT").await.unwrap_err();
    assert!(matches!(err, AnalyzeError::Feed { .. }));

    engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_latest_cache_updates() {
    let feed = Arc::new(MockFeed::new());
    feed.set_series("BTCUSDT", flat_series(500));

    let engine = started_engine(&["BTCUSDT"], Arc::clone(&feed)).await;
    let mut sub = engine.subscribe();

    tokio::time::timeout(Duration::from_secs(5), sub.receiver.recv())
        .await
        .expect("no broadcast within 5s")
        .expect("channel closed");

    let cached = engine.latest("BTCUSDT").expect("latest result cached");
    assert_eq!(cached.symbol, "BTCUSDT");
    assert!(engine.latest("ETHUSDT").is_none());

    engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_insufficient_history_is_rejected() {
    let feed = Arc::new(MockFeed::new());
    feed.set_series("BTCUSDT", flat_series(30));

    let engine = started_engine(&["BTCUSDT"], Arc::clone(&feed)).await;
    let err = engine.analyze("BTCUSDT").await.unwrap_err();
    engine.stop().await.unwrap();

    assert!(matches!(
        err,
        AnalyzeError::InsufficientData { have: 30, need: 50, .. }
    ));
}

#[tokio::test]
async fn test_result_serde_round_trip() {
    let feed = Arc::new(MockFeed::new());
    feed.set_series("BTCUSDT", uptrend_series(500));

    let engine = started_engine(&["BTCUSDT"], Arc::clone(&feed)).await;
    let result = engine.analyze("BTCUSDT").await.unwrap();
    engine.stop().await.unwrap();

    let json = serde_json::to_string(&result).unwrap();
    let parsed: AnalysisResult = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, result);
}

#[tokio::test]
async fn test_double_start_is_rejected() {
    let feed = Arc::new(MockFeed::new());
    feed.set_series("BTCUSDT", flat_series(500));

    let engine = started_engine(&["BTCUSDT"], Arc::clone(&feed)).await;
    assert!(engine.start().await.is_err());
    engine.stop().await.unwrap();

    // A stopped engine can be started again.
    engine.start().await.unwrap();
    engine.stop().await.unwrap();
}
