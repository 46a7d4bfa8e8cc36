//! Market data feed trait and the Binance REST implementation
//!
//! The [`MarketDataFeed`] trait abstracts how the engine obtains candle
//! history and live prices, so tests can run against a mock feed while
//! production talks to the Binance spot REST API.

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use qk_signals::Candle;

use crate::error::{FeedError, FeedResult};

/// Default Binance spot REST endpoint
pub const BINANCE_API_URL: &str = "https://api.binance.com/api/v3";

/// Source of candle history and live prices
#[async_trait]
pub trait MarketDataFeed: Send + Sync {
    /// Fetch the most recent `limit` candles for a symbol at the given
    /// interval, oldest first
    async fn backfill(&self, symbol: &str, interval: &str, limit: usize)
        -> FeedResult<Vec<Candle>>;

    /// Fetch the current traded price for a symbol
    async fn latest_price(&self, symbol: &str) -> FeedResult<f64>;
}

/// Binance spot REST feed
pub struct BinanceFeed {
    client: Client,
    base_url: String,
}

impl BinanceFeed {
    /// Create a feed against the public Binance endpoint
    pub fn new() -> FeedResult<Self> {
        Self::with_base_url(BINANCE_API_URL.to_string())
    }

    /// Create a feed against a custom endpoint, used for testnets
    pub fn with_base_url(base_url: String) -> FeedResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Parse one kline row from the exchange payload.
    ///
    /// Binance returns each candle as a mixed JSON array:
    /// `[open_time_ms, "open", "high", "low", "close", "volume", ...]`.
    fn parse_kline(row: &Value) -> FeedResult<Candle> {
        let fields = row
            .as_array()
            .ok_or_else(|| FeedError::MalformedPayload("kline row is not an array".to_string()))?;
        if fields.len() < 6 {
            return Err(FeedError::MalformedPayload(format!(
                "kline row has {} fields, expected at least 6",
                fields.len()
            )));
        }

        let open_time_ms = fields[0].as_i64().ok_or_else(|| {
            FeedError::MalformedPayload("kline open time is not an integer".to_string())
        })?;
        let time = DateTime::from_timestamp_millis(open_time_ms).ok_or_else(|| {
            FeedError::MalformedPayload(format!("kline open time {} out of range", open_time_ms))
        })?;

        Ok(Candle {
            time,
            open: Self::parse_price(&fields[1], "open")?,
            high: Self::parse_price(&fields[2], "high")?,
            low: Self::parse_price(&fields[3], "low")?,
            close: Self::parse_price(&fields[4], "close")?,
            volume: Self::parse_price(&fields[5], "volume")?,
        })
    }

    /// Binance encodes numeric fields as decimal strings
    fn parse_price(value: &Value, field: &str) -> FeedResult<f64> {
        value
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| {
                FeedError::MalformedPayload(format!("kline {} is not a decimal string", field))
            })
    }
}

#[async_trait]
impl MarketDataFeed for BinanceFeed {
    async fn backfill(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> FeedResult<Vec<Candle>> {
        let url = format!("{}/klines", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("interval", interval),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FeedError::BadStatus {
                endpoint: "/klines".to_string(),
                status: response.status().as_u16(),
            });
        }

        let rows: Vec<Value> = response.json().await?;
        let candles = rows
            .iter()
            .map(Self::parse_kline)
            .collect::<FeedResult<Vec<_>>>()?;

        debug!("fetched {} candles for {}", candles.len(), symbol);
        Ok(candles)
    }

    async fn latest_price(&self, symbol: &str) -> FeedResult<f64> {
        let url = format!("{}/ticker/24hr", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FeedError::BadStatus {
                endpoint: "/ticker/24hr".to_string(),
                status: response.status().as_u16(),
            });
        }

        let ticker: TickerResponse = response.json().await?;
        ticker.last_price.parse::<f64>().map_err(|_| {
            FeedError::MalformedPayload(format!("lastPrice {:?} is not numeric", ticker.last_price))
        })
    }
}

#[derive(Debug, Deserialize)]
struct TickerResponse {
    #[serde(rename = "lastPrice")]
    last_price: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_kline() {
        let row = json!([
            1700000000000i64,
            "37250.10",
            "37400.00",
            "37100.50",
            "37380.25",
            "1234.567",
            1700003599999i64,
            "46000000.0",
            4321,
            "600.0",
            "22000000.0",
            "0"
        ]);

        let candle = BinanceFeed::parse_kline(&row).unwrap();
        assert_eq!(candle.open, 37250.10);
        assert_eq!(candle.high, 37400.00);
        assert_eq!(candle.low, 37100.50);
        assert_eq!(candle.close, 37380.25);
        assert_eq!(candle.volume, 1234.567);
        assert_eq!(candle.time.timestamp_millis(), 1700000000000);
    }

    #[test]
    fn test_parse_kline_rejects_short_row() {
        let row = json!([1700000000000i64, "37250.10"]);
        assert!(matches!(
            BinanceFeed::parse_kline(&row),
            Err(FeedError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_parse_kline_rejects_numeric_price() {
        // Prices must arrive as decimal strings.
        let row = json!([1700000000000i64, 37250.1, "37400", "37100", "37380", "12"]);
        assert!(matches!(
            BinanceFeed::parse_kline(&row),
            Err(FeedError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_ticker_response_shape() {
        let ticker: TickerResponse =
            serde_json::from_str(r#"{"symbol":"BTCUSDT","lastPrice":"37380.25"}"#).unwrap();
        assert_eq!(ticker.last_price, "37380.25");
    }
}
