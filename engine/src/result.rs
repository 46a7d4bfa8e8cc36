//! Analysis output types
//!
//! [`AnalysisResult`] is the unit broadcast to subscribers: one fully
//! scored view of a symbol, combining the signal, factor breakdown,
//! risk profile, entry candidates, and a 24-candle market summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use qk_risk::{EntryCandidate, RiskProfile};
use qk_signals::{Candle, Factor, MarketRegime, Signal};

use crate::session::Session;

/// Rolling 24-candle market summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Trading pair symbol
    pub symbol: String,
    /// Current traded price
    pub price: f64,
    /// Absolute price change over the last 24 candles
    pub change_24h: f64,
    /// Percent price change over the last 24 candles
    pub change_percent_24h: f64,
    /// Highest high over the last 24 candles
    pub high_24h: f64,
    /// Lowest low over the last 24 candles
    pub low_24h: f64,
    /// Summed volume over the last 24 candles
    pub volume_24h: f64,
}

impl MarketSnapshot {
    /// Summarize the last 24 candles of a series.
    ///
    /// With fewer than 24 candles the change fields are zero and the
    /// range and volume cover the whole series.
    pub fn from_series(symbol: &str, price: f64, candles: &[Candle]) -> Self {
        let window = if candles.len() >= 24 {
            &candles[candles.len() - 24..]
        } else {
            candles
        };

        let (change, change_pct) = if candles.len() >= 24 {
            let reference = candles[candles.len() - 24].close;
            if reference > 0.0 {
                (price - reference, (price / reference - 1.0) * 100.0)
            } else {
                (0.0, 0.0)
            }
        } else {
            (0.0, 0.0)
        };

        let high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        let volume = window.iter().map(|c| c.volume).sum::<f64>();

        Self {
            symbol: symbol.to_string(),
            price: round2(price),
            change_24h: round2(change),
            change_percent_24h: round2(change_pct),
            high_24h: round2(if window.is_empty() { 0.0 } else { high }),
            low_24h: round2(if window.is_empty() { 0.0 } else { low }),
            volume_24h: round2(volume),
        }
    }
}

/// One complete analysis of a symbol, as broadcast to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Trading pair symbol
    pub symbol: String,
    /// Market summary
    pub market: MarketSnapshot,
    /// Composite signal
    pub signal: Signal,
    /// Per-factor breakdown behind the signal
    pub factors: Vec<Factor>,
    /// Volatility-aware position sizing
    pub risk: RiskProfile,
    /// Ranked entry candidates, at most three
    pub entries: Vec<EntryCandidate>,
    /// Detected market regime
    pub regime: MarketRegime,
    /// Trading session active at analysis time
    pub active_session: Session,
    /// Next session open or close event
    pub next_event: String,
    /// Human-readable trade recommendation
    pub recommendation: String,
    /// Analysis wall-clock time
    pub timestamp: DateTime<Utc>,
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
