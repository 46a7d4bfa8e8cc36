//! Core types for indicator computation and signal scoring

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Unique identifier for a tradable instrument (e.g. "BTCUSDT")
pub type SymbolId = String;

/// One open/high/low/close/volume record for a fixed time bucket
///
/// Immutable once appended to a history buffer. Buffers keep candles in
/// strictly ascending time order with no duplicate timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket open time
    pub time: DateTime<Utc>,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Traded volume
    pub volume: f64,
}

/// Derived per-snapshot statistics consumed by the scorer and downstream
/// components
///
/// Computed fresh from a buffer snapshot each cycle, never cached across
/// cycles. The 100/200-period averages fall back to the 50-period value
/// when history is shorter than the nominal window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorBundle {
    /// 20-period exponential moving average
    pub ema_20: f64,
    /// 50-period exponential moving average
    pub ema_50: f64,
    /// 100-period EMA (falls back to `ema_50` below 100 candles)
    pub ema_100: f64,
    /// 200-period EMA (falls back to `ema_50` below 200 candles)
    pub ema_200: f64,
    /// 14-period RSI (Wilder smoothing)
    pub rsi: f64,
    /// 7-period RSI
    pub rsi_7: f64,
    /// 21-period RSI
    pub rsi_21: f64,
    /// MACD(12,26) line
    pub macd: f64,
    /// 9-period signal line of the MACD
    pub macd_signal: f64,
    /// MACD histogram (line minus signal)
    pub macd_hist: f64,
    /// Upper Bollinger band (20-period, 2σ)
    pub bb_upper: f64,
    /// Band midline (20-period SMA)
    pub bb_middle: f64,
    /// Lower Bollinger band
    pub bb_lower: f64,
    /// 14-period average true range (Wilder smoothing)
    pub atr: f64,
    /// 14-period ADX, bounded [0, 100]
    pub adx: f64,
    /// Positive directional indicator (+DI)
    pub plus_di: f64,
    /// Negative directional indicator (−DI)
    pub minus_di: f64,
    /// 20-period simple moving average of volume
    pub volume_sma: f64,
    /// Volume-weighted average price over the whole snapshot
    pub vwap: f64,
    /// Latest close
    pub close: f64,
    /// Latest high
    pub high: f64,
    /// Latest low
    pub low: f64,
}

/// Five-class directional signal, ordered from strongest sell to
/// strongest buy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalClass {
    StrongSell,
    Sell,
    Neutral,
    Buy,
    StrongBuy,
}

impl SignalClass {
    /// Classify a final weighted score.
    ///
    /// Boundaries are exact: a score of 65 is `Buy`, 66 is `StrongBuy`.
    pub fn from_score(score: i32) -> Self {
        if score > 65 {
            SignalClass::StrongBuy
        } else if score > 25 {
            SignalClass::Buy
        } else if score > -25 {
            SignalClass::Neutral
        } else if score > -65 {
            SignalClass::Sell
        } else {
            SignalClass::StrongSell
        }
    }

    /// Buy or strong-buy
    pub fn is_buy_family(&self) -> bool {
        matches!(self, SignalClass::Buy | SignalClass::StrongBuy)
    }

    /// Sell or strong-sell
    pub fn is_sell_family(&self) -> bool {
        matches!(self, SignalClass::Sell | SignalClass::StrongSell)
    }

    /// Human-readable label (e.g. "STRONG BUY")
    pub fn label(&self) -> &'static str {
        match self {
            SignalClass::StrongSell => "STRONG SELL",
            SignalClass::Sell => "SELL",
            SignalClass::Neutral => "NEUTRAL",
            SignalClass::Buy => "BUY",
            SignalClass::StrongBuy => "STRONG BUY",
        }
    }
}

impl fmt::Display for SignalClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalClass::StrongSell => "strong_sell",
            SignalClass::Sell => "sell",
            SignalClass::Neutral => "neutral",
            SignalClass::Buy => "buy",
            SignalClass::StrongBuy => "strong_buy",
        };
        write!(f, "{}", s)
    }
}

/// Coarse market-behavior label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketRegime {
    TrendingUp,
    TrendingDown,
    Ranging,
    Breakout,
    Reversal,
}

impl fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarketRegime::TrendingUp => "trending_up",
            MarketRegime::TrendingDown => "trending_down",
            MarketRegime::Ranging => "ranging",
            MarketRegime::Breakout => "breakout",
            MarketRegime::Reversal => "reversal",
        };
        write!(f, "{}", s)
    }
}

/// Directional trading signal produced once per instrument per cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Signal class
    pub class: SignalClass,
    /// Weighted score in [-100, 100]
    pub score: i32,
    /// Confidence in [0, 100]
    pub confidence: i32,
    /// Display label for the class
    pub label: String,
    /// Scoring timestamp
    pub timestamp: DateTime<Utc>,
}

/// Bullish or bearish reading of a single factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorDirection {
    Bullish,
    Bearish,
}

/// One scoring dimension's contribution to the final signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    /// Dimension name (e.g. "Trend Strength")
    pub name: String,
    /// Signed score contribution before weighting
    pub impact: i32,
    /// Free-text rationale
    pub description: String,
    /// Bullish when impact is positive, bearish otherwise
    pub direction: FactorDirection,
}

impl Factor {
    pub fn new(name: &str, impact: i32, description: String) -> Self {
        Self {
            name: name.to_string(),
            impact,
            description,
            direction: if impact > 0 {
                FactorDirection::Bullish
            } else {
                FactorDirection::Bearish
            },
        }
    }
}

/// Total order over signal classes used in tests and ranking.
///
/// `StrongSell < Sell < Neutral < Buy < StrongBuy` (derived `Ord`).
pub fn compare_classes(a: SignalClass, b: SignalClass) -> Ordering {
    a.cmp(&b)
}
