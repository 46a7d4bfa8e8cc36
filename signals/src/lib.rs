//! # qk-signals: Indicators and Multi-Factor Signal Scoring
//!
//! This library provides the quantitative core of quantkit: technical
//! indicator computation over candle snapshots and a weighted
//! multi-factor scoring model that fuses them into a directional signal.
//!
//! ## Core Components
//!
//! - **Indicator functions**: EMA, RSI, MACD, Bollinger bands, ATR, the
//!   directional movement system and snapshot VWAP
//! - **IndicatorBundle**: the fixed record of derived statistics computed
//!   fresh from each snapshot
//! - **SignalScorer**: five scoring dimensions combined through a
//!   validated weight table into a score, class, confidence and regime
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use qk_signals::{indicators, SignalScorer};
//! # let candles: Vec<qk_signals::Candle> = vec![];
//!
//! let bundle = indicators::compute(&candles).unwrap();
//! let scorer = SignalScorer::default();
//! let (signal, factors, regime) = scorer.score(&candles, &bundle);
//! println!("{} score={} regime={}", signal.class, signal.score, regime);
//! ```

pub mod error;
pub mod indicators;
pub mod scorer;
pub mod types;

pub use error::{SignalError, SignalResult};
pub use indicators::MIN_CANDLES;
pub use scorer::{ScoreWeights, SignalScorer};
pub use types::{
    Candle, Factor, FactorDirection, IndicatorBundle, MarketRegime, Signal, SignalClass, SymbolId,
};
