//! # qk-risk: Position Sizing and Entry-Candidate Search
//!
//! This library maps a signal and its indicator bundle to a volatility
//! classification with a recommended position-size fraction, and searches
//! for ranked limit-order entry candidates with take-profit/stop-loss
//! levels and an estimated win rate.
//!
//! ## Core Components
//!
//! - **RiskSizer**: ATR-relative volatility tiers and confidence-scaled
//!   position sizing
//! - **EntryFinder**: four anchor strategies per side, win-rate heuristic,
//!   deterministic (win rate, strength) ranking capped at three candidates
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use qk_risk::{EntryFinder, RiskSizer};
//! # let candles: Vec<qk_signals::Candle> = vec![];
//! # let bundle = qk_signals::indicators::compute(&candles).unwrap();
//! # let (signal, _, _) = qk_signals::SignalScorer::default().score(&candles, &bundle);
//!
//! let risk = RiskSizer::default().size(&bundle, &signal);
//! let entries = EntryFinder::default().find(&candles, &bundle, &signal, 100.0);
//! assert!(entries.len() <= 3);
//! println!("size {} ({} volatility)", risk.recommended_position_size, risk.volatility);
//! ```

pub mod entries;
pub mod sizer;

pub use entries::{EntryCandidate, EntryFinder, EntryTier, OrderSide};
pub use sizer::{RiskProfile, RiskSizer, VolatilityTier};
