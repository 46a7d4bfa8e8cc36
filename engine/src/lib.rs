//! # qk-engine: Real-Time Analysis Engine
//!
//! This library orchestrates the quantkit signal pipeline: a market
//! data feed backfills candle history per symbol, the refresh loop
//! re-scores every symbol on a fixed cadence, and complete analysis
//! results fan out to broadcast subscribers.
//!
//! ## Core Components
//!
//! - **MarketDataFeed / BinanceFeed**: candle history and live prices
//!   over the exchange REST API
//! - **HistoryStore**: bounded per-symbol candle buffers
//! - **QuantEngine**: lifecycle, refresh loop and on-demand analysis
//! - **SubscriberRegistry**: bounded-channel fan-out of results
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use qk_engine::{BinanceFeed, EngineConfig, QuantEngine};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let feed = Arc::new(BinanceFeed::new()?);
//! let engine = QuantEngine::new(EngineConfig::default(), feed);
//! engine.start().await?;
//!
//! let mut sub = engine.subscribe();
//! while let Some(result) = sub.receiver.recv().await {
//!     println!("{}: {} ({}%)", result.symbol, result.signal.label, result.signal.confidence);
//! }
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod feed;
pub mod history;
pub mod recommend;
pub mod result;
pub mod session;
pub mod subscribers;

pub use engine::{EngineConfig, EngineState, QuantEngine};
pub use error::{AnalyzeError, EngineError, EngineResult, FeedError, FeedResult};
pub use feed::{BinanceFeed, MarketDataFeed, BINANCE_API_URL};
pub use history::HistoryStore;
pub use recommend::recommendation;
pub use result::{AnalysisResult, MarketSnapshot};
pub use session::{current_session, next_event, Session};
pub use subscribers::{SubscriberRegistry, Subscription, DEFAULT_SUBSCRIBER_BUFFER};
