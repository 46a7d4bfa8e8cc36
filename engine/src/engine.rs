//! Analysis engine orchestrating the feed, scoring, and broadcast
//!
//! The QuantEngine is the main entry point. On start it backfills
//! candle history for every configured symbol, then runs a refresh
//! loop: re-fetch history, analyze each symbol, broadcast the results,
//! sleep, repeat. Analysis is also available on demand for a single
//! symbol.

use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::join_all;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use qk_risk::{EntryFinder, RiskSizer};
use qk_signals::{indicators, Candle, SignalError, SignalScorer};

use crate::error::{AnalyzeError, EngineError, EngineResult};
use crate::feed::MarketDataFeed;
use crate::history::HistoryStore;
use crate::recommend::recommendation;
use crate::result::{AnalysisResult, MarketSnapshot};
use crate::session;
use crate::subscribers::{SubscriberRegistry, Subscription, DEFAULT_SUBSCRIBER_BUFFER};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Symbols to track and analyze
    pub symbols: Vec<String>,
    /// Candle interval requested from the feed
    pub interval: String,
    /// Candles of history kept per symbol
    pub history_limit: usize,
    /// Seconds between refresh cycles
    pub refresh_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbols: vec![
                "BTCUSDT".to_string(),
                "ETHUSDT".to_string(),
                "BNBUSDT".to_string(),
            ],
            interval: "1h".to_string(),
            history_limit: 500,
            refresh_secs: 5,
        }
    }
}

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Analysis engine for a fixed set of symbols
pub struct QuantEngine {
    config: EngineConfig,
    feed: Arc<dyn MarketDataFeed>,
    scorer: Arc<SignalScorer>,
    history: Arc<HistoryStore>,
    subscribers: Arc<SubscriberRegistry>,
    latest: Arc<DashMap<String, Arc<AnalysisResult>>>,
    state: Arc<RwLock<EngineState>>,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl QuantEngine {
    /// Create an engine over the given feed with default scoring weights
    pub fn new(config: EngineConfig, feed: Arc<dyn MarketDataFeed>) -> Self {
        Self::with_scorer(config, feed, SignalScorer::default())
    }

    /// Create an engine with custom scoring weights
    pub fn with_scorer(
        config: EngineConfig,
        feed: Arc<dyn MarketDataFeed>,
        scorer: SignalScorer,
    ) -> Self {
        let history = Arc::new(HistoryStore::new(&config.symbols, config.history_limit));
        Self {
            config,
            feed,
            scorer: Arc::new(scorer),
            history,
            subscribers: Arc::new(SubscriberRegistry::new()),
            latest: Arc::new(DashMap::new()),
            state: Arc::new(RwLock::new(EngineState::Stopped)),
            shutdown: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        *self.state.read()
    }

    /// Load initial history and spawn the refresh loop
    pub async fn start(&self) -> EngineResult<()> {
        {
            let mut state = self.state.write();
            if *state != EngineState::Stopped {
                return Err(EngineError::AlreadyRunning);
            }
            *state = EngineState::Starting;
        }

        info!("loading historical data for {} symbols", self.config.symbols.len());
        let worker = self.worker();
        worker.refresh_all().await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(worker.run(shutdown_rx));

        *self.shutdown.lock() = Some(shutdown_tx);
        *self.task.lock() = Some(handle);
        *self.state.write() = EngineState::Running;
        info!("engine started");
        Ok(())
    }

    /// Signal the refresh loop to stop and wait for it to finish
    pub async fn stop(&self) -> EngineResult<()> {
        {
            let mut state = self.state.write();
            if *state != EngineState::Running {
                return Err(EngineError::NotRunning);
            }
            *state = EngineState::Stopping;
        }

        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.send(true);
        }
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                error!("refresh loop ended abnormally: {}", err);
            }
        }

        *self.state.write() = EngineState::Stopped;
        info!("engine stopped");
        Ok(())
    }

    /// Subscribe to broadcast analysis results
    pub fn subscribe(&self) -> Subscription {
        self.subscribers.subscribe(DEFAULT_SUBSCRIBER_BUFFER)
    }

    /// Remove a subscriber by handle
    pub fn unsubscribe(&self, id: &uuid::Uuid) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Most recent broadcast result for a symbol, if any
    pub fn latest(&self, symbol: &str) -> Option<Arc<AnalysisResult>> {
        self.latest.get(symbol).map(|entry| Arc::clone(entry.value()))
    }

    /// Analyze a single symbol on demand against current history
    pub async fn analyze(&self, symbol: &str) -> Result<AnalysisResult, AnalyzeError> {
        self.worker().analyze_symbol(symbol).await
    }

    fn worker(&self) -> Worker {
        Worker {
            config: self.config.clone(),
            feed: Arc::clone(&self.feed),
            scorer: Arc::clone(&self.scorer),
            history: Arc::clone(&self.history),
            subscribers: Arc::clone(&self.subscribers),
            latest: Arc::clone(&self.latest),
        }
    }
}

/// Shared pieces of the engine used by the refresh loop
struct Worker {
    config: EngineConfig,
    feed: Arc<dyn MarketDataFeed>,
    scorer: Arc<SignalScorer>,
    history: Arc<HistoryStore>,
    subscribers: Arc<SubscriberRegistry>,
    latest: Arc<DashMap<String, Arc<AnalysisResult>>>,
}

impl Worker {
    /// Refresh loop: refresh, analyze, broadcast, sleep
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let period = std::time::Duration::from_secs(self.config.refresh_secs);
        loop {
            self.refresh_all().await;
            self.analyze_all(&shutdown).await;

            tokio::select! {
                _ = tokio::time::sleep(period) => {}
                _ = shutdown.changed() => {}
            }
            if *shutdown.borrow() {
                break;
            }
        }
        debug!("refresh loop exited");
    }

    /// Re-fetch candle history for every symbol concurrently.
    ///
    /// Each buffer is replaced wholesale; a failed fetch leaves the
    /// previous buffer in place.
    async fn refresh_all(&self) {
        let fetches = self.config.symbols.iter().map(|symbol| {
            self.feed
                .backfill(symbol, &self.config.interval, self.config.history_limit)
        });
        let results = join_all(fetches).await;

        for (symbol, result) in self.config.symbols.iter().zip(results) {
            match result {
                Ok(candles) => {
                    debug!("loaded {} candles for {}", candles.len(), symbol);
                    self.history.replace(symbol, candles);
                }
                Err(err) => warn!("error refreshing {}: {}", symbol, err),
            }
        }
    }

    /// Analyze every symbol in turn and broadcast successes
    async fn analyze_all(&self, shutdown: &watch::Receiver<bool>) {
        for symbol in &self.config.symbols {
            if *shutdown.borrow() {
                return;
            }
            match self.analyze_symbol(symbol).await {
                Ok(result) => {
                    let result = Arc::new(result);
                    self.latest.insert(symbol.clone(), Arc::clone(&result));
                    self.subscribers.broadcast(result);
                }
                Err(err) => warn!("error analyzing {}: {}", symbol, err),
            }
        }
    }

    /// Full analysis pass for one symbol
    async fn analyze_symbol(&self, symbol: &str) -> Result<AnalysisResult, AnalyzeError> {
        if !self.history.contains(symbol) {
            return Err(AnalyzeError::UnknownSymbol(symbol.to_string()));
        }

        let current_price =
            self.feed
                .latest_price(symbol)
                .await
                .map_err(|source| AnalyzeError::Feed {
                    symbol: symbol.to_string(),
                    source,
                })?;

        let candles = self.history.snapshot(symbol).unwrap_or_default();
        self.compose(symbol, &candles, current_price)
    }

    /// Score a snapshot and assemble the broadcast payload
    fn compose(
        &self,
        symbol: &str,
        candles: &[Candle],
        current_price: f64,
    ) -> Result<AnalysisResult, AnalyzeError> {
        let bundle = indicators::compute(candles).map_err(|err| match err {
            SignalError::InsufficientData { have, need } => AnalyzeError::InsufficientData {
                symbol: symbol.to_string(),
                have,
                need,
            },
            _ => AnalyzeError::InsufficientData {
                symbol: symbol.to_string(),
                have: candles.len(),
                need: indicators::MIN_CANDLES,
            },
        })?;

        let (signal, factors, regime) = self.scorer.score(candles, &bundle);
        let risk = RiskSizer.size(&bundle, &signal);
        let entries = EntryFinder.find(candles, &bundle, &signal, current_price);
        let recommendation = recommendation(&signal, &risk, &bundle, current_price);
        let market = MarketSnapshot::from_series(symbol, current_price, candles);

        Ok(AnalysisResult {
            symbol: symbol.to_string(),
            market,
            signal,
            factors,
            risk,
            entries,
            regime,
            active_session: session::current_session(),
            next_event: session::next_event(),
            recommendation,
            timestamp: chrono::Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::error::{FeedError, FeedResult};

    struct NullFeed;

    #[async_trait]
    impl MarketDataFeed for NullFeed {
        async fn backfill(
            &self,
            _symbol: &str,
            _interval: &str,
            _limit: usize,
        ) -> FeedResult<Vec<Candle>> {
            Err(FeedError::MalformedPayload("no data".to_string()))
        }

        async fn latest_price(&self, _symbol: &str) -> FeedResult<f64> {
            Ok(100.0)
        }
    }

    #[tokio::test]
    async fn test_initial_state_is_stopped() {
        let engine = QuantEngine::new(EngineConfig::default(), Arc::new(NullFeed));
        assert_eq!(engine.state(), EngineState::Stopped);
        assert!(engine.latest("BTCUSDT").is_none());
    }

    #[tokio::test]
    async fn test_stop_without_start_fails() {
        let engine = QuantEngine::new(EngineConfig::default(), Arc::new(NullFeed));
        assert!(matches!(engine.stop().await, Err(EngineError::NotRunning)));
    }

    #[tokio::test]
    async fn test_analyze_unknown_symbol() {
        let engine = QuantEngine::new(EngineConfig::default(), Arc::new(NullFeed));
        let err = engine.analyze("DOGEUSDT").await.unwrap_err();
        assert!(matches!(err, AnalyzeError::UnknownSymbol(_)));
    }

    #[tokio::test]
    async fn test_analyze_empty_history() {
        let engine = QuantEngine::new(EngineConfig::default(), Arc::new(NullFeed));
        let err = engine.analyze("BTCUSDT").await.unwrap_err();
        assert!(matches!(err, AnalyzeError::InsufficientData { have: 0, .. }));
    }

    #[test]
    fn test_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.symbols.len(), 3);
        assert_eq!(config.interval, "1h");
        assert_eq!(config.history_limit, 500);
        assert_eq!(config.refresh_secs, 5);
    }
}
