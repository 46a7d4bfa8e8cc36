//! Bounded in-memory candle history per tracked symbol
//!
//! The symbol set is fixed at construction. Writers hold a per-symbol
//! lock, so a refresh of one symbol never blocks reads of another.

use parking_lot::RwLock;
use std::collections::HashMap;

use qk_signals::Candle;

/// Bounded candle buffers keyed by symbol
pub struct HistoryStore {
    capacity: usize,
    series: HashMap<String, RwLock<Vec<Candle>>>,
}

impl HistoryStore {
    /// Create a store tracking exactly the given symbols
    pub fn new(symbols: &[String], capacity: usize) -> Self {
        let series = symbols
            .iter()
            .map(|s| (s.clone(), RwLock::new(Vec::with_capacity(capacity))))
            .collect();
        Self { capacity, series }
    }

    /// Replace a symbol's buffer wholesale with a fresh backfill.
    ///
    /// Candles are sorted by open time, de-duplicated keeping the later
    /// occurrence, and trimmed from the front to capacity. Unknown
    /// symbols are ignored.
    pub fn replace(&self, symbol: &str, mut candles: Vec<Candle>) {
        let Some(lock) = self.series.get(symbol) else {
            return;
        };

        candles.sort_by_key(|c| c.time);
        candles.reverse();
        candles.dedup_by_key(|c| c.time);
        candles.reverse();
        if candles.len() > self.capacity {
            candles.drain(..candles.len() - self.capacity);
        }

        *lock.write() = candles;
    }

    /// Append one candle, overwriting an existing candle with the same
    /// open time and evicting the oldest entry past capacity
    pub fn append(&self, symbol: &str, candle: Candle) {
        let Some(lock) = self.series.get(symbol) else {
            return;
        };

        let mut buf = lock.write();
        match buf.iter().position(|c| c.time == candle.time) {
            Some(idx) => buf[idx] = candle,
            None => {
                buf.push(candle);
                buf.sort_by_key(|c| c.time);
                if buf.len() > self.capacity {
                    buf.remove(0);
                }
            }
        }
    }

    /// Clone the current buffer for a symbol
    pub fn snapshot(&self, symbol: &str) -> Option<Vec<Candle>> {
        self.series.get(symbol).map(|lock| lock.read().clone())
    }

    /// Number of candles currently held for a symbol
    pub fn len(&self, symbol: &str) -> usize {
        self.series.get(symbol).map_or(0, |lock| lock.read().len())
    }

    /// Whether a symbol's buffer is empty or untracked
    pub fn is_empty(&self, symbol: &str) -> bool {
        self.len(symbol) == 0
    }

    /// Whether the symbol is tracked by this store
    pub fn contains(&self, symbol: &str) -> bool {
        self.series.contains_key(symbol)
    }
}
