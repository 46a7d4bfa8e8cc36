//! Entry-candidate search with win-rate estimation
//!
//! Generates up to four anchored limit-order candidates per side (band
//! edge, short EMA, VWAP, fixed ATR offset from the current price), each
//! with take-profit/stop-loss levels at predetermined ATR multiples,
//! scores them with a bounded win-rate heuristic, and keeps the top three
//! by (win rate, strength). The ranking order and the [20, 95] win-rate
//! clamp are contracts relied on downstream.

use serde::{Deserialize, Serialize};
use std::fmt;

use qk_signals::{Candle, IndicatorBundle, Signal};

/// Order side for an entry candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Reliability tier of an entry candidate, ordered best-first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryTier {
    Primary,
    Secondary,
    Aggressive,
}

impl EntryTier {
    /// Win-rate adjustment: primary entries are more reliable,
    /// aggressive ones trade reliability for positioning
    fn win_rate_adjustment(&self) -> f64 {
        match self {
            EntryTier::Primary => 5.0,
            EntryTier::Secondary => 0.0,
            EntryTier::Aggressive => -3.0,
        }
    }
}

impl fmt::Display for EntryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryTier::Primary => "primary",
            EntryTier::Secondary => "secondary",
            EntryTier::Aggressive => "aggressive",
        };
        write!(f, "{}", s)
    }
}

/// One candidate limit-order level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryCandidate {
    /// Limit price (2 decimal places)
    pub price: f64,
    /// Reliability tier
    pub tier: EntryTier,
    /// Technical rationale
    pub reason: String,
    /// Reward over risk at the attached TP/SL levels
    pub risk_reward_ratio: f64,
    /// Entry strength in [0, 100]
    pub strength: i32,
    /// Order side
    pub side: OrderSide,
    /// Estimated win rate in [20, 95]
    pub win_rate: i32,
    /// Take-profit price
    pub tp_price: f64,
    /// Stop-loss price
    pub sl_price: f64,
}

/// Searches a snapshot for ranked entry candidates
#[derive(Debug, Clone, Default)]
pub struct EntryFinder;

/// Maximum candidates returned per cycle
pub const MAX_ENTRIES: usize = 3;

impl EntryFinder {
    /// Find the best entry candidates for the current signal.
    ///
    /// Buy-side anchors for buy-family signals, sell-side for
    /// sell-family; a neutral signal yields both sides with strength
    /// halved (floor 30). Candidates are sorted by (win rate, strength)
    /// descending and capped at [`MAX_ENTRIES`].
    pub fn find(
        &self,
        snapshot: &[Candle],
        bundle: &IndicatorBundle,
        signal: &Signal,
        current_price: f64,
    ) -> Vec<EntryCandidate> {
        let mut entries = if signal.class.is_buy_family() {
            self.buy_entries(snapshot, bundle, signal, current_price)
        } else if signal.class.is_sell_family() {
            self.sell_entries(snapshot, bundle, signal, current_price)
        } else {
            let mut both = self.buy_entries(snapshot, bundle, signal, current_price);
            both.extend(self.sell_entries(snapshot, bundle, signal, current_price));
            for entry in &mut both {
                entry.strength = ((entry.strength as f64 * 0.5) as i32).max(30);
            }
            both
        };

        entries.sort_by(|a, b| (b.win_rate, b.strength).cmp(&(a.win_rate, a.strength)));
        entries.truncate(MAX_ENTRIES);
        entries
    }

    /// Four buy-side anchors: lower band bounce, EMA-20 pullback, VWAP
    /// fair value, and a conservative dip below the current price
    fn buy_entries(
        &self,
        snapshot: &[Candle],
        bundle: &IndicatorBundle,
        signal: &Signal,
        current_price: f64,
    ) -> Vec<EntryCandidate> {
        let atr = bundle.atr;
        let mut entries = Vec::with_capacity(4);

        // Lower Bollinger band: aggressive support bounce, 3.0/1.2 ATR.
        let price = round2(bundle.bb_lower);
        let tp = round2(price + atr * 3.0);
        let sl = round2(price - atr * 1.2);
        let rrr = reward_over_risk(OrderSide::Buy, price, tp, sl);
        let mut strength = if signal.confidence > 75 { 90 } else { 80 };
        if (price - bundle.vwap).abs() < atr {
            strength = (strength + 5).min(98);
        }
        entries.push(EntryCandidate {
            price,
            tier: EntryTier::Aggressive,
            reason: format!("Lower BB support - Strong bounce setup (RRR {:.2}:1)", rrr),
            risk_reward_ratio: round2(rrr),
            strength,
            side: OrderSide::Buy,
            win_rate: self.win_rate(
                EntryTier::Aggressive,
                OrderSide::Buy,
                price,
                tp,
                sl,
                bundle,
                snapshot,
                signal,
            ),
            tp_price: tp,
            sl_price: sl,
        });

        // EMA-20: dynamic support, 2.8/1.0 ATR.
        let price = round2(bundle.ema_20);
        let tp = round2(price + atr * 2.8);
        let sl = round2(price - atr * 1.0);
        let rrr = reward_over_risk(OrderSide::Buy, price, tp, sl);
        let strength = if signal.confidence > 75 { 85 } else { 70 };
        entries.push(EntryCandidate {
            price,
            tier: EntryTier::Secondary,
            reason: format!("EMA-20 dynamic support - Trend confirmation (RRR {:.2}:1)", rrr),
            risk_reward_ratio: round2(rrr),
            strength,
            side: OrderSide::Buy,
            win_rate: self.win_rate(
                EntryTier::Secondary,
                OrderSide::Buy,
                price,
                tp,
                sl,
                bundle,
                snapshot,
                signal,
            ),
            tp_price: tp,
            sl_price: sl,
        });

        // VWAP: volume-weighted fair value, 3.0/1.1 ATR.
        let price = round2(bundle.vwap);
        let tp = round2(price + atr * 3.0);
        let sl = round2(price - atr * 1.1);
        let rrr = reward_over_risk(OrderSide::Buy, price, tp, sl);
        let mut strength = if signal.confidence > 70 { 88 } else { 75 };
        if (price - bundle.bb_middle).abs() < atr * 0.5 {
            strength = (strength + 3).min(98);
        }
        entries.push(EntryCandidate {
            price,
            tier: EntryTier::Primary,
            reason: format!("VWAP fair value - Volume weighted (RRR {:.2}:1)", rrr),
            risk_reward_ratio: round2(rrr),
            strength,
            side: OrderSide::Buy,
            win_rate: self.win_rate(
                EntryTier::Primary,
                OrderSide::Buy,
                price,
                tp,
                sl,
                bundle,
                snapshot,
                signal,
            ),
            tp_price: tp,
            sl_price: sl,
        });

        // Conservative dip: fixed 0.6 ATR below the current price.
        let price = round2(current_price - atr * 0.6);
        let tp = round2(price + atr * 2.5);
        let sl = round2(price - atr * 0.8);
        let rrr = reward_over_risk(OrderSide::Buy, price, tp, sl);
        let strength = if signal.confidence > 65 { 75 } else { 60 };
        entries.push(EntryCandidate {
            price,
            tier: EntryTier::Primary,
            reason: format!("Current - 0.6 ATR (Conservative limit order, RRR {:.2}:1)", rrr),
            risk_reward_ratio: round2(rrr),
            strength,
            side: OrderSide::Buy,
            win_rate: self.win_rate(
                EntryTier::Primary,
                OrderSide::Buy,
                price,
                tp,
                sl,
                bundle,
                snapshot,
                signal,
            ),
            tp_price: tp,
            sl_price: sl,
        });

        entries
    }

    /// Mirror image of the buy anchors at resistance levels
    fn sell_entries(
        &self,
        snapshot: &[Candle],
        bundle: &IndicatorBundle,
        signal: &Signal,
        current_price: f64,
    ) -> Vec<EntryCandidate> {
        let atr = bundle.atr;
        let mut entries = Vec::with_capacity(4);

        // Upper Bollinger band: aggressive resistance, 3.0/1.2 ATR.
        let price = round2(bundle.bb_upper);
        let tp = round2(price - atr * 3.0);
        let sl = round2(price + atr * 1.2);
        let rrr = reward_over_risk(OrderSide::Sell, price, tp, sl);
        let mut strength = if signal.confidence > 75 { 90 } else { 80 };
        if (price - bundle.vwap).abs() < atr {
            strength = (strength + 5).min(98);
        }
        entries.push(EntryCandidate {
            price,
            tier: EntryTier::Aggressive,
            reason: format!("Upper BB resistance - Strong pullback setup (RRR {:.2}:1)", rrr),
            risk_reward_ratio: round2(rrr),
            strength,
            side: OrderSide::Sell,
            win_rate: self.win_rate(
                EntryTier::Aggressive,
                OrderSide::Sell,
                price,
                tp,
                sl,
                bundle,
                snapshot,
                signal,
            ),
            tp_price: tp,
            sl_price: sl,
        });

        // EMA-20: dynamic resistance, 2.8/1.0 ATR.
        let price = round2(bundle.ema_20);
        let tp = round2(price - atr * 2.8);
        let sl = round2(price + atr * 1.0);
        let rrr = reward_over_risk(OrderSide::Sell, price, tp, sl);
        let strength = if signal.confidence > 75 { 85 } else { 70 };
        entries.push(EntryCandidate {
            price,
            tier: EntryTier::Secondary,
            reason: format!("EMA-20 dynamic resistance - Trend confirmation (RRR {:.2}:1)", rrr),
            risk_reward_ratio: round2(rrr),
            strength,
            side: OrderSide::Sell,
            win_rate: self.win_rate(
                EntryTier::Secondary,
                OrderSide::Sell,
                price,
                tp,
                sl,
                bundle,
                snapshot,
                signal,
            ),
            tp_price: tp,
            sl_price: sl,
        });

        // VWAP: volume-weighted fair value, 3.0/1.1 ATR.
        let price = round2(bundle.vwap);
        let tp = round2(price - atr * 3.0);
        let sl = round2(price + atr * 1.1);
        let rrr = reward_over_risk(OrderSide::Sell, price, tp, sl);
        let mut strength = if signal.confidence > 70 { 88 } else { 75 };
        if (price - bundle.bb_middle).abs() < atr * 0.5 {
            strength = (strength + 3).min(98);
        }
        entries.push(EntryCandidate {
            price,
            tier: EntryTier::Primary,
            reason: format!("VWAP fair value - Volume weighted (RRR {:.2}:1)", rrr),
            risk_reward_ratio: round2(rrr),
            strength,
            side: OrderSide::Sell,
            win_rate: self.win_rate(
                EntryTier::Primary,
                OrderSide::Sell,
                price,
                tp,
                sl,
                bundle,
                snapshot,
                signal,
            ),
            tp_price: tp,
            sl_price: sl,
        });

        // Conservative rally: fixed 0.6 ATR above the current price.
        let price = round2(current_price + atr * 0.6);
        let tp = round2(price - atr * 2.5);
        let sl = round2(price + atr * 0.8);
        let rrr = reward_over_risk(OrderSide::Sell, price, tp, sl);
        let strength = if signal.confidence > 65 { 75 } else { 60 };
        entries.push(EntryCandidate {
            price,
            tier: EntryTier::Primary,
            reason: format!("Current + 0.6 ATR (Conservative limit order, RRR {:.2}:1)", rrr),
            risk_reward_ratio: round2(rrr),
            strength,
            side: OrderSide::Sell,
            win_rate: self.win_rate(
                EntryTier::Primary,
                OrderSide::Sell,
                price,
                tp,
                sl,
                bundle,
                snapshot,
                signal,
            ),
            tp_price: tp,
            sl_price: sl,
        });

        entries
    }

    /// Bounded win-rate heuristic.
    ///
    /// Base 50, plus a confidence-linear term, a side-aware risk/reward
    /// tier bonus, trend-strength and volume-confirmation bonuses, the
    /// tier adjustment and an RSI-extremity bonus; clamped to [20, 95].
    #[allow(clippy::too_many_arguments)]
    fn win_rate(
        &self,
        tier: EntryTier,
        side: OrderSide,
        entry: f64,
        tp: f64,
        sl: f64,
        bundle: &IndicatorBundle,
        snapshot: &[Candle],
        signal: &Signal,
    ) -> i32 {
        let mut rate = 50.0;

        // Signal confidence, +/-7.5 at the extremes.
        rate += (signal.confidence as f64 - 50.0) * 0.15;

        // Risk/reward quality.
        let (risk, reward) = match side {
            OrderSide::Buy => (entry - sl, tp - entry),
            OrderSide::Sell => (sl - entry, entry - tp),
        };
        if risk > 0.0 {
            let rrr = reward / risk;
            if rrr > 2.5 {
                rate += 12.0;
            } else if rrr > 2.0 {
                rate += 10.0;
            } else if rrr > 1.5 {
                rate += 8.0;
            } else if rrr > 1.0 {
                rate += 5.0;
            }
        }

        // Trending markets are easier to profit from; ranging is harder.
        if bundle.adx > 30.0 {
            rate += 8.0;
        } else if bundle.adx < 20.0 {
            rate -= 5.0;
        }

        // Volume confirmation.
        if let Some(last) = snapshot.last() {
            if bundle.volume_sma > 0.0 && last.volume > bundle.volume_sma * 1.5 {
                rate += 8.0;
            }
        }

        rate += tier.win_rate_adjustment();

        // RSI extremes are good reversal points.
        if bundle.rsi < 30.0 || bundle.rsi > 70.0 {
            rate += 10.0;
        } else if bundle.rsi < 40.0 || bundle.rsi > 60.0 {
            rate += 5.0;
        }

        rate.clamp(20.0, 95.0) as i32
    }
}

/// Side-aware reward/risk in percent terms, 0 when the risk leg is not
/// positive
fn reward_over_risk(side: OrderSide, entry: f64, tp: f64, sl: f64) -> f64 {
    if entry <= 0.0 {
        return 0.0;
    }
    let (gain_pct, risk_pct) = match side {
        OrderSide::Buy => ((tp - entry) / entry * 100.0, (entry - sl) / entry * 100.0),
        OrderSide::Sell => ((entry - tp) / entry * 100.0, (sl - entry) / entry * 100.0),
    };
    if risk_pct > 0.0 {
        gain_pct / risk_pct
    } else {
        0.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use qk_signals::SignalClass;

    fn bundle_with(close: f64, atr: f64) -> IndicatorBundle {
        IndicatorBundle {
            ema_20: close - 1.0,
            ema_50: close - 2.0,
            ema_100: close - 3.0,
            ema_200: close - 4.0,
            rsi: 55.0,
            rsi_7: 55.0,
            rsi_21: 55.0,
            macd: 1.0,
            macd_signal: 0.5,
            macd_hist: 0.5,
            bb_upper: close + 2.0 * atr,
            bb_middle: close,
            bb_lower: close - 2.0 * atr,
            atr,
            adx: 28.0,
            plus_di: 25.0,
            minus_di: 15.0,
            volume_sma: 10.0,
            vwap: close - 0.5,
            close,
            high: close + 0.5,
            low: close - 0.5,
        }
    }

    fn signal_with(class: SignalClass, confidence: i32) -> Signal {
        Signal {
            class,
            score: 0,
            confidence,
            label: class.label().to_string(),
            timestamp: Utc::now(),
        }
    }

    fn snapshot(n: usize) -> Vec<Candle> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| Candle {
                time: base + Duration::hours(i as i64),
                open: 100.0,
                high: 100.5,
                low: 99.5,
                close: 100.0,
                volume: 10.0,
            })
            .collect()
    }

    #[test]
    fn test_buy_signal_yields_buy_side_only() {
        let bundle = bundle_with(100.0, 1.5);
        let signal = signal_with(SignalClass::Buy, 80);
        let entries = EntryFinder.find(&snapshot(60), &bundle, &signal, 100.0);

        assert!(!entries.is_empty());
        assert!(entries.len() <= MAX_ENTRIES);
        assert!(entries.iter().all(|e| e.side == OrderSide::Buy));
    }

    #[test]
    fn test_sell_signal_yields_sell_side_only() {
        let bundle = bundle_with(100.0, 1.5);
        let signal = signal_with(SignalClass::StrongSell, 80);
        let entries = EntryFinder.find(&snapshot(60), &bundle, &signal, 100.0);

        assert!(entries.iter().all(|e| e.side == OrderSide::Sell));
    }

    #[test]
    fn test_neutral_halves_strength_with_floor() {
        let bundle = bundle_with(100.0, 1.5);
        let signal = signal_with(SignalClass::Neutral, 50);
        let entries = EntryFinder.find(&snapshot(60), &bundle, &signal, 100.0);

        assert!(entries.len() <= MAX_ENTRIES);
        // Halved strengths from the 60..98 raw range stay within [30, 49].
        assert!(entries.iter().all(|e| e.strength >= 30 && e.strength <= 49));
    }

    #[test]
    fn test_entries_sorted_by_win_rate_then_strength() {
        let bundle = bundle_with(100.0, 1.5);
        let signal = signal_with(SignalClass::Buy, 85);
        let entries = EntryFinder.find(&snapshot(60), &bundle, &signal, 100.0);

        for pair in entries.windows(2) {
            assert!(
                (pair[0].win_rate, pair[0].strength) >= (pair[1].win_rate, pair[1].strength),
                "candidates out of order: {:?}",
                entries
            );
        }
    }

    #[test]
    fn test_buy_anchor_levels() {
        let bundle = bundle_with(100.0, 2.0);
        let signal = signal_with(SignalClass::StrongBuy, 90);
        let entries = EntryFinder.find(&snapshot(60), &bundle, &signal, 100.0);

        // All candidates carry TP above and SL below the entry.
        for e in &entries {
            assert!(e.tp_price > e.price, "{:?}", e);
            assert!(e.sl_price < e.price, "{:?}", e);
            assert!(e.risk_reward_ratio > 0.0);
        }
    }

    #[test]
    fn test_zero_atr_degrades_cleanly() {
        let bundle = bundle_with(100.0, 0.0);
        let signal = signal_with(SignalClass::Neutral, 90);
        let entries = EntryFinder.find(&snapshot(60), &bundle, &signal, 100.0);

        assert!(entries.len() <= MAX_ENTRIES);
        for e in &entries {
            assert_eq!(e.risk_reward_ratio, 0.0);
            assert!((20..=95).contains(&e.win_rate));
        }
    }

    #[test]
    fn test_wire_tags() {
        assert_eq!(serde_json::to_string(&OrderSide::Buy).unwrap(), r#""BUY""#);
        assert_eq!(serde_json::to_string(&EntryTier::Aggressive).unwrap(), r#""aggressive""#);
    }

    #[test]
    fn test_tier_total_order() {
        assert!(EntryTier::Primary < EntryTier::Secondary);
        assert!(EntryTier::Secondary < EntryTier::Aggressive);
        assert!(OrderSide::Buy < OrderSide::Sell);
    }

    proptest! {
        #[test]
        fn prop_win_rate_and_cap_hold(
            close in 1.0f64..100_000.0,
            atr in 0.0f64..500.0,
            confidence in 0i32..=100,
            buyish in proptest::bool::ANY,
        ) {
            let class = if buyish { SignalClass::StrongBuy } else { SignalClass::StrongSell };
            let bundle = bundle_with(close, atr);
            let signal = signal_with(class, confidence);
            let entries = EntryFinder.find(&snapshot(60), &bundle, &signal, close);

            prop_assert!(entries.len() <= MAX_ENTRIES);
            for e in &entries {
                prop_assert!((20..=95).contains(&e.win_rate));
                prop_assert!((0..=100).contains(&e.strength));
            }
        }
    }
}
