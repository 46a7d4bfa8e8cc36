//! Indicator computation over candle snapshots
//!
//! Pure functions, no I/O. Each takes ordered price/volume slices and
//! returns the latest indicator value(s). Smoothed indicators (RSI, ATR,
//! ADX) use Wilder's smoothing; averages use the standard EMA multiplier
//! `k = 2 / (period + 1)`.
//!
//! [`compute`] assembles the full [`IndicatorBundle`] from a snapshot,
//! with the degrade policy the bundle documents: below 50 candles it
//! returns [`SignalError::InsufficientData`]; the 100/200-period averages
//! fall back to the 50-period value when the window does not fit.

use crate::error::{SignalError, SignalResult};
use crate::types::{Candle, IndicatorBundle};

/// Minimum candles required before a bundle can be computed
pub const MIN_CANDLES: usize = 50;

/// Exponential moving average series.
///
/// Seeded with the SMA of the first `period` values. Empty when the
/// window does not fit.
pub fn ema(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || prices.len() < period {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    let seed = prices[..period].iter().sum::<f64>() / period as f64;

    let mut out = Vec::with_capacity(prices.len() - period + 1);
    out.push(seed);
    for &price in &prices[period..] {
        let prev = *out.last().unwrap();
        out.push(price * k + prev * (1.0 - k));
    }
    out
}

/// Latest EMA value, or `None` when the window does not fit
pub fn ema_last(prices: &[f64], period: usize) -> Option<f64> {
    ema(prices, period).last().copied()
}

/// Simple moving average of the trailing `period` values.
///
/// Averages the whole slice when it is shorter than `period`; 0 for an
/// empty slice.
pub fn sma_last(values: &[f64], period: usize) -> f64 {
    if values.is_empty() || period == 0 {
        return 0.0;
    }
    let window = &values[values.len().saturating_sub(period)..];
    window.iter().sum::<f64>() / window.len() as f64
}

/// Relative Strength Index with Wilder's smoothing.
///
/// Returns 50 for insufficient data or a perfectly flat series, 100 when
/// every change is a gain.
pub fn rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return 50.0;
    }

    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain = changes[..period].iter().filter(|&&c| c > 0.0).sum::<f64>() / period as f64;
    let mut avg_loss =
        changes[..period].iter().filter(|&&c| c < 0.0).map(|c| -c).sum::<f64>() / period as f64;

    for &c in &changes[period..] {
        let gain = if c > 0.0 { c } else { 0.0 };
        let loss = if c < 0.0 { -c } else { 0.0 };
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
    }

    if avg_gain == 0.0 && avg_loss == 0.0 {
        return 50.0;
    }
    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// MACD line, signal line and histogram.
///
/// Returns `(0, 0, 0)` when the slow + signal window does not fit.
pub fn macd(prices: &[f64], fast: usize, slow: usize, signal: usize) -> (f64, f64, f64) {
    if prices.len() < slow + signal {
        return (0.0, 0.0, 0.0);
    }

    let fast_ema = ema(prices, fast);
    let slow_ema = ema(prices, slow);
    if fast_ema.is_empty() || slow_ema.is_empty() {
        return (0.0, 0.0, 0.0);
    }

    // Align the two series at the slow start.
    let offset = slow - fast;
    let macd_series: Vec<f64> = (0..slow_ema.len())
        .map(|i| fast_ema[i + offset] - slow_ema[i])
        .collect();

    let signal_series = ema(&macd_series, signal);
    let Some(&signal_line) = signal_series.last() else {
        return (0.0, 0.0, 0.0);
    };
    let macd_line = *macd_series.last().unwrap();

    (macd_line, signal_line, macd_line - signal_line)
}

/// Bollinger bands `(upper, middle, lower)` over the trailing window.
///
/// SMA midline with population standard deviation. Collapses to the last
/// price when the window does not fit.
pub fn bollinger(prices: &[f64], period: usize, std_mult: f64) -> (f64, f64, f64) {
    let fallback = prices.last().copied().unwrap_or(0.0);
    if period == 0 || prices.len() < period {
        return (fallback, fallback, fallback);
    }

    let window = &prices[prices.len() - period..];
    let middle = window.iter().sum::<f64>() / period as f64;
    let variance = window.iter().map(|p| (p - middle).powi(2)).sum::<f64>() / period as f64;
    let std_dev = variance.sqrt();

    (middle + std_mult * std_dev, middle, middle - std_mult * std_dev)
}

/// True range series: `max(H-L, |H-prevC|, |L-prevC|)` for each candle
/// after the first.
fn true_ranges(highs: &[f64], lows: &[f64], closes: &[f64]) -> Vec<f64> {
    (1..highs.len())
        .map(|i| {
            let hl = highs[i] - lows[i];
            let hc = (highs[i] - closes[i - 1]).abs();
            let lc = (lows[i] - closes[i - 1]).abs();
            hl.max(hc).max(lc)
        })
        .collect()
}

/// Average True Range with Wilder's smoothing.
///
/// Returns 0 on mismatched or insufficient data.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> f64 {
    let n = highs.len();
    if period == 0 || n < period + 1 || lows.len() != n || closes.len() != n {
        return 0.0;
    }

    let trs = true_ranges(highs, lows, closes);
    let mut value = trs[..period].iter().sum::<f64>() / period as f64;
    for &tr in &trs[period..] {
        value = (value * (period as f64 - 1.0) + tr) / period as f64;
    }
    value
}

/// Directional movement system: `(adx, plus_di, minus_di)`.
///
/// Wilder's construction: smoothed +DM/−DM over smoothed TR give the
/// directional indicators, and the ADX is the smoothed DX. Needs
/// `2 * period + 1` candles; returns zeros below that or when the true
/// range vanishes (flat series).
pub fn dmi(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> (f64, f64, f64) {
    let n = highs.len();
    if period == 0 || n < 2 * period + 1 || lows.len() != n || closes.len() != n {
        return (0.0, 0.0, 0.0);
    }

    let trs = true_ranges(highs, lows, closes);
    let mut plus_dm = Vec::with_capacity(n - 1);
    let mut minus_dm = Vec::with_capacity(n - 1);
    for i in 1..n {
        let up = highs[i] - highs[i - 1];
        let down = lows[i - 1] - lows[i];
        plus_dm.push(if up > down && up > 0.0 { up } else { 0.0 });
        minus_dm.push(if down > up && down > 0.0 { down } else { 0.0 });
    }

    // Wilder accumulation: seed with the first `period` sums, then decay.
    let mut sm_tr = trs[..period].iter().sum::<f64>();
    let mut sm_plus = plus_dm[..period].iter().sum::<f64>();
    let mut sm_minus = minus_dm[..period].iter().sum::<f64>();

    let di = |sm_dm: f64, sm_tr: f64| if sm_tr > 0.0 { 100.0 * sm_dm / sm_tr } else { 0.0 };
    let dx_of = |p: f64, m: f64| {
        let total = p + m;
        if total > 0.0 { 100.0 * (p - m).abs() / total } else { 0.0 }
    };

    let mut dx_values = vec![dx_of(di(sm_plus, sm_tr), di(sm_minus, sm_tr))];
    for i in period..trs.len() {
        sm_tr = sm_tr - sm_tr / period as f64 + trs[i];
        sm_plus = sm_plus - sm_plus / period as f64 + plus_dm[i];
        sm_minus = sm_minus - sm_minus / period as f64 + minus_dm[i];
        dx_values.push(dx_of(di(sm_plus, sm_tr), di(sm_minus, sm_tr)));
    }

    // ADX: simple average of the first `period` DX values, then Wilder.
    let seed_len = period.min(dx_values.len());
    let mut adx = dx_values[..seed_len].iter().sum::<f64>() / seed_len as f64;
    for &dx in &dx_values[seed_len..] {
        adx = (adx * (period as f64 - 1.0) + dx) / period as f64;
    }

    (adx, di(sm_plus, sm_tr), di(sm_minus, sm_tr))
}

/// Volume-weighted average price over the whole snapshot.
///
/// Cumulative typical-price × volume over cumulative volume. Falls back
/// to the last close when total volume is zero.
pub fn vwap(candles: &[Candle]) -> f64 {
    let total_volume: f64 = candles.iter().map(|c| c.volume).sum();
    if total_volume <= 0.0 {
        return candles.last().map(|c| c.close).unwrap_or(0.0);
    }

    let weighted: f64 = candles
        .iter()
        .map(|c| (c.high + c.low + c.close) / 3.0 * c.volume)
        .sum();
    weighted / total_volume
}

/// Compute the full indicator bundle from a buffer snapshot.
///
/// Requires at least [`MIN_CANDLES`] candles; anything less means "skip
/// this instrument this cycle", surfaced as
/// [`SignalError::InsufficientData`].
pub fn compute(candles: &[Candle]) -> SignalResult<IndicatorBundle> {
    if candles.len() < MIN_CANDLES {
        return Err(SignalError::InsufficientData {
            have: candles.len(),
            need: MIN_CANDLES,
        });
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
    let last = candles.last().unwrap();

    let ema_20 = ema_last(&closes, 20).unwrap_or(last.close);
    let ema_50 = ema_last(&closes, 50).unwrap_or(last.close);
    // Long windows degrade to the 50-period value on short history.
    let ema_100 = ema_last(&closes, 100).unwrap_or(ema_50);
    let ema_200 = ema_last(&closes, 200).unwrap_or(ema_50);

    let (macd_line, macd_signal, macd_hist) = macd(&closes, 12, 26, 9);
    let (bb_upper, bb_middle, bb_lower) = bollinger(&closes, 20, 2.0);
    let (adx, plus_di, minus_di) = dmi(&highs, &lows, &closes, 14);

    Ok(IndicatorBundle {
        ema_20,
        ema_50,
        ema_100,
        ema_200,
        rsi: rsi(&closes, 14),
        rsi_7: rsi(&closes, 7),
        rsi_21: rsi(&closes, 21),
        macd: macd_line,
        macd_signal,
        macd_hist,
        bb_upper,
        bb_middle,
        bb_lower,
        atr: atr(&highs, &lows, &closes, 14),
        adx,
        plus_di,
        minus_di,
        volume_sma: sma_last(&volumes, 20),
        vwap: vwap(candles),
        close: last.close,
        high: last.high,
        low: last.low,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn candle(i: usize, close: f64, volume: f64) -> Candle {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Candle {
            time: base + Duration::hours(i as i64),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume,
        }
    }

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

    fn rising_series(n: usize) -> Vec<Candle> {
        (0..n).map(|i| candle(i, 100.0 + i as f64, 10.0)).collect()
    }

    #[test]
    fn test_ema_seeded_with_sma() {
        let prices: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let result = ema(&prices, 3);
        assert_relative_eq!(result[0], 2.0);
        assert_eq!(result.len(), 8);
    }

    #[test]
    fn test_ema_insufficient_window() {
        assert!(ema(&[1.0, 2.0], 5).is_empty());
        assert!(ema(&[1.0, 2.0, 3.0], 0).is_empty());
    }

    #[test]
    fn test_rsi_all_gains() {
        let prices: Vec<f64> = (1..=30).map(|i| i as f64).collect();
        assert_relative_eq!(rsi(&prices, 14), 100.0);
    }

    #[test]
    fn test_rsi_flat_is_neutral() {
        let prices = vec![100.0; 30];
        assert_relative_eq!(rsi(&prices, 14), 50.0);
    }

    #[test]
    fn test_rsi_insufficient() {
        assert_relative_eq!(rsi(&[100.0, 101.0], 14), 50.0);
    }

    #[test]
    fn test_macd_flat_is_zero() {
        let prices = vec![100.0; 60];
        let (m, s, h) = macd(&prices, 12, 26, 9);
        assert_relative_eq!(m, 0.0);
        assert_relative_eq!(s, 0.0);
        assert_relative_eq!(h, 0.0);
    }

    #[test]
    fn test_macd_rising_is_positive() {
        let prices: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();
        let (m, _, _) = macd(&prices, 12, 26, 9);
        assert!(m > 0.0);
    }

    #[test]
    fn test_bollinger_flat_collapses() {
        let prices = vec![100.0; 25];
        let (u, m, l) = bollinger(&prices, 20, 2.0);
        assert_relative_eq!(u, 100.0);
        assert_relative_eq!(m, 100.0);
        assert_relative_eq!(l, 100.0);
    }

    #[test]
    fn test_bollinger_short_history_fallback() {
        let (u, m, l) = bollinger(&[50.0, 51.0], 20, 2.0);
        assert_relative_eq!(u, 51.0);
        assert_relative_eq!(m, 51.0);
        assert_relative_eq!(l, 51.0);
    }

    #[test]
    fn test_atr_flat_is_zero() {
        let series = flat_series(30);
        let highs: Vec<f64> = series.iter().map(|c| c.high).collect();
        let lows: Vec<f64> = series.iter().map(|c| c.low).collect();
        let closes: Vec<f64> = series.iter().map(|c| c.close).collect();
        assert_relative_eq!(atr(&highs, &lows, &closes, 14), 0.0);
    }

    #[test]
    fn test_atr_mismatched_lengths() {
        assert_relative_eq!(atr(&[10.0, 11.0], &[9.0], &[10.0, 10.0], 14), 0.0);
    }

    #[test]
    fn test_dmi_rising_trend_is_strong() {
        let series = rising_series(100);
        let highs: Vec<f64> = series.iter().map(|c| c.high).collect();
        let lows: Vec<f64> = series.iter().map(|c| c.low).collect();
        let closes: Vec<f64> = series.iter().map(|c| c.close).collect();

        let (adx, plus_di, minus_di) = dmi(&highs, &lows, &closes, 14);
        assert!(adx > 25.0, "rising series should trend, got adx {}", adx);
        assert!(plus_di > minus_di);
    }

    #[test]
    fn test_dmi_flat_is_zero() {
        let series = flat_series(100);
        let highs: Vec<f64> = series.iter().map(|c| c.high).collect();
        let lows: Vec<f64> = series.iter().map(|c| c.low).collect();
        let closes: Vec<f64> = series.iter().map(|c| c.close).collect();

        let (adx, plus_di, minus_di) = dmi(&highs, &lows, &closes, 14);
        assert_relative_eq!(adx, 0.0);
        assert_relative_eq!(plus_di, 0.0);
        assert_relative_eq!(minus_di, 0.0);
    }

    #[test]
    fn test_vwap_zero_volume_falls_back_to_close() {
        let mut series = flat_series(10);
        for c in &mut series {
            c.volume = 0.0;
        }
        assert_relative_eq!(vwap(&series), 100.0);
    }

    #[test]
    fn test_vwap_flat_equals_price() {
        assert_relative_eq!(vwap(&flat_series(50)), 100.0);
    }

    #[test]
    fn test_compute_requires_min_candles() {
        let err = compute(&flat_series(49)).unwrap_err();
        match err {
            SignalError::InsufficientData { have, need } => {
                assert_eq!(have, 49);
                assert_eq!(need, 50);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_compute_long_window_fallback() {
        // 60 candles: the 100/200-period averages fall back to ema_50.
        let bundle = compute(&rising_series(60)).unwrap();
        assert_relative_eq!(bundle.ema_100, bundle.ema_50);
        assert_relative_eq!(bundle.ema_200, bundle.ema_50);

        // 500 candles: they diverge.
        let bundle = compute(&rising_series(500)).unwrap();
        assert!(bundle.ema_100 < bundle.ema_50);
        assert!(bundle.ema_200 < bundle.ema_100);
    }

    #[test]
    fn test_compute_flat_bundle() {
        let bundle = compute(&flat_series(500)).unwrap();
        assert_relative_eq!(bundle.atr, 0.0);
        assert_relative_eq!(bundle.bb_upper - bundle.bb_lower, 0.0);
        assert_relative_eq!(bundle.rsi, 50.0);
        assert_relative_eq!(bundle.vwap, 100.0);
        assert_relative_eq!(bundle.close, 100.0);
    }

    #[test]
    fn test_compute_rising_bundle() {
        let bundle = compute(&rising_series(500)).unwrap();
        assert!(bundle.ema_20 > bundle.ema_50);
        assert!(bundle.adx > 25.0);
        assert!(bundle.close > bundle.vwap);
    }
}
