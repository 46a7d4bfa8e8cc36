//! Weighted multi-factor signal scoring
//!
//! Five independently computed dimensions (trend, momentum, volatility,
//! volume, structure) each produce one [`Factor`]; the weighted sum is
//! clamped to [-100, 100] and mapped to a [`SignalClass`]. Regime
//! classification is a separate decision tree over ADX, the trend factor
//! and RSI extremity.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{SignalError, SignalResult};
use crate::types::{Candle, Factor, IndicatorBundle, MarketRegime, Signal, SignalClass};

/// Tolerance for the weight-sum invariant
const WEIGHT_SUM_EPSILON: f64 = 1e-9;

/// Per-dimension weight table
///
/// Weights must sum to 1.0; construction fails otherwise. This is
/// process-wide read-only configuration, loadable from YAML the same way
/// risk policies are elsewhere in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub trend: f64,
    pub momentum: f64,
    pub volatility: f64,
    pub volume: f64,
    pub structure: f64,
}

impl ScoreWeights {
    /// Create a weight table, enforcing the sum-to-one invariant
    pub fn new(
        trend: f64,
        momentum: f64,
        volatility: f64,
        volume: f64,
        structure: f64,
    ) -> SignalResult<Self> {
        let weights = Self {
            trend,
            momentum,
            volatility,
            volume,
            structure,
        };
        weights.validate()?;
        Ok(weights)
    }

    /// Load a weight table from a YAML string
    ///
    /// # Example
    ///
    /// ```
    /// use qk_signals::ScoreWeights;
    ///
    /// let yaml = r#"
    /// trend: 0.30
    /// momentum: 0.25
    /// volatility: 0.15
    /// volume: 0.15
    /// structure: 0.15
    /// "#;
    ///
    /// let weights = ScoreWeights::from_yaml(yaml).unwrap();
    /// assert_eq!(weights, ScoreWeights::default());
    /// ```
    pub fn from_yaml(yaml: &str) -> SignalResult<Self> {
        let weights: Self = serde_yaml::from_str(yaml)?;
        weights.validate()?;
        Ok(weights)
    }

    fn sum(&self) -> f64 {
        self.trend + self.momentum + self.volatility + self.volume + self.structure
    }

    fn validate(&self) -> SignalResult<()> {
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(SignalError::InvalidWeights { sum });
        }
        Ok(())
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            trend: 0.30,
            momentum: 0.25,
            volatility: 0.15,
            volume: 0.15,
            structure: 0.15,
        }
    }
}

/// Multi-factor signal scorer
#[derive(Debug, Clone)]
pub struct SignalScorer {
    weights: ScoreWeights,
}

impl Default for SignalScorer {
    fn default() -> Self {
        Self::new(ScoreWeights::default())
    }
}

impl SignalScorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Score a snapshot: returns the signal, the five factors and the
    /// detected regime.
    ///
    /// The snapshot provides the latest two closes and the latest volume;
    /// all other inputs come from the precomputed bundle.
    pub fn score(
        &self,
        snapshot: &[Candle],
        bundle: &IndicatorBundle,
    ) -> (Signal, Vec<Factor>, MarketRegime) {
        let close = bundle.close;
        let prev_close = if snapshot.len() >= 2 {
            snapshot[snapshot.len() - 2].close
        } else {
            close
        };
        let current_volume = snapshot.last().map(|c| c.volume).unwrap_or(0.0);

        let trend = self.trend_factor(bundle, close);
        let momentum = self.momentum_factor(bundle);
        let volatility = self.volatility_factor(bundle, close);
        let volume = self.volume_factor(bundle, close, prev_close, current_volume);
        let structure = self.structure_factor(bundle, close);

        let weighted = trend.impact as f64 * self.weights.trend
            + momentum.impact as f64 * self.weights.momentum
            + volatility.impact as f64 * self.weights.volatility
            + volume.impact as f64 * self.weights.volume
            + structure.impact as f64 * self.weights.structure;
        let score = weighted.clamp(-100.0, 100.0).round() as i32;

        let class = SignalClass::from_score(score);
        let factors = vec![trend, momentum, volatility, volume, structure];

        let confidence = confidence_for(&factors, score);
        let regime = detect_regime(bundle, factors[0].impact);

        let signal = Signal {
            class,
            score,
            confidence,
            label: class.label().to_string(),
            timestamp: Utc::now(),
        };

        (signal, factors, regime)
    }

    /// Trend: EMA crossover plus ADX strength bonus, range [-60, 60]
    fn trend_factor(&self, b: &IndicatorBundle, close: f64) -> Factor {
        let mut score;
        let mut desc;
        if b.ema_20 > b.ema_50 {
            score = 40;
            desc = String::from("Strong uptrend: EMA20 > EMA50");
            if b.adx > 30.0 {
                score += 20;
                desc.push_str(", ADX confirms strength");
            }
        } else if b.ema_20 < b.ema_50 {
            score = -40;
            desc = String::from("Strong downtrend: EMA20 < EMA50");
            if b.adx > 30.0 {
                score -= 20;
                desc.push_str(", ADX confirms strength");
            }
        } else if b.adx > 25.0 {
            score = if close > b.ema_50 { 20 } else { -20 };
            desc = String::from("Moderate trend with ADX confirmation");
        } else {
            score = if close > b.ema_50 { 10 } else { -10 };
            desc = String::from("Weak trend signal");
        }

        desc.push_str(&format!(" (ADX: {:.1})", b.adx));
        Factor::new("Trend Strength", score, desc)
    }

    /// Momentum: RSI bands plus MACD crossover confirmation
    fn momentum_factor(&self, b: &IndicatorBundle) -> Factor {
        let (mut score, mut desc) = if b.rsi > 70.0 {
            (-20, String::from("RSI overbought (>70)"))
        } else if b.rsi > 60.0 {
            (15, String::from("RSI bullish momentum (60-70)"))
        } else if b.rsi > 50.0 {
            (25, String::from("RSI strong bullish (50-60)"))
        } else if b.rsi > 40.0 {
            (-15, String::from("RSI weak bearish (40-50)"))
        } else if b.rsi < 30.0 {
            (20, String::from("RSI oversold (<30)"))
        } else {
            (-25, String::from("RSI strong bearish (<40)"))
        };

        if b.macd > b.macd_signal {
            score += 20;
            desc.push_str(", MACD bullish");
        } else {
            score -= 20;
            desc.push_str(", MACD bearish");
        }

        desc.push_str(&format!(" (RSI: {:.1})", b.rsi));
        Factor::new("Momentum", score, desc)
    }

    /// Volatility: position of price within the Bollinger band
    fn volatility_factor(&self, b: &IndicatorBundle, close: f64) -> Factor {
        let bb_range = b.bb_upper - b.bb_lower;
        let bb_position = if bb_range > 0.0 {
            (close - b.bb_lower) / bb_range
        } else {
            0.5
        };
        let atr_pct = if close > 0.0 { b.atr / close * 100.0 } else { 0.0 };

        let (score, desc) = if bb_position > 0.85 {
            (-25, "Price at upper BB, exhaustion likely")
        } else if bb_position > 0.7 {
            (-10, "Price in upper BB zone")
        } else if bb_position < 0.15 {
            (25, "Price at lower BB, bounce potential")
        } else if bb_position < 0.3 {
            (10, "Price in lower BB zone")
        } else {
            (5, "Price in BB midzone")
        };

        let desc = format!("{} ({:.0}%), ATR: {:.2}%", desc, bb_position * 100.0, atr_pct);
        Factor::new("Volatility Position", score, desc)
    }

    /// Volume: ratio to the 20-period average, sign flipped by the price
    /// direction versus the previous close
    fn volume_factor(
        &self,
        b: &IndicatorBundle,
        close: f64,
        prev_close: f64,
        current_volume: f64,
    ) -> Factor {
        let ratio = if b.volume_sma > 0.0 {
            current_volume / b.volume_sma
        } else {
            1.0
        };
        let up = close > prev_close;

        let (score, desc) = if ratio > 1.8 {
            (if up { 30 } else { -30 }, format!("Explosive volume {:.2}x", ratio))
        } else if ratio > 1.5 {
            (if up { 20 } else { -20 }, format!("Strong volume {:.2}x", ratio))
        } else if ratio > 1.1 {
            (if up { 10 } else { -10 }, format!("Above average volume {:.2}x", ratio))
        } else {
            (-5, format!("Low volume {:.2}x", ratio))
        };

        let move_strength = if b.atr > 0.0 {
            (close - prev_close).abs() / b.atr
        } else {
            0.0
        };
        let desc = if move_strength > 1.0 {
            format!("{}, strong move confirmation", desc)
        } else {
            desc
        };

        Factor::new("Volume Confirmation", score, desc)
    }

    /// Structure: price relative to VWAP and the band midline
    fn structure_factor(&self, b: &IndicatorBundle, close: f64) -> Factor {
        let to_vwap_pct = if b.vwap > 0.0 {
            (close - b.vwap) / b.vwap * 100.0
        } else {
            0.0
        };

        let (score, desc) = if close > b.vwap && close > b.bb_middle {
            (30, String::from("Above VWAP and BB middle, strong structure"))
        } else if close > b.vwap {
            (15, format!("Above VWAP (+{:.2}%)", to_vwap_pct))
        } else if close < b.vwap && close < b.bb_middle {
            (-30, String::from("Below VWAP and BB middle, weak structure"))
        } else {
            (-15, format!("Below VWAP ({:.2}%)", to_vwap_pct))
        };

        Factor::new("Market Structure", score, desc)
    }
}

/// Confidence from factor agreement: 50 + 50 × (majority fraction),
/// +15 (capped at 100) when the absolute score exceeds 60
fn confidence_for(factors: &[Factor], score: i32) -> i32 {
    let bullish = factors.iter().filter(|f| f.impact > 0).count();
    let bearish = factors.iter().filter(|f| f.impact < 0).count();
    let agreement = bullish.max(bearish) as f64 / factors.len() as f64;

    let confidence = (50.0 + agreement * 50.0) as i32;
    if score.abs() > 60 {
        (confidence + 15).min(100)
    } else {
        confidence
    }
}

/// Regime decision tree, evaluated in priority order: strongly trending,
/// moderate-trend breakout, ranging, reversal, default breakout
fn detect_regime(b: &IndicatorBundle, trend_impact: i32) -> MarketRegime {
    if b.adx > 35.0 {
        if trend_impact > 30 {
            return MarketRegime::TrendingUp;
        }
        if trend_impact < -30 {
            return MarketRegime::TrendingDown;
        }
    } else if b.adx > 20.0 && trend_impact.abs() > 20 {
        return MarketRegime::Breakout;
    }

    if b.adx < 20.0 {
        return MarketRegime::Ranging;
    }
    if (b.rsi - 50.0).abs() > 35.0 {
        return MarketRegime::Reversal;
    }
    MarketRegime::Breakout
}
