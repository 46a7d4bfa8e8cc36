//! Volatility classification and position sizing

use serde::{Deserialize, Serialize};
use std::fmt;

use qk_signals::{IndicatorBundle, Signal};

/// Four ordered volatility tiers by ATR as a percentage of price
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityTier {
    Low,
    Normal,
    High,
    Extreme,
}

impl VolatilityTier {
    /// Classify an ATR percentage: <1.0 low, <2.5 normal, <4.0 high,
    /// else extreme
    pub fn from_atr_percent(atr_percent: f64) -> Self {
        if atr_percent < 1.0 {
            VolatilityTier::Low
        } else if atr_percent < 2.5 {
            VolatilityTier::Normal
        } else if atr_percent < 4.0 {
            VolatilityTier::High
        } else {
            VolatilityTier::Extreme
        }
    }

    /// Base position-size fraction before confidence scaling
    pub fn base_position_size(&self) -> f64 {
        match self {
            VolatilityTier::Low => 1.0,
            VolatilityTier::Normal => 0.8,
            VolatilityTier::High => 0.5,
            VolatilityTier::Extreme => 0.25,
        }
    }
}

impl fmt::Display for VolatilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VolatilityTier::Low => "low",
            VolatilityTier::Normal => "normal",
            VolatilityTier::High => "high",
            VolatilityTier::Extreme => "extreme",
        };
        write!(f, "{}", s)
    }
}

/// Position-risk recommendation for one instrument and cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    /// Volatility tier
    pub volatility: VolatilityTier,
    /// ATR as a percentage of the latest close
    pub atr_percent: f64,
    /// Recommended fraction of normal position size, in [0, 1]
    pub recommended_position_size: f64,
    /// Stop-loss distance in price units (2 × ATR)
    pub stop_loss_distance: f64,
}

/// Maps an indicator bundle and signal to a risk profile
#[derive(Debug, Clone, Default)]
pub struct RiskSizer;

impl RiskSizer {
    /// Stop distance multiplier over ATR
    pub const STOP_ATR_MULTIPLE: f64 = 2.0;

    /// Compute the risk profile.
    ///
    /// Size starts from the tier base, scales by confidence/100, and is
    /// halved again below 60 confidence (multiplicative: normal
    /// volatility at confidence 55 yields 0.8 × 0.55 × 0.5).
    pub fn size(&self, bundle: &IndicatorBundle, signal: &Signal) -> RiskProfile {
        let atr_percent = if bundle.close > 0.0 {
            bundle.atr / bundle.close * 100.0
        } else {
            0.0
        };

        let volatility = VolatilityTier::from_atr_percent(atr_percent);
        let mut position_size = volatility.base_position_size();

        position_size *= signal.confidence.clamp(0, 100) as f64 / 100.0;
        if signal.confidence < 60 {
            position_size *= 0.5;
        }

        RiskProfile {
            volatility,
            atr_percent,
            recommended_position_size: round2(position_size.clamp(0.0, 1.0)),
            stop_loss_distance: round2(bundle.atr * Self::STOP_ATR_MULTIPLE),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
