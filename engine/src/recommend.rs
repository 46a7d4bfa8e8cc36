//! Human-readable trade recommendations

use qk_risk::RiskProfile;
use qk_signals::{IndicatorBundle, Signal};

/// Compose a one-line recommendation from the signal and risk profile.
///
/// Buy-family signals suggest a limit long half an ATR below price,
/// sell-family a limit short half an ATR above, both with the stop at
/// the risk profile's distance and the target at twice that. Neutral
/// signals point at the Bollinger band breakout levels.
pub fn recommendation(
    signal: &Signal,
    risk: &RiskProfile,
    bundle: &IndicatorBundle,
    current_price: f64,
) -> String {
    let size_pct = (risk.recommended_position_size * 100.0) as i32;

    if signal.class.is_buy_family() {
        let entry = current_price - bundle.atr * 0.5;
        let stop = entry - risk.stop_loss_distance;
        let target = entry + risk.stop_loss_distance * 2.0;
        format!(
            "Consider LONG at ${:.2} (limit order). Stop loss ${:.2} ({:.2} below). \
             Target ${:.2} (1:2 RRR). Use {}% of normal size due to {} volatility.",
            entry, stop, risk.stop_loss_distance, target, size_pct, risk.volatility
        )
    } else if signal.class.is_sell_family() {
        let entry = current_price + bundle.atr * 0.5;
        let stop = entry + risk.stop_loss_distance;
        let target = entry - risk.stop_loss_distance * 2.0;
        format!(
            "Consider SHORT at ${:.2} (limit order). Stop loss ${:.2} ({:.2} above). \
             Target ${:.2} (1:2 RRR). Use {}% of normal size due to {} volatility.",
            entry, stop, risk.stop_loss_distance, target, size_pct, risk.volatility
        )
    } else {
        format!(
            "Market in consolidation phase. Best to wait for clear breakout above ${:.2} \
             or below ${:.2}.",
            bundle.bb_upper, bundle.bb_lower
        )
    }
}
