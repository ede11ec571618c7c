//! One-standard-deviation move and sentiment-derived price targets.

use super::DAYS_PER_YEAR;

/// Expected one-sigma dollar move by expiry: `S0 * iv * sqrt(dte / 365)`.
///
/// Returns 0 when any input is not positive.
pub fn implied_move(spot: f64, atm_iv: f64, days_to_expiry: f64) -> f64 {
    if !(spot > 0.0 && atm_iv > 0.0 && days_to_expiry > 0.0) {
        return 0.0;
    }
    spot * atm_iv * (days_to_expiry / DAYS_PER_YEAR).sqrt()
}

/// Spot shifted by `multiple` implied moves (negative shifts down).
pub fn target_price(current_price: f64, implied_move: f64, multiple: f64) -> f64 {
    current_price + multiple * implied_move
}
