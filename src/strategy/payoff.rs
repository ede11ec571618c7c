//! Expiry payoff of a set of legs.

use super::types::{Leg, PayoffPoint, Side};
use crate::market::OptionType;

const CONTRACT_MULTIPLIER: f64 = 100.0;

/// Optional stock position held with the options (e.g. covered call).
#[derive(Debug, Clone, Copy, Default)]
pub struct StockPosition {
    pub shares: u32,
    pub entry_price: f64,
}

/// Profit in dollars at expiry if the underlying settles at `price`.
pub fn payoff_at(legs: &[Leg], stock: StockPosition, price: f64) -> f64 {
    let options: f64 = legs
        .iter()
        .map(|leg| {
            let k = leg.contract.strike_price;
            let intrinsic = match leg.contract.option_type {
                OptionType::Call => (price - k).max(0.0),
                OptionType::Put => (k - price).max(0.0),
            };
            let per_share = match leg.side {
                Side::Long => intrinsic - leg.premium(),
                Side::Short => leg.premium() - intrinsic,
            };
            per_share * CONTRACT_MULTIPLIER
        })
        .sum();
    options + (price - stock.entry_price) * f64::from(stock.shares)
}

/// Piecewise-linear payoff polyline.
///
/// Vertices sit at every strike and breakeven (and the stock entry, if any)
/// plus one padding vertex on each side, sorted ascending without duplicates.
pub fn payoff_curve(legs: &[Leg], stock: StockPosition, break_evens: &[f64]) -> Vec<PayoffPoint> {
    let mut prices: Vec<f64> = legs
        .iter()
        .map(|l| l.contract.strike_price)
        .chain(break_evens.iter().copied())
        .filter(|p| p.is_finite())
        .collect();
    if stock.shares > 0 {
        prices.push(stock.entry_price);
    }
    if prices.is_empty() {
        return Vec::new();
    }

    let lo = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let pad = (0.25 * (hi - lo)).max(0.05 * hi.abs()).max(1.0);
    prices.push((lo - pad).max(0.0));
    prices.push(hi + pad);

    prices.sort_by(|a, b| a.total_cmp(b));
    prices.dedup_by(|a, b| (*a - *b).abs() < 1e-9);

    prices
        .into_iter()
        .map(|price| PayoffPoint {
            price,
            profit: payoff_at(legs, stock, price),
        })
        .collect()
}

/// Profit at the curve vertex nearest to `target`.
pub fn profit_near(points: &[PayoffPoint], target: f64) -> Option<f64> {
    points
        .iter()
        .min_by(|a, b| (a.price - target).abs().total_cmp(&(b.price - target).abs()))
        .map(|p| p.profit)
}
