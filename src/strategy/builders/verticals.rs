//! Two-leg vertical spreads.
//!
//! Pairs are enumerated low strike first, with the upper strike restricted
//! to the configured width window so the search stays linear in the number
//! of strikes per width step.

use super::{
    assemble, fmt_strike, legacy, Economics, RejectReason, Rejections, StrategyBuilder, MULTIPLIER,
};
use crate::config::PopModel;
use crate::market::{Contract, StrikeIndex};
use crate::strategy::context::BuildContext;
use crate::strategy::payoff::StockPosition;
use crate::strategy::types::{Bound, Leg, StrategyKind, StrategyResult};

/// Same-type `(lower, upper)` strike pairs whose width lies in `window`.
fn pairs<'i, 'c>(
    index: &'i StrikeIndex<'c>,
    (min_width, max_width): (f64, f64),
) -> impl Iterator<Item = (&'c Contract, &'c Contract)> + 'i {
    index.iter().flat_map(move |low| {
        index
            .within(low.strike_price + min_width, low.strike_price + max_width)
            .iter()
            .map(move |high| (low, *high))
    })
}

fn label(low: &Contract, high: &Contract) -> String {
    format!("{}/{}", fmt_strike(low.strike_price), fmt_strike(high.strike_price))
}

/// Check a net debit or credit against the spread width.
fn premium_ok(
    kind: StrategyKind,
    premium: f64,
    width: f64,
    low: &Contract,
    high: &Contract,
    rejections: &mut Rejections,
) -> bool {
    if width <= 0.0 {
        rejections.record(kind, RejectReason::BadStrikes, &label(low, high));
        return false;
    }
    if premium <= 0.0 {
        rejections.record(kind, RejectReason::NonPositivePremium, &label(low, high));
        return false;
    }
    if premium >= width {
        rejections.record(kind, RejectReason::PremiumExceedsWidth, &label(low, high));
        return false;
    }
    true
}

/// Buy the lower call, sell the upper call.
pub struct BullCallSpread;

impl StrategyBuilder for BullCallSpread {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BullCallSpread
    }

    fn candidates(&self, ctx: &BuildContext<'_>, rejections: &mut Rejections) -> Vec<StrategyResult> {
        let mut out = Vec::new();
        for (low, high) in pairs(&ctx.calls, ctx.spread_width_window()) {
            let width = high.strike_price - low.strike_price;
            let debit = low.ask - high.bid;
            if !premium_ok(self.kind(), debit, width, low, high, rejections) {
                continue;
            }

            let capital = debit * MULTIPLIER;
            let model = ctx.model(ctx.average_vol(&[low, high]));
            out.push(assemble(
                self.kind(),
                label(low, high),
                vec![Leg::long(low), Leg::short(high)],
                StockPosition::default(),
                Economics {
                    profit: Bound::Finite((width - debit) * MULTIPLIER),
                    risk: Bound::Finite(capital),
                    required_capital: capital,
                    probability: model.pop_bull_call(low.strike_price, high.strike_price, debit),
                    break_evens: vec![low.strike_price + debit],
                },
            ));
        }
        out
    }
}

/// Buy the upper put, sell the lower put.
pub struct BearPutSpread;

impl StrategyBuilder for BearPutSpread {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BearPutSpread
    }

    fn candidates(&self, ctx: &BuildContext<'_>, rejections: &mut Rejections) -> Vec<StrategyResult> {
        let mut out = Vec::new();
        for (low, high) in pairs(&ctx.puts, ctx.spread_width_window()) {
            let width = high.strike_price - low.strike_price;
            let debit = high.ask - low.bid;
            if !premium_ok(self.kind(), debit, width, low, high, rejections) {
                continue;
            }

            let probability = match ctx.engine.pop_model {
                PopModel::Analytic => ctx
                    .model(ctx.average_vol(&[low, high]))
                    .pop_bear_put(high.strike_price, low.strike_price, debit),
                PopModel::Legacy => legacy(ctx.delta(high).abs() * 100.0),
            };

            let capital = debit * MULTIPLIER;
            out.push(assemble(
                self.kind(),
                label(low, high),
                vec![Leg::long(high), Leg::short(low)],
                StockPosition::default(),
                Economics {
                    profit: Bound::Finite((width - debit) * MULTIPLIER),
                    risk: Bound::Finite(capital),
                    required_capital: capital,
                    probability,
                    break_evens: vec![high.strike_price - debit],
                },
            ));
        }
        out
    }
}

/// Sell the upper put, buy the lower put for protection.
pub struct BullPutSpread;

impl StrategyBuilder for BullPutSpread {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BullPutSpread
    }

    fn candidates(&self, ctx: &BuildContext<'_>, rejections: &mut Rejections) -> Vec<StrategyResult> {
        let mut out = Vec::new();
        for (low, high) in pairs(&ctx.puts, ctx.spread_width_window()) {
            let width = high.strike_price - low.strike_price;
            let credit = high.bid - low.ask;
            if !premium_ok(self.kind(), credit, width, low, high, rejections) {
                continue;
            }

            let probability = match ctx.engine.pop_model {
                PopModel::Analytic => ctx
                    .model(ctx.average_vol(&[low, high]))
                    .pop_bull_put(high.strike_price, credit),
                PopModel::Legacy => legacy((1.0 - ctx.delta(high).abs()) * 100.0),
            };

            let capital = width * MULTIPLIER;
            out.push(assemble(
                self.kind(),
                label(low, high),
                vec![Leg::short(high), Leg::long(low)],
                StockPosition::default(),
                Economics {
                    profit: Bound::Finite(credit * MULTIPLIER),
                    risk: Bound::Finite(capital - credit * MULTIPLIER),
                    required_capital: capital,
                    probability,
                    break_evens: vec![high.strike_price - credit],
                },
            ));
        }
        out
    }
}

/// Sell the lower call, buy the upper call for protection.
pub struct BearCallSpread;

impl StrategyBuilder for BearCallSpread {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BearCallSpread
    }

    fn candidates(&self, ctx: &BuildContext<'_>, rejections: &mut Rejections) -> Vec<StrategyResult> {
        let mut out = Vec::new();
        for (low, high) in pairs(&ctx.calls, ctx.spread_width_window()) {
            let width = high.strike_price - low.strike_price;
            let credit = low.bid - high.ask;
            if !premium_ok(self.kind(), credit, width, low, high, rejections) {
                continue;
            }

            let probability = match ctx.engine.pop_model {
                PopModel::Analytic => ctx
                    .model(ctx.average_vol(&[low, high]))
                    .pop_bear_call(low.strike_price, credit),
                PopModel::Legacy => legacy((1.0 - ctx.delta(low)) * 100.0),
            };

            let capital = width * MULTIPLIER;
            out.push(assemble(
                self.kind(),
                label(low, high),
                vec![Leg::short(low), Leg::long(high)],
                StockPosition::default(),
                Economics {
                    profit: Bound::Finite(credit * MULTIPLIER),
                    risk: Bound::Finite(capital - credit * MULTIPLIER),
                    required_capital: capital,
                    probability,
                    break_evens: vec![low.strike_price + credit],
                },
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::strategy::types::Sentiment;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    // =========================================================================
    // Debit spreads
    // =========================================================================

    #[test]
    fn test_bull_call_scenario() {
        let user = user(150.0, Sentiment::Bullish, 50.0);
        let chain = vec![call(150.0, 2.9, 3.0), call(155.0, 1.0, 1.1)];
        let (out, _) = run(&BullCallSpread, &user, &chain, None);

        assert_eq!(out.len(), 1);
        let s = &out[0];
        assert_eq!(s.name, "Bull Call Spread (150/155)");
        assert!(approx(s.required_capital, 200.0));
        assert!(approx(s.profit.finite().unwrap(), 300.0));
        assert!(approx(s.break_even, 152.0));
        assert!(s.break_even > 150.0 && s.break_even < 155.0);
        assert!(s.chance > 0.0 && s.chance < 100.0);
        assert_well_formed(s);
    }

    #[test]
    fn test_debit_at_or_above_width_is_rejected() {
        let user = user(150.0, Sentiment::Bullish, 50.0);
        let chain = vec![call(150.0, 4.0, 5.5), call(155.0, 0.4, 0.5)];
        let (out, rejections) = run(&BullCallSpread, &user, &chain, None);
        assert!(out.is_empty());
        assert_eq!(rejections.premium_exceeds_width, 1);
    }

    #[test]
    fn test_non_positive_debit_is_rejected() {
        let user = user(150.0, Sentiment::Bullish, 50.0);
        let chain = vec![call(150.0, 1.0, 1.2), call(155.0, 1.5, 1.6)];
        let (out, rejections) = run(&BullCallSpread, &user, &chain, None);
        assert!(out.is_empty());
        assert_eq!(rejections.non_positive_premium, 1);
    }

    #[test]
    fn test_pairs_outside_width_window_are_not_considered() {
        // Window is [1, 15] at spot 150
        let user = user(150.0, Sentiment::Bullish, 50.0);
        let chain = vec![call(130.0, 22.0, 22.5), call(150.0, 2.9, 3.0)];
        let (out, rejections) = run(&BullCallSpread, &user, &chain, None);
        assert!(out.is_empty());
        assert_eq!(rejections.total(), 0);
    }

    #[test]
    fn test_bear_put() {
        let user = user(150.0, Sentiment::Bearish, 50.0);
        let chain = vec![put(150.0, 1.0, 1.1), put(155.0, 3.0, 3.2)];
        let (out, _) = run(&BearPutSpread, &user, &chain, None);

        assert_eq!(out.len(), 1);
        let s = &out[0];
        assert!(approx(s.required_capital, 220.0));
        assert!(approx(s.profit.finite().unwrap(), 280.0));
        assert!(approx(s.break_even, 152.8));
        assert!(s.break_even > 150.0 && s.break_even < 155.0);
        assert_well_formed(s);
    }

    // =========================================================================
    // Credit spreads
    // =========================================================================

    #[test]
    fn test_bull_put() {
        let user = user(150.0, Sentiment::Bullish, 50.0);
        let chain = vec![put(150.0, 1.0, 1.1), put(155.0, 3.0, 3.2)];
        let (out, _) = run(&BullPutSpread, &user, &chain, None);

        let s = &out[0];
        assert!(approx(s.required_capital, 500.0));
        assert!(approx(s.profit.finite().unwrap(), 190.0));
        assert!(approx(s.risk.finite().unwrap(), 310.0));
        assert!(approx(s.break_even, 153.1));
        assert_well_formed(s);
    }

    #[test]
    fn test_bear_call() {
        let user = user(150.0, Sentiment::Bearish, 50.0);
        let chain = vec![call(150.0, 2.9, 3.0), call(155.0, 1.0, 1.1)];
        let (out, _) = run(&BearCallSpread, &user, &chain, None);

        let s = &out[0];
        assert!(approx(s.required_capital, 500.0));
        assert!(approx(s.profit.finite().unwrap(), 180.0));
        assert!(approx(s.risk.finite().unwrap(), 320.0));
        assert!(approx(s.break_even, 151.8));
        assert_eq!(s.legs[0].side, crate::strategy::types::Side::Short);
        assert_well_formed(s);
    }

    #[test]
    fn test_every_pair_in_window_is_enumerated() {
        let user = user(150.0, Sentiment::Bullish, 50.0);
        let chain = vec![
            call(145.0, 6.0, 6.2),
            call(150.0, 2.9, 3.0),
            call(155.0, 1.0, 1.1),
        ];
        let (out, _) = run(&BullCallSpread, &user, &chain, None);
        // 145/150, 145/155, 150/155
        assert_eq!(out.len(), 3);
        for s in &out {
            let strikes: Vec<f64> = s.contracts().map(|c| c.strike_price).collect();
            assert!(s.break_even > strikes[0] && s.break_even < strikes[1]);
        }
    }
}
