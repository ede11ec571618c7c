//! Income shapes: covered call and cash-secured put.
//!
//! Both walk the out-of-the-money contracts in order of closeness to a
//! slider-driven target delta and stop at the first one that fits the budget.

use super::{
    assemble, fmt_strike, legacy, Economics, RejectReason, Rejections, StrategyBuilder, MULTIPLIER,
};
use crate::config::PopModel;
use crate::market::Contract;
use crate::strategy::context::BuildContext;
use crate::strategy::payoff::StockPosition;
use crate::strategy::types::{Bound, Leg, StrategyKind, StrategyResult};

/// Shares per covered contract.
const ROUND_LOT: u32 = 100;

/// Contracts ordered by distance of their delta from `target`.
fn by_delta<'c>(
    ctx: &BuildContext<'c>,
    contracts: impl Iterator<Item = &'c Contract>,
    target: f64,
) -> Vec<&'c Contract> {
    let mut ranked: Vec<(&'c Contract, f64)> = contracts
        .map(|c| (c, (ctx.delta(c) - target).abs()))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked.into_iter().map(|(c, _)| c).collect()
}

/// Own 100 shares and sell an out-of-the-money call against them.
pub struct CoveredCall;

impl StrategyBuilder for CoveredCall {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CoveredCall
    }

    fn candidates(&self, ctx: &BuildContext<'_>, rejections: &mut Rejections) -> Vec<StrategyResult> {
        let target = (0.40 - 0.30 * ctx.a()).clamp(0.10, 0.70);
        let otm = ctx
            .calls
            .iter()
            .filter(|c| c.strike_price > ctx.spot && c.bid > 0.0);

        for call in by_delta(ctx, otm, target) {
            let capital = ctx.spot * f64::from(ROUND_LOT);
            if !ctx.within_budget(capital) {
                rejections.record(self.kind(), RejectReason::OverBudget, &call.symbol);
                continue;
            }

            let premium = call.bid;
            let break_even = ctx.spot - premium;
            let probability = match ctx.engine.pop_model {
                PopModel::Analytic => ctx.model(ctx.contract_vol(call)).right_tail(break_even),
                PopModel::Legacy => legacy((1.0 - ctx.delta(call)) * 100.0),
            };

            return vec![assemble(
                self.kind(),
                fmt_strike(call.strike_price),
                vec![Leg::short(call)],
                StockPosition {
                    shares: ROUND_LOT,
                    entry_price: ctx.spot,
                },
                Economics {
                    profit: Bound::Finite((call.strike_price - ctx.spot + premium) * MULTIPLIER),
                    risk: Bound::Finite(break_even.max(0.0) * MULTIPLIER),
                    required_capital: capital,
                    probability,
                    break_evens: vec![break_even],
                },
            )];
        }
        Vec::new()
    }
}

/// Sell an out-of-the-money put with cash set aside for assignment.
pub struct CashSecuredPut;

impl StrategyBuilder for CashSecuredPut {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CashSecuredPut
    }

    fn candidates(&self, ctx: &BuildContext<'_>, rejections: &mut Rejections) -> Vec<StrategyResult> {
        let target = (-0.40 + 0.30 * ctx.a()).clamp(-0.70, -0.10);
        let otm = ctx
            .puts
            .iter()
            .filter(|p| p.strike_price < ctx.spot && p.bid > 0.0);

        for put in by_delta(ctx, otm, target) {
            let capital = put.strike_price * MULTIPLIER;
            if !ctx.within_budget(capital) {
                rejections.record(self.kind(), RejectReason::OverBudget, &put.symbol);
                continue;
            }

            let premium = put.bid;
            let probability = match ctx.engine.pop_model {
                PopModel::Analytic => ctx
                    .model(ctx.contract_vol(put))
                    .pop_short_put(put.strike_price, premium),
                PopModel::Legacy => legacy((1.0 - ctx.delta(put).abs()) * 100.0),
            };

            return vec![assemble(
                self.kind(),
                fmt_strike(put.strike_price),
                vec![Leg::short(put)],
                StockPosition::default(),
                Economics {
                    profit: Bound::Finite(premium * MULTIPLIER),
                    risk: Bound::Finite((put.strike_price - premium).max(0.0) * MULTIPLIER),
                    required_capital: capital,
                    probability,
                    break_evens: vec![put.strike_price - premium],
                },
            )];
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::strategy::payoff::payoff_at;
    use crate::strategy::types::Sentiment;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn call_chain() -> Vec<Contract> {
        vec![
            call(95.0, 6.0, 6.2).with_delta(0.70),
            call(105.0, 1.5, 1.6).with_delta(0.30),
            call(110.0, 0.6, 0.7).with_delta(0.15),
        ]
    }

    fn put_chain() -> Vec<Contract> {
        vec![
            put(90.0, 0.5, 0.6).with_delta(-0.12),
            put(95.0, 1.2, 1.3).with_delta(-0.28),
            put(105.0, 6.0, 6.2).with_delta(-0.70),
        ]
    }

    #[test]
    fn test_covered_call_picks_closest_delta() {
        // Slider 50: target delta 0.25
        let user = user(100.0, Sentiment::Bullish, 50.0);
        let (out, _) = run(&CoveredCall, &user, &call_chain(), None);

        assert_eq!(out.len(), 1);
        let s = &out[0];
        assert_eq!(s.name, "Covered Call (105)");
        assert_eq!(s.underlying_shares, 100);
        assert!(approx(s.required_capital, 10_000.0));
        assert!(approx(s.profit.finite().unwrap(), 650.0));
        assert!(approx(s.risk.finite().unwrap(), 9_850.0));
        assert!(approx(s.break_even, 98.5));
        assert_well_formed(s);

        let legs = &s.legs;
        let stock = StockPosition {
            shares: 100,
            entry_price: 100.0,
        };
        assert!(payoff_at(legs, stock, 98.5).abs() < 1e-6);
        assert!(approx(payoff_at(legs, stock, 120.0), 650.0));
    }

    #[test]
    fn test_covered_call_over_budget() {
        let mut user = user(100.0, Sentiment::Bullish, 50.0);
        user.budget = "$5,000".to_string();
        let (out, rejections) = run(&CoveredCall, &user, &call_chain(), None);
        assert!(out.is_empty());
        assert_eq!(rejections.over_budget, 2);
    }

    #[test]
    fn test_cash_secured_put() {
        let user = user(100.0, Sentiment::Bullish, 50.0);
        let (out, _) = run(&CashSecuredPut, &user, &put_chain(), None);

        let s = &out[0];
        assert_eq!(s.name, "Cash-Secured Put (95)");
        assert!(approx(s.required_capital, 9_500.0));
        assert!(approx(s.profit.finite().unwrap(), 120.0));
        assert!(approx(s.risk.finite().unwrap(), 9_380.0));
        assert!(approx(s.break_even, 93.8));
        assert_well_formed(s);
    }

    #[test]
    fn test_cash_secured_put_falls_back_within_budget() {
        let mut user = user(100.0, Sentiment::Bullish, 50.0);
        user.budget = "$9,000".to_string();
        let (out, rejections) = run(&CashSecuredPut, &user, &put_chain(), None);

        assert_eq!(out[0].name, "Cash-Secured Put (90)");
        assert_eq!(rejections.over_budget, 1);
    }
}
