//! Single-option shapes: long call, long put, short call, short put.

use super::{
    assemble, fmt_strike, legacy, naked_margin, Economics, RejectReason, Rejections,
    StrategyBuilder, MULTIPLIER,
};
use crate::config::PopModel;
use crate::strategy::context::BuildContext;
use crate::strategy::payoff::StockPosition;
use crate::strategy::types::{Bound, Leg, StrategyKind, StrategyResult};

/// Buy a call. Reward is capped at the profit-target move above spot.
pub struct LongCall;

impl StrategyBuilder for LongCall {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LongCall
    }

    fn candidates(&self, ctx: &BuildContext<'_>, rejections: &mut Rejections) -> Vec<StrategyResult> {
        let mut out = Vec::new();
        for call in ctx.calls.iter() {
            let premium = call.ask;
            if premium <= 0.0 {
                rejections.record(self.kind(), RejectReason::NonPositivePremium, &call.symbol);
                continue;
            }

            let vol = ctx.contract_vol(call);
            let capital = premium * MULTIPLIER;
            let break_even = call.strike_price + premium;
            let target = ctx.spot * (1.0 + ctx.engine.profit_target_sd * vol * ctx.time_years.sqrt());

            out.push(assemble(
                self.kind(),
                fmt_strike(call.strike_price),
                vec![Leg::long(call)],
                StockPosition::default(),
                Economics {
                    profit: Bound::Finite((target - break_even).max(0.0) * MULTIPLIER),
                    risk: Bound::Finite(capital),
                    required_capital: capital,
                    probability: ctx.model(vol).pop_long_call(call.strike_price, premium),
                    break_evens: vec![break_even],
                },
            ));
        }
        out
    }
}

/// Buy a put. Reward is capped at the profit-target move below spot.
pub struct LongPut;

impl StrategyBuilder for LongPut {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LongPut
    }

    fn candidates(&self, ctx: &BuildContext<'_>, rejections: &mut Rejections) -> Vec<StrategyResult> {
        let mut out = Vec::new();
        for put in ctx.puts.iter() {
            let premium = put.ask;
            if premium <= 0.0 {
                rejections.record(self.kind(), RejectReason::NonPositivePremium, &put.symbol);
                continue;
            }

            let vol = ctx.contract_vol(put);
            let capital = premium * MULTIPLIER;
            let break_even = put.strike_price - premium;
            let target =
                (ctx.spot * (1.0 - ctx.engine.profit_target_sd * vol * ctx.time_years.sqrt())).max(0.0);

            out.push(assemble(
                self.kind(),
                fmt_strike(put.strike_price),
                vec![Leg::long(put)],
                StockPosition::default(),
                Economics {
                    profit: Bound::Finite((break_even - target).max(0.0) * MULTIPLIER),
                    risk: Bound::Finite(capital),
                    required_capital: capital,
                    probability: ctx.model(vol).pop_long_put(put.strike_price, premium),
                    break_evens: vec![break_even],
                },
            ));
        }
        out
    }
}

/// Sell an out-of-the-money call naked.
pub struct ShortCall;

impl StrategyBuilder for ShortCall {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ShortCall
    }

    fn candidates(&self, ctx: &BuildContext<'_>, rejections: &mut Rejections) -> Vec<StrategyResult> {
        let mut out = Vec::new();
        for call in ctx.calls.iter().filter(|c| c.strike_price > ctx.spot) {
            let credit = call.bid;
            if credit <= 0.0 {
                rejections.record(self.kind(), RejectReason::NonPositivePremium, &call.symbol);
                continue;
            }

            let probability = match ctx.engine.pop_model {
                PopModel::Analytic => ctx
                    .model(ctx.contract_vol(call))
                    .pop_short_call(call.strike_price, credit),
                PopModel::Legacy => legacy((1.0 - ctx.delta(call)) * 100.0),
            };

            out.push(assemble(
                self.kind(),
                fmt_strike(call.strike_price),
                vec![Leg::short(call)],
                StockPosition::default(),
                Economics {
                    profit: Bound::Finite(credit * MULTIPLIER),
                    risk: Bound::Unbounded,
                    required_capital: naked_margin(ctx.spot, call.strike_price - ctx.spot, credit),
                    probability,
                    break_evens: vec![call.strike_price + credit],
                },
            ));
        }
        out
    }
}

/// Sell a put naked. Very unlikely winners are not offered.
pub struct ShortPut;

impl StrategyBuilder for ShortPut {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ShortPut
    }

    fn candidates(&self, ctx: &BuildContext<'_>, rejections: &mut Rejections) -> Vec<StrategyResult> {
        let mut out = Vec::new();
        for put in ctx.puts.iter() {
            let credit = put.bid;
            if credit <= 0.0 {
                rejections.record(self.kind(), RejectReason::NonPositivePremium, &put.symbol);
                continue;
            }

            let probability = ctx
                .model(ctx.contract_vol(put))
                .pop_short_put(put.strike_price, credit);
            if crate::math::pop_percent(probability) < ctx.engine.min_short_put_pop {
                rejections.record(self.kind(), RejectReason::LowProbability, &put.symbol);
                continue;
            }

            out.push(assemble(
                self.kind(),
                fmt_strike(put.strike_price),
                vec![Leg::short(put)],
                StockPosition::default(),
                Economics {
                    profit: Bound::Finite(credit * MULTIPLIER),
                    risk: Bound::Finite(((put.strike_price - credit) * MULTIPLIER).max(0.0)),
                    required_capital: naked_margin(ctx.spot, ctx.spot - put.strike_price, credit),
                    probability,
                    break_evens: vec![put.strike_price - credit],
                },
            ));
        }
        out
    }
}
