//! Straddles and strangles, long and short.

use super::{
    assemble, fmt_strike, legacy, naked_margin, Economics, RejectReason, Rejections,
    StrategyBuilder, MULTIPLIER,
};
use crate::config::PopModel;
use crate::market::Contract;
use crate::strategy::context::BuildContext;
use crate::strategy::payoff::StockPosition;
use crate::strategy::types::{Bound, Leg, StrategyKind, StrategyResult};
use crate::utils::round_penny;

fn label(put: &Contract, call: &Contract) -> String {
    format!("{}/{}", fmt_strike(put.strike_price), fmt_strike(call.strike_price))
}

/// Distance of strangle strikes from spot for the current slider.
fn strangle_gap(ctx: &BuildContext<'_>, sigma: f64) -> f64 {
    sigma * (0.5 + 2.0 * ctx.a())
}

/// Long call plus long put: debit, unbounded reward.
fn long_economics(
    ctx: &BuildContext<'_>,
    put: &Contract,
    call: &Contract,
    legacy_percent: f64,
) -> Economics {
    let debit = put.ask + call.ask;
    let low = put.strike_price.min(call.strike_price);
    let high = put.strike_price.max(call.strike_price);
    let probability = match ctx.engine.pop_model {
        PopModel::Analytic => ctx
            .sigma_model()
            .map_or(f64::NAN, |m| m.pop_long_strangle(low, high, debit)),
        PopModel::Legacy => legacy(legacy_percent),
    };
    Economics {
        profit: Bound::Unbounded,
        risk: Bound::Finite(debit * MULTIPLIER),
        required_capital: debit * MULTIPLIER,
        probability,
        break_evens: vec![low - debit, high + debit],
    }
}

/// Naked margin of the riskier side plus the other side's premium.
fn short_pair_margin(spot: f64, put: &Contract, call: &Contract) -> f64 {
    let call_req = naked_margin(spot, call.strike_price - spot, call.bid);
    let put_req = naked_margin(spot, spot - put.strike_price, put.bid);
    if call_req >= put_req {
        call_req + put.bid * MULTIPLIER
    } else {
        put_req + call.bid * MULTIPLIER
    }
}

/// Long call and long put at (nearly) the same strike, centred on spot.
pub struct Straddle;

impl StrategyBuilder for Straddle {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Straddle
    }

    fn requires_sigma(&self) -> bool {
        true
    }

    fn candidates(&self, ctx: &BuildContext<'_>, rejections: &mut Rejections) -> Vec<StrategyResult> {
        let Some(sigma) = ctx.sigma else {
            return Vec::new();
        };
        let tolerance = ctx.engine.straddle_strike_tolerance_pct * ctx.spot;

        let mut out = Vec::new();
        for call in ctx.calls.within(ctx.spot - sigma, ctx.spot + sigma) {
            for put in ctx
                .puts
                .within(call.strike_price - tolerance, call.strike_price + tolerance)
            {
                let centre = (call.strike_price + put.strike_price) / 2.0;
                if (centre - ctx.spot).abs() > sigma {
                    continue;
                }
                if put.ask + call.ask <= 0.0 {
                    rejections.record(self.kind(), RejectReason::NonPositivePremium, &label(put, call));
                    continue;
                }
                out.push(assemble(
                    self.kind(),
                    label(put, call),
                    vec![Leg::long(call), Leg::long(put)],
                    StockPosition::default(),
                    long_economics(ctx, put, call, 30.0),
                ));
            }
        }
        out
    }
}

/// Long out-of-the-money put and call either side of spot.
pub struct Strangle;

impl StrategyBuilder for Strangle {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Strangle
    }

    fn requires_sigma(&self) -> bool {
        true
    }

    fn candidates(&self, ctx: &BuildContext<'_>, rejections: &mut Rejections) -> Vec<StrategyResult> {
        let Some(sigma) = ctx.sigma else {
            return Vec::new();
        };
        let reach = 2.0 * strangle_gap(ctx, sigma);
        let puts: Vec<&Contract> = ctx
            .puts
            .within(ctx.spot - reach, ctx.spot)
            .iter()
            .copied()
            .filter(|p| p.strike_price < ctx.spot)
            .collect();
        let calls: Vec<&Contract> = ctx
            .calls
            .within(ctx.spot, ctx.spot + reach)
            .iter()
            .copied()
            .filter(|c| c.strike_price > ctx.spot)
            .collect();

        let mut out = Vec::new();
        for put in &puts {
            for call in &calls {
                if put.ask + call.ask <= 0.0 {
                    rejections.record(self.kind(), RejectReason::NonPositivePremium, &label(put, call));
                    continue;
                }
                out.push(assemble(
                    self.kind(),
                    label(put, call),
                    vec![Leg::long(call), Leg::long(put)],
                    StockPosition::default(),
                    long_economics(ctx, put, call, 25.0),
                ));
            }
        }
        out
    }
}

/// Sell the at-the-money call and put.
pub struct ShortStraddle;

impl StrategyBuilder for ShortStraddle {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ShortStraddle
    }

    fn requires_sigma(&self) -> bool {
        true
    }

    fn candidates(&self, ctx: &BuildContext<'_>, rejections: &mut Rejections) -> Vec<StrategyResult> {
        let atm = round_penny(ctx.spot);
        let (Some(put), Some(call)) = (ctx.puts.nearest(atm), ctx.calls.nearest(atm)) else {
            rejections.record(self.kind(), RejectReason::MissingLeg, "no at-the-money leg");
            return Vec::new();
        };
        let (put_k, call_k) = (put.strike_price, call.strike_price);
        if put_k > call_k {
            rejections.record(self.kind(), RejectReason::BadStrikes, &label(put, call));
            return Vec::new();
        }

        let credit = call.bid + put.bid;
        if credit <= 0.0 {
            rejections.record(self.kind(), RejectReason::NonPositivePremium, &label(put, call));
            return Vec::new();
        }
        let probability = match ctx.engine.pop_model {
            PopModel::Analytic => ctx.sigma_model().map_or(f64::NAN, |m| {
                if put_k == call_k {
                    m.pop_short_straddle(call_k, credit)
                } else {
                    m.pop_short_strangle(put_k, call_k, credit)
                }
            }),
            PopModel::Legacy => legacy(70.0 - 20.0 * ctx.a()),
        };
        let strikes = if put_k == call_k {
            fmt_strike(call_k)
        } else {
            label(put, call)
        };

        vec![assemble(
            self.kind(),
            strikes,
            vec![Leg::short(call), Leg::short(put)],
            StockPosition::default(),
            Economics {
                profit: Bound::Finite(credit * MULTIPLIER),
                risk: Bound::Unbounded,
                required_capital: short_pair_margin(ctx.spot, put, call),
                probability,
                break_evens: vec![put_k - credit, call_k + credit],
            },
        )]
    }
}

/// Sell an out-of-the-money put and call around spot.
pub struct ShortStrangle;

impl StrategyBuilder for ShortStrangle {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ShortStrangle
    }

    fn requires_sigma(&self) -> bool {
        true
    }

    fn candidates(&self, ctx: &BuildContext<'_>, rejections: &mut Rejections) -> Vec<StrategyResult> {
        let Some(sigma) = ctx.sigma else {
            return Vec::new();
        };
        let gap = strangle_gap(ctx, sigma);
        let put = ctx.puts.nearest_below(ctx.spot - gap, ctx.spot);
        let call = ctx.calls.nearest_above(ctx.spot + gap, ctx.spot);
        let (Some(put), Some(call)) = (put, call) else {
            rejections.record(self.kind(), RejectReason::MissingLeg, "no out-of-the-money leg");
            return Vec::new();
        };

        let credit = put.bid + call.bid;
        if credit <= 0.0 {
            rejections.record(self.kind(), RejectReason::NonPositivePremium, &label(put, call));
            return Vec::new();
        }
        let probability = match ctx.engine.pop_model {
            PopModel::Analytic => ctx.sigma_model().map_or(f64::NAN, |m| {
                m.pop_short_strangle(put.strike_price, call.strike_price, credit)
            }),
            PopModel::Legacy => legacy(75.0),
        };

        vec![assemble(
            self.kind(),
            label(put, call),
            vec![Leg::short(call), Leg::short(put)],
            StockPosition::default(),
            Economics {
                profit: Bound::Finite(credit * MULTIPLIER),
                risk: Bound::Unbounded,
                required_capital: short_pair_margin(ctx.spot, put, call),
                probability,
                break_evens: vec![put.strike_price - credit, call.strike_price + credit],
            },
        )]
    }
}
