//! Four-leg iron structures and their debit inverses.
//!
//! All four shapes need the caller's one-sigma move: it sizes the wings and
//! drives the probability model.

use super::{
    assemble, fmt_strike, legacy, Economics, RejectReason, Rejections, StrategyBuilder, MULTIPLIER,
};
use crate::config::PopModel;
use crate::market::{Contract, OptionType};
use crate::strategy::context::BuildContext;
use crate::strategy::payoff::StockPosition;
use crate::strategy::types::{Bound, Leg, StrategyKind, StrategyResult};
use crate::utils::round_penny;

/// Strikes of a four-leg structure, low to high.
struct Wings<'c> {
    outer_put: &'c Contract,
    inner_put: &'c Contract,
    inner_call: &'c Contract,
    outer_call: &'c Contract,
}

impl Wings<'_> {
    fn max_width(&self) -> f64 {
        let put_width = self.inner_put.strike_price - self.outer_put.strike_price;
        let call_width = self.outer_call.strike_price - self.inner_call.strike_price;
        put_width.max(call_width)
    }

    fn label(&self) -> String {
        let mut strikes = vec![fmt_strike(self.outer_put.strike_price)];
        strikes.push(fmt_strike(self.inner_put.strike_price));
        if self.inner_call.strike_price != self.inner_put.strike_price {
            strikes.push(fmt_strike(self.inner_call.strike_price));
        }
        strikes.push(fmt_strike(self.outer_call.strike_price));
        strikes.join("/")
    }

    /// Bid of the inner legs less the ask of the outer legs.
    fn credit(&self) -> f64 {
        self.inner_put.bid + self.inner_call.bid - self.outer_put.ask - self.outer_call.ask
    }

    /// Ask of the inner legs less the bid of the outer legs.
    fn debit(&self) -> f64 {
        self.inner_put.ask + self.inner_call.ask - self.outer_put.bid - self.outer_call.bid
    }

    /// Sell the inner pair, buy the outer pair.
    fn short_body(&self) -> Vec<Leg> {
        vec![
            Leg::long(self.outer_put),
            Leg::short(self.inner_put),
            Leg::short(self.inner_call),
            Leg::long(self.outer_call),
        ]
    }

    /// Buy the inner pair, sell the outer pair.
    fn long_body(&self) -> Vec<Leg> {
        vec![
            Leg::short(self.outer_put),
            Leg::long(self.inner_put),
            Leg::long(self.inner_call),
            Leg::short(self.outer_call),
        ]
    }
}

/// Inner legs at the slider's target delta, wings `σ·(1 + 2a)` further out.
fn condor_wings<'c>(
    ctx: &BuildContext<'c>,
    kind: StrategyKind,
    sigma: f64,
    rejections: &mut Rejections,
) -> Option<Wings<'c>> {
    let a = ctx.a();
    let target = 0.10 + 0.25 * a;
    let inner_call = ctx
        .find_by_delta(OptionType::Call, target, 0.10, 1.0)
        .or_else(|| ctx.nearest_delta(OptionType::Call, target));
    let inner_put = ctx
        .find_by_delta(OptionType::Put, -target, -1.0, -0.10)
        .or_else(|| ctx.nearest_delta(OptionType::Put, -target));
    let (Some(inner_put), Some(inner_call)) = (inner_put, inner_call) else {
        rejections.record(kind, RejectReason::MissingLeg, "no short leg near target delta");
        return None;
    };
    if inner_put.strike_price >= inner_call.strike_price {
        rejections.record(kind, RejectReason::BadStrikes, "put strike not below call strike");
        return None;
    }

    let wing = sigma * (1.0 + 2.0 * a);
    let outer_put = ctx
        .puts
        .nearest_below(inner_put.strike_price - wing, inner_put.strike_price);
    let outer_call = ctx
        .calls
        .nearest_above(inner_call.strike_price + wing, inner_call.strike_price);
    let (Some(outer_put), Some(outer_call)) = (outer_put, outer_call) else {
        rejections.record(kind, RejectReason::MissingLeg, "no wing strike");
        return None;
    };

    Some(Wings {
        outer_put,
        inner_put,
        inner_call,
        outer_call,
    })
}

/// Call and put each at the strike nearest spot, wings `σ·(0.5 + 2a)` out.
///
/// The two body strikes may differ when the chain has no common strike at the money.
fn butterfly_wings<'c>(
    ctx: &BuildContext<'c>,
    kind: StrategyKind,
    sigma: f64,
    rejections: &mut Rejections,
) -> Option<Wings<'c>> {
    let atm = round_penny(ctx.spot);
    let (Some(body_put), Some(body_call)) = (ctx.puts.nearest(atm), ctx.calls.nearest(atm)) else {
        rejections.record(kind, RejectReason::MissingLeg, "no body strike");
        return None;
    };
    let (put_body, call_body) = (body_put.strike_price, body_call.strike_price);
    if put_body > call_body {
        rejections.record(kind, RejectReason::BadStrikes, "put body above call body");
        return None;
    }

    let wing = sigma * (0.5 + 2.0 * ctx.a());
    let outer_put = ctx.puts.nearest_below(put_body - wing, put_body);
    let outer_call = ctx.calls.nearest_above(call_body + wing, call_body);
    let (Some(outer_put), Some(outer_call)) = (outer_put, outer_call) else {
        rejections.record(kind, RejectReason::MissingLeg, "no wing strike");
        return None;
    };

    Some(Wings {
        outer_put,
        inner_put: body_put,
        inner_call: body_call,
        outer_call,
    })
}

/// Credit structure: max profit is the credit, max loss the wider wing less the credit.
fn credit_economics(
    kind: StrategyKind,
    wings: &Wings<'_>,
    probability: impl FnOnce(f64) -> f64,
    rejections: &mut Rejections,
) -> Option<Economics> {
    let credit = wings.credit();
    if credit <= 0.0 {
        rejections.record(kind, RejectReason::NonPositivePremium, &wings.label());
        return None;
    }
    let capital = wings.max_width() * MULTIPLIER;
    let risk = capital - credit * MULTIPLIER;
    if risk <= 0.0 {
        rejections.record(kind, RejectReason::PremiumExceedsWidth, &wings.label());
        return None;
    }
    Some(Economics {
        profit: Bound::Finite(credit * MULTIPLIER),
        risk: Bound::Finite(risk),
        required_capital: capital,
        probability: probability(credit),
        break_evens: vec![
            wings.inner_put.strike_price - credit,
            wings.inner_call.strike_price + credit,
        ],
    })
}

/// Debit structure: max loss is the debit, max profit the wider wing less the debit.
fn debit_economics(
    kind: StrategyKind,
    wings: &Wings<'_>,
    probability: impl FnOnce(f64) -> f64,
    rejections: &mut Rejections,
) -> Option<Economics> {
    let debit = wings.debit();
    if debit <= 0.0 {
        rejections.record(kind, RejectReason::NonPositivePremium, &wings.label());
        return None;
    }
    let capital = debit * MULTIPLIER;
    let profit = wings.max_width() * MULTIPLIER - capital;
    if profit <= 0.0 {
        rejections.record(kind, RejectReason::PremiumExceedsWidth, &wings.label());
        return None;
    }
    Some(Economics {
        profit: Bound::Finite(profit),
        risk: Bound::Finite(capital),
        required_capital: capital,
        probability: probability(debit),
        break_evens: vec![
            wings.inner_put.strike_price - debit,
            wings.inner_call.strike_price + debit,
        ],
    })
}

/// Short put spread plus short call spread around delta-targeted strikes.
pub struct IronCondor;

impl StrategyBuilder for IronCondor {
    fn kind(&self) -> StrategyKind {
        StrategyKind::IronCondor
    }

    fn requires_sigma(&self) -> bool {
        true
    }

    fn candidates(&self, ctx: &BuildContext<'_>, rejections: &mut Rejections) -> Vec<StrategyResult> {
        let Some(sigma) = ctx.sigma else {
            return Vec::new();
        };
        let Some(wings) = condor_wings(ctx, self.kind(), sigma, rejections) else {
            return Vec::new();
        };
        let (put_k, call_k) = (wings.inner_put.strike_price, wings.inner_call.strike_price);
        let probability = |credit: f64| {
            ctx.sigma_model()
                .map_or(f64::NAN, |m| m.pop_iron_condor(put_k, call_k, credit))
        };

        credit_economics(self.kind(), &wings, probability, rejections)
            .map(|economics| {
                assemble(
                    self.kind(),
                    wings.label(),
                    wings.short_body(),
                    StockPosition::default(),
                    economics,
                )
            })
            .into_iter()
            .collect()
    }
}

/// Short straddle at the money hedged with wings.
pub struct IronButterfly;

impl StrategyBuilder for IronButterfly {
    fn kind(&self) -> StrategyKind {
        StrategyKind::IronButterfly
    }

    fn requires_sigma(&self) -> bool {
        true
    }

    fn candidates(&self, ctx: &BuildContext<'_>, rejections: &mut Rejections) -> Vec<StrategyResult> {
        let Some(sigma) = ctx.sigma else {
            return Vec::new();
        };
        let Some(wings) = butterfly_wings(ctx, self.kind(), sigma, rejections) else {
            return Vec::new();
        };
        let (put_k, call_k) = (wings.inner_put.strike_price, wings.inner_call.strike_price);
        let probability = |credit: f64| match ctx.engine.pop_model {
            PopModel::Analytic => ctx.sigma_model().map_or(f64::NAN, |m| {
                if put_k == call_k {
                    m.pop_iron_butterfly(call_k, credit)
                } else {
                    m.pop_iron_condor(put_k, call_k, credit)
                }
            }),
            PopModel::Legacy => legacy(40.0),
        };

        credit_economics(self.kind(), &wings, probability, rejections)
            .map(|economics| {
                assemble(
                    self.kind(),
                    wings.label(),
                    wings.short_body(),
                    StockPosition::default(),
                    economics,
                )
            })
            .into_iter()
            .collect()
    }
}

/// Long the condor body, short the wings. Pays off on a large move either way.
pub struct InverseIronCondor;

impl StrategyBuilder for InverseIronCondor {
    fn kind(&self) -> StrategyKind {
        StrategyKind::InverseIronCondor
    }

    fn requires_sigma(&self) -> bool {
        true
    }

    fn candidates(&self, ctx: &BuildContext<'_>, rejections: &mut Rejections) -> Vec<StrategyResult> {
        let Some(sigma) = ctx.sigma else {
            return Vec::new();
        };
        let Some(wings) = condor_wings(ctx, self.kind(), sigma, rejections) else {
            return Vec::new();
        };
        let (put_k, call_k) = (wings.inner_put.strike_price, wings.inner_call.strike_price);
        let probability = |debit: f64| match ctx.engine.pop_model {
            PopModel::Analytic => ctx
                .sigma_model()
                .map_or(f64::NAN, |m| m.pop_long_strangle(put_k, call_k, debit)),
            PopModel::Legacy => legacy(15.0),
        };

        debit_economics(self.kind(), &wings, probability, rejections)
            .map(|economics| {
                assemble(
                    self.kind(),
                    wings.label(),
                    wings.long_body(),
                    StockPosition::default(),
                    economics,
                )
            })
            .into_iter()
            .collect()
    }
}

/// Long straddle at the money with short wings capping the payout.
pub struct InverseIronButterfly;

impl StrategyBuilder for InverseIronButterfly {
    fn kind(&self) -> StrategyKind {
        StrategyKind::InverseIronButterfly
    }

    fn requires_sigma(&self) -> bool {
        true
    }

    fn candidates(&self, ctx: &BuildContext<'_>, rejections: &mut Rejections) -> Vec<StrategyResult> {
        let Some(sigma) = ctx.sigma else {
            return Vec::new();
        };
        let Some(wings) = butterfly_wings(ctx, self.kind(), sigma, rejections) else {
            return Vec::new();
        };
        let (put_k, call_k) = (wings.inner_put.strike_price, wings.inner_call.strike_price);
        let probability = |debit: f64| match ctx.engine.pop_model {
            PopModel::Analytic => ctx.sigma_model().map_or(f64::NAN, |m| {
                if put_k == call_k {
                    m.pop_long_straddle(call_k, debit)
                } else {
                    m.pop_long_strangle(put_k, call_k, debit)
                }
            }),
            PopModel::Legacy => legacy(20.0),
        };

        debit_economics(self.kind(), &wings, probability, rejections)
            .map(|economics| {
                assemble(
                    self.kind(),
                    wings.label(),
                    wings.long_body(),
                    StockPosition::default(),
                    economics,
                )
            })
            .into_iter()
            .collect()
    }
}
