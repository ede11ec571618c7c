//! One builder per strategy shape.
//!
//! A builder enumerates leg combinations from the liquid strike indexes,
//! prices them and returns every valid candidate. Sentiment gating, budget
//! filtering and selection happen in the engine.

mod income;
mod iron;
mod single_leg;
mod straddles;
mod verticals;

pub use income::{CashSecuredPut, CoveredCall};
pub use iron::{InverseIronButterfly, InverseIronCondor, IronButterfly, IronCondor};
pub use single_leg::{LongCall, LongPut, ShortCall, ShortPut};
pub use straddles::{ShortStraddle, ShortStrangle, Straddle, Strangle};
pub use verticals::{BearCallSpread, BearPutSpread, BullCallSpread, BullPutSpread};

use super::context::BuildContext;
use super::payoff::{payoff_curve, StockPosition};
use super::types::{return_on_risk, Bound, Leg, StrategyKind, StrategyResult};
use crate::math::pop_percent;
use crate::utils::round_penny;
use tracing::trace;

/// Per-contract multiplier.
pub(crate) const MULTIPLIER: f64 = 100.0;

/// Builds candidates for one strategy shape.
pub trait StrategyBuilder: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Needs the caller's one-sigma move (wing and gap sizing, PoP volatility).
    fn requires_sigma(&self) -> bool {
        false
    }

    /// Every valid candidate for this shape.
    fn candidates(&self, ctx: &BuildContext<'_>, rejections: &mut Rejections) -> Vec<StrategyResult>;
}

/// All builders in output order.
pub fn all_builders(include_extended: bool) -> Vec<Box<dyn StrategyBuilder>> {
    let builders: Vec<Box<dyn StrategyBuilder>> = vec![
        Box::new(LongCall),
        Box::new(LongPut),
        Box::new(ShortCall),
        Box::new(ShortPut),
        Box::new(BullCallSpread),
        Box::new(BearPutSpread),
        Box::new(BullPutSpread),
        Box::new(BearCallSpread),
        Box::new(IronCondor),
        Box::new(IronButterfly),
        Box::new(CoveredCall),
        Box::new(CashSecuredPut),
        Box::new(Straddle),
        Box::new(Strangle),
        Box::new(InverseIronCondor),
        Box::new(InverseIronButterfly),
        Box::new(ShortStraddle),
        Box::new(ShortStrangle),
    ];
    builders
        .into_iter()
        .filter(|b| include_extended || !b.kind().is_extended())
        .collect()
}

/// Reasons for discarding a leg combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Debit or credit not strictly positive
    NonPositivePremium,
    /// Debit (or credit) at or beyond the spread width
    PremiumExceedsWidth,
    /// Strike ordering or width outside the allowed window
    BadStrikes,
    /// A required leg is not in the chain
    MissingLeg,
    LowProbability,
    OverBudget,
    UnprofitableAtTarget,
}

/// Rejection counts for one builder run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Rejections {
    pub non_positive_premium: usize,
    pub premium_exceeds_width: usize,
    pub bad_strikes: usize,
    pub missing_leg: usize,
    pub low_probability: usize,
    pub over_budget: usize,
    pub unprofitable_at_target: usize,
}

impl Rejections {
    pub fn record(&mut self, kind: StrategyKind, reason: RejectReason, detail: &str) {
        trace!(strategy = %kind, ?reason, detail, "Rejected candidate");
        let counter = match reason {
            RejectReason::NonPositivePremium => &mut self.non_positive_premium,
            RejectReason::PremiumExceedsWidth => &mut self.premium_exceeds_width,
            RejectReason::BadStrikes => &mut self.bad_strikes,
            RejectReason::MissingLeg => &mut self.missing_leg,
            RejectReason::LowProbability => &mut self.low_probability,
            RejectReason::OverBudget => &mut self.over_budget,
            RejectReason::UnprofitableAtTarget => &mut self.unprofitable_at_target,
        };
        *counter += 1;
    }

    pub fn total(&self) -> usize {
        self.non_positive_premium
            + self.premium_exceeds_width
            + self.bad_strikes
            + self.missing_leg
            + self.low_probability
            + self.over_budget
            + self.unprofitable_at_target
    }
}

/// Economics of one candidate before assembly.
#[derive(Debug, Clone)]
pub(crate) struct Economics {
    pub profit: Bound,
    pub risk: Bound,
    pub required_capital: f64,
    /// Model probability in [0, 1], or `NaN` if unknown
    pub probability: f64,
    pub break_evens: Vec<f64>,
}

/// Assemble a result: return on risk, reported chance, breakevens and payoff curve.
pub(crate) fn assemble(
    kind: StrategyKind,
    strikes_label: String,
    legs: Vec<Leg>,
    stock: StockPosition,
    economics: Economics,
) -> StrategyResult {
    let Economics {
        profit,
        risk,
        required_capital,
        probability,
        mut break_evens,
    } = economics;

    debug_assert!(required_capital.is_finite(), "non-finite capital for {kind}");
    let profit = profit.map(round_penny);
    let risk = risk.map(round_penny);
    let required_capital = round_penny(required_capital.max(0.0));
    break_evens.retain(|b| b.is_finite());
    break_evens.sort_by(|a, b| a.total_cmp(b));
    let payoff_points = payoff_curve(&legs, stock, &break_evens);

    StrategyResult {
        name: format!("{} ({})", kind.label(), strikes_label),
        kind,
        legs,
        underlying_shares: stock.shares,
        return_on_risk: return_on_risk(profit, risk),
        chance: pop_percent(probability),
        profit,
        risk,
        required_capital,
        sentiment_fit: kind.sentiment_fit().to_vec(),
        break_even: break_evens.first().copied().unwrap_or(0.0),
        break_evens,
        payoff_points,
    }
}

/// Strike formatted without trailing zeros (150, 152.5).
pub(crate) fn fmt_strike(strike: f64) -> String {
    let s = format!("{strike:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// CBOE naked short option margin per contract, premium included.
pub(crate) fn naked_margin(spot: f64, out_of_the_money: f64, premium: f64) -> f64 {
    let otm = out_of_the_money.max(0.0);
    (0.20 * spot * MULTIPLIER - otm * MULTIPLIER).max(0.10 * spot * MULTIPLIER) + premium * MULTIPLIER
}

/// Legacy percent estimate expressed as a probability.
pub(crate) fn legacy(percent: f64) -> f64 {
    percent / 100.0
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared fixtures for builder tests.

    use super::*;
    use crate::config::EngineConfig;
    use crate::market::{Contract, OptionType, Quote};
    use crate::strategy::liquidity::LiquidityGate;
    use crate::strategy::types::{Sentiment, UserInputs};
    use chrono::NaiveDate;

    pub fn user(spot: f64, sentiment: Sentiment, slider: f64) -> UserInputs {
        UserInputs {
            ticker: "TEST".to_string(),
            quote: Some(Quote::new(spot)),
            sentiment: Some(sentiment),
            risk_reward: slider,
            target_price: String::new(),
            budget: String::new(),
            expiration: NaiveDate::from_ymd_opt(2025, 2, 14),
            valuation_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        }
    }

    pub fn call(strike: f64, bid: f64, ask: f64) -> Contract {
        Contract::new(format!("C{strike}"), OptionType::Call, strike)
            .with_quote(bid, ask)
            .with_activity(100, 10)
            .with_iv(0.30)
    }

    pub fn put(strike: f64, bid: f64, ask: f64) -> Contract {
        Contract::new(format!("P{strike}"), OptionType::Put, strike)
            .with_quote(bid, ask)
            .with_activity(100, 10)
            .with_iv(0.30)
    }

    /// Run one builder against a chain with default configuration.
    pub fn run(
        builder: &dyn StrategyBuilder,
        user: &UserInputs,
        chain: &[Contract],
        sigma: Option<f64>,
    ) -> (Vec<StrategyResult>, Rejections) {
        run_with(builder, user, chain, sigma, &EngineConfig::default())
    }

    pub fn run_with(
        builder: &dyn StrategyBuilder,
        user: &UserInputs,
        chain: &[Contract],
        sigma: Option<f64>,
        engine: &EngineConfig,
    ) -> (Vec<StrategyResult>, Rejections) {
        let gate = LiquidityGate::default();
        let ctx = BuildContext::new(user, chain, user.risk_reward, sigma, engine, &gate)
            .expect("complete inputs");
        let mut rejections = Rejections::default();
        let out = builder.candidates(&ctx, &mut rejections);
        (out, rejections)
    }

    pub fn assert_well_formed(s: &StrategyResult) {
        assert!((0.0..=100.0).contains(&s.chance), "{}: chance {}", s.name, s.chance);
        assert!(s.required_capital >= 0.0, "{}: capital", s.name);
        let prices: Vec<f64> = s.payoff_points.iter().map(|p| p.price).collect();
        assert!(prices.windows(2).all(|w| w[0] < w[1]), "{}: unsorted payoff", s.name);
        for be in &s.break_evens {
            assert!(
                prices.first().is_some_and(|lo| lo <= be) && prices.last().is_some_and(|hi| hi >= be),
                "{}: payoff does not bracket breakeven {be}",
                s.name
            );
        }
        if let (Bound::Finite(p), Bound::Finite(r)) = (s.profit, s.risk) {
            if r > 0.0 {
                let ror = s.return_on_risk.finite().unwrap();
                assert!((ror - p / r * 100.0).abs() < 1e-9, "{}: ror", s.name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_respects_extended_toggle() {
        assert_eq!(all_builders(true).len(), 18);
        let core = all_builders(false);
        assert_eq!(core.len(), 13);
        assert!(core.iter().all(|b| !b.kind().is_extended()));
    }

    #[test]
    fn test_naked_margin() {
        // 20% of 100 minus 5 OTM = 15 vs 10% floor = 10 -> 1500 + 200 premium
        assert!((naked_margin(100.0, 5.0, 2.0) - 1700.0).abs() < 1e-9);
        // Far OTM hits the 10% floor
        assert!((naked_margin(100.0, 15.0, 0.5) - 1050.0).abs() < 1e-9);
        // ITM counts as zero OTM
        assert!((naked_margin(100.0, -5.0, 6.0) - 2600.0).abs() < 1e-9);
    }

    #[test]
    fn test_fmt_strike() {
        assert_eq!(fmt_strike(150.0), "150");
        assert_eq!(fmt_strike(152.5), "152.5");
        assert_eq!(fmt_strike(7.25), "7.25");
    }

    #[test]
    fn test_money_is_rounded_to_cents() {
        let debit = 1.10 - 0.90;
        let s = assemble(
            StrategyKind::BullCallSpread,
            "100/101".to_string(),
            Vec::new(),
            StockPosition::default(),
            Economics {
                profit: Bound::Finite((1.0 - debit) * MULTIPLIER),
                risk: Bound::Finite(debit * MULTIPLIER),
                required_capital: debit * MULTIPLIER,
                probability: 0.5,
                break_evens: vec![100.0 + debit],
            },
        );
        assert_eq!(s.required_capital, 20.0);
        assert_eq!(s.risk, Bound::Finite(20.0));
        assert_eq!(s.profit, Bound::Finite(80.0));
        assert_eq!(s.return_on_risk, Bound::Finite(400.0));
    }

    #[test]
    fn test_rejection_tally() {
        let mut r = Rejections::default();
        r.record(StrategyKind::IronCondor, RejectReason::MissingLeg, "no wing");
        r.record(StrategyKind::IronCondor, RejectReason::OverBudget, "too big");
        assert_eq!(r.missing_leg, 1);
        assert_eq!(r.total(), 2);
    }
}
