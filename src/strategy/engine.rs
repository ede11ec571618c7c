//! Recommendation pass over every strategy shape.
//!
//! Each builder contributes at most one candidate: its pool is gated by
//! sentiment, budget and (optionally) profit at the target price, then
//! ranked by the scoring engine. Shapes are not ranked against each other.

use super::builders::{all_builders, RejectReason, Rejections, StrategyBuilder};
use super::context::BuildContext;
use super::liquidity::LiquidityGate;
use super::payoff::profit_near;
use super::scoring::ScoringEngine;
use super::types::{ScoredStrategy, StrategyResult, UserInputs};
use crate::config::{Config, EngineConfig, LiquidityConfig, ScoringConfig};
use crate::market::Contract;
use tracing::{debug, info, instrument};

/// Whether a strategy makes money at the payoff vertex nearest `target`.
///
/// Without a target (or without a payoff curve) every strategy qualifies.
pub fn is_profitable_at_target(strategy: &StrategyResult, target: Option<f64>) -> bool {
    match target {
        None => true,
        Some(target) => profit_near(&strategy.payoff_points, target).map_or(true, |p| p > 0.0),
    }
}

/// Runs every builder and keeps the best candidate of each shape.
pub struct StrategyEngine {
    config: EngineConfig,
    gate: LiquidityGate,
    scoring: ScoringEngine,
    builders: Vec<Box<dyn StrategyBuilder>>,
}

impl Default for StrategyEngine {
    fn default() -> Self {
        Self::new(
            EngineConfig::default(),
            LiquidityConfig::default(),
            ScoringConfig::default(),
        )
    }
}

impl StrategyEngine {
    pub fn new(config: EngineConfig, liquidity: LiquidityConfig, scoring: ScoringConfig) -> Self {
        let builders = all_builders(config.include_extended_shapes);
        Self {
            gate: LiquidityGate::new(liquidity.clone()),
            scoring: ScoringEngine::new(scoring, liquidity),
            builders,
            config,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.engine.clone(),
            config.liquidity.clone(),
            config.scoring.clone(),
        )
    }

    /// Best candidate per shape, with scoring metrics.
    ///
    /// Missing quote, sentiment or expiration yields an empty list. Shapes
    /// that need `sigma` are skipped when it is absent.
    #[instrument(skip(self, user, chain), fields(ticker = %user.ticker, contracts = chain.len()))]
    pub fn compute_scored(
        &self,
        user: &UserInputs,
        chain: &[Contract],
        slider: f64,
        sigma: Option<f64>,
    ) -> Vec<ScoredStrategy> {
        if chain.is_empty() {
            debug!("Empty chain, nothing to build");
            return Vec::new();
        }
        let Some(ctx) = BuildContext::new(user, chain, slider, sigma, &self.config, &self.gate) else {
            debug!(
                has_quote = user.spot().is_some(),
                has_sentiment = user.sentiment.is_some(),
                has_expiration = user.expiration.is_some(),
                "Incomplete inputs, nothing to build"
            );
            return Vec::new();
        };

        let mut picks = Vec::new();
        let mut total_candidates = 0usize;
        for builder in &self.builders {
            let kind = builder.kind();
            if !kind.serves(ctx.sentiment) {
                continue;
            }
            if builder.requires_sigma() && ctx.sigma.is_none() {
                debug!(strategy = %kind, "Skipping, no implied move available");
                continue;
            }

            let mut rejections = Rejections::default();
            let pool = self.gate_pool(&ctx, builder.candidates(&ctx, &mut rejections), &mut rejections);
            total_candidates += pool.len();

            debug!(
                strategy = %kind,
                candidates = pool.len(),
                rejected = rejections.total(),
                non_positive_premium = rejections.non_positive_premium,
                premium_exceeds_width = rejections.premium_exceeds_width,
                bad_strikes = rejections.bad_strikes,
                missing_leg = rejections.missing_leg,
                low_probability = rejections.low_probability,
                over_budget = rejections.over_budget,
                unprofitable_at_target = rejections.unprofitable_at_target,
                "Built strategy pool"
            );

            if let Some(best) = self.scoring.pick_best(pool, ctx.slider) {
                picks.push(best);
            }
        }

        info!(
            sentiment = %ctx.sentiment,
            slider = ctx.slider,
            liquid_calls = ctx.calls.len(),
            liquid_puts = ctx.puts.len(),
            candidates = total_candidates,
            strategies = picks.len(),
            "Recommendation pass complete"
        );
        picks
    }

    /// Best candidate per shape.
    pub fn compute_strategies(
        &self,
        user: &UserInputs,
        chain: &[Contract],
        slider: f64,
        sigma: Option<f64>,
    ) -> Vec<StrategyResult> {
        self.compute_scored(user, chain, slider, sigma)
            .into_iter()
            .map(|s| s.strategy)
            .collect()
    }

    /// Budget and target-price gates.
    fn gate_pool(
        &self,
        ctx: &BuildContext<'_>,
        candidates: Vec<StrategyResult>,
        rejections: &mut Rejections,
    ) -> Vec<StrategyResult> {
        let check_target = self.config.require_profit_at_target && ctx.target.is_some();
        candidates
            .into_iter()
            .filter(|s| {
                if !ctx.within_budget(s.required_capital) {
                    rejections.record(s.kind, RejectReason::OverBudget, &s.name);
                    return false;
                }
                if check_target && !is_profitable_at_target(s, ctx.target) {
                    rejections.record(s.kind, RejectReason::UnprofitableAtTarget, &s.name);
                    return false;
                }
                true
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{OptionType, Quote};
    use crate::math::{black_scholes_price, BsInputs};
    use crate::strategy::types::{Sentiment, StrategyKind};
    use crate::utils::round_penny;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    // =========================================================================
    // Test Helpers
    // =========================================================================

    const SPOT: f64 = 100.0;
    const IV: f64 = 0.30;

    fn user(sentiment: Sentiment) -> UserInputs {
        UserInputs {
            ticker: "TEST".to_string(),
            quote: Some(Quote::new(SPOT)),
            sentiment: Some(sentiment),
            risk_reward: 50.0,
            target_price: String::new(),
            budget: String::new(),
            expiration: NaiveDate::from_ymd_opt(2025, 2, 14),
            valuation_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        }
    }

    fn one_sigma() -> f64 {
        SPOT * IV * (30.0f64 / 365.0).sqrt()
    }

    /// Chain priced off Black-Scholes at 30% IV, strikes 80..=120 step 2.5,
    /// plus one attractive but untradeable call.
    fn make_chain() -> Vec<Contract> {
        let mut chain = Vec::new();
        for i in 0..=16 {
            let strike = 80.0 + 2.5 * i as f64;
            for option_type in [OptionType::Call, OptionType::Put] {
                let fair = black_scholes_price(&BsInputs {
                    spot: SPOT,
                    strike,
                    time_years: 30.0 / 365.0,
                    rate: 0.0,
                    volatility: IV,
                    option_type,
                });
                let bid = round_penny((fair * 0.97 - 0.01).max(0.0));
                let ask = round_penny(fair * 1.03 + 0.01);
                chain.push(
                    Contract::new(format!("{option_type}{strike}"), option_type, strike)
                        .with_quote(bid, ask)
                        .with_activity(500, 50)
                        .with_iv(IV),
                );
            }
        }
        chain.push(
            Contract::new("STALE", OptionType::Call, 101.0)
                .with_quote(0.10, 0.12)
                .with_activity(0, 0)
                .with_iv(IV),
        );
        chain
    }

    fn kinds(results: &[StrategyResult]) -> Vec<StrategyKind> {
        results.iter().map(|s| s.kind).collect()
    }

    // =========================================================================
    // Gating
    // =========================================================================

    #[test]
    fn test_empty_chain_yields_nothing() {
        let engine = StrategyEngine::default();
        for sentiment in [
            Sentiment::VeryBearish,
            Sentiment::Bearish,
            Sentiment::Neutral,
            Sentiment::Bullish,
            Sentiment::VeryBullish,
            Sentiment::Directional,
        ] {
            let out = engine.compute_strategies(&user(sentiment), &[], 50.0, Some(one_sigma()));
            assert!(out.is_empty());
        }
    }

    #[test]
    fn test_missing_inputs_yield_nothing() {
        let engine = StrategyEngine::default();
        let chain = make_chain();

        let mut no_quote = user(Sentiment::Bullish);
        no_quote.quote = None;
        assert!(engine.compute_strategies(&no_quote, &chain, 50.0, None).is_empty());

        let mut no_sentiment = user(Sentiment::Bullish);
        no_sentiment.sentiment = None;
        assert!(engine.compute_strategies(&no_sentiment, &chain, 50.0, None).is_empty());
    }

    #[test]
    fn test_bullish_pass_returns_one_per_bullish_shape() {
        let engine = StrategyEngine::default();
        let out = engine.compute_strategies(&user(Sentiment::VeryBullish), &make_chain(), 50.0, None);

        assert!(!out.is_empty());
        let seen: HashSet<StrategyKind> = kinds(&out).into_iter().collect();
        assert_eq!(seen.len(), out.len(), "one result per shape");
        assert!(seen.contains(&StrategyKind::LongCall));
        assert!(seen.contains(&StrategyKind::BullCallSpread));
        for s in &out {
            assert!(s.kind.serves(Sentiment::Bullish), "{} is not bullish", s.name);
            assert!((0.0..=100.0).contains(&s.chance));
            assert!(s.contracts().all(|c| c.symbol != "STALE"));
        }
    }

    #[test]
    fn test_iron_shapes_need_sigma() {
        let engine = StrategyEngine::default();
        let chain = make_chain();

        let without = engine.compute_strategies(&user(Sentiment::Neutral), &chain, 50.0, None);
        assert!(without.is_empty());

        let with = engine.compute_strategies(&user(Sentiment::Neutral), &chain, 50.0, Some(one_sigma()));
        assert!(kinds(&with).contains(&StrategyKind::IronCondor));
        assert!(with.iter().all(|s| s.kind.serves(Sentiment::Neutral)));
    }

    #[test]
    fn test_extended_shapes_toggle() {
        let config = EngineConfig {
            include_extended_shapes: false,
            ..EngineConfig::default()
        };
        let engine = StrategyEngine::new(config, LiquidityConfig::default(), ScoringConfig::default());
        let out = engine.compute_strategies(&user(Sentiment::Neutral), &make_chain(), 50.0, Some(one_sigma()));
        assert!(out.iter().all(|s| !s.kind.is_extended()));
    }

    #[test]
    fn test_budget_caps_required_capital() {
        let engine = StrategyEngine::default();
        let mut inputs = user(Sentiment::Bullish);
        inputs.budget = "$300".to_string();
        let out = engine.compute_strategies(&inputs, &make_chain(), 50.0, None);

        assert!(!out.is_empty());
        assert!(out.iter().all(|s| s.required_capital <= 300.0));
        assert!(!kinds(&out).contains(&StrategyKind::CoveredCall));
    }

    #[test]
    fn test_capital_equal_to_budget_is_kept() {
        // 1.10 - 0.90 is not exactly 0.20 in binary floating point
        let engine = StrategyEngine::default();
        let mut inputs = user(Sentiment::Bullish);
        inputs.budget = "20".to_string();
        let chain = vec![
            Contract::new("C100", OptionType::Call, 100.0)
                .with_quote(1.0, 1.10)
                .with_activity(100, 10)
                .with_iv(IV),
            Contract::new("C101", OptionType::Call, 101.0)
                .with_quote(0.90, 1.0)
                .with_activity(100, 10)
                .with_iv(IV),
        ];

        let out = engine.compute_strategies(&inputs, &chain, 50.0, None);
        assert_eq!(kinds(&out), vec![StrategyKind::BullCallSpread]);
        assert_eq!(out[0].required_capital, 20.0);
        assert_eq!(out[0].risk.finite(), Some(20.0));
    }

    #[test]
    fn test_iron_butterfly_without_common_body_strike() {
        let engine = StrategyEngine::default();
        let leg = |symbol: &str, option_type, strike, bid, ask| {
            Contract::new(symbol, option_type, strike)
                .with_quote(bid, ask)
                .with_activity(100, 10)
                .with_iv(IV)
        };
        let chain = vec![
            leg("C100", OptionType::Call, 100.0, 3.0, 3.1),
            leg("C105", OptionType::Call, 105.0, 0.9, 1.0),
            leg("P97.5", OptionType::Put, 97.5, 1.9, 2.0),
            leg("P92.5", OptionType::Put, 92.5, 0.5, 0.6),
        ];

        let out = engine.compute_strategies(&user(Sentiment::Neutral), &chain, 0.0, Some(10.0));
        assert!(kinds(&out).contains(&StrategyKind::IronButterfly));
    }

    #[test]
    fn test_profit_at_target_filter() {
        let config = EngineConfig {
            require_profit_at_target: true,
            ..EngineConfig::default()
        };
        let engine = StrategyEngine::new(config, LiquidityConfig::default(), ScoringConfig::default());
        let mut inputs = user(Sentiment::Bullish);
        inputs.target_price = "85".to_string();

        let out = engine.compute_strategies(&inputs, &make_chain(), 50.0, None);
        assert!(!kinds(&out).contains(&StrategyKind::LongCall));
        for s in &out {
            assert!(is_profitable_at_target(s, Some(85.0)), "{}", s.name);
        }
    }

    #[test]
    fn test_recomputation_is_deterministic() {
        let engine = StrategyEngine::default();
        let chain = make_chain();
        let inputs = user(Sentiment::Directional);
        let first = engine.compute_scored(&inputs, &chain, 30.0, Some(one_sigma()));
        let second = engine.compute_scored(&inputs, &chain, 30.0, Some(one_sigma()));
        assert_eq!(first, second);
    }

    #[test]
    fn test_is_profitable_at_target() {
        let engine = StrategyEngine::default();
        let out = engine.compute_strategies(&user(Sentiment::Bullish), &make_chain(), 50.0, None);
        let long_call = out.iter().find(|s| s.kind == StrategyKind::LongCall).unwrap();

        assert!(is_profitable_at_target(long_call, None));
        assert!(!is_profitable_at_target(long_call, Some(10.0)));
    }
}
