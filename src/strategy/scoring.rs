//! Multi-criteria ranking of candidates within one strategy shape.
//!
//! Metrics are min-max normalized across the pool, then combined:
//! `score = a·ror + (1 - a)·pop + w_cap·cap_eff + w_liq·liquidity` with
//! `a = slider / 100`. Unbounded rewards are pinned to a ceiling that is at
//! least as large as any finite value in the pool, so they never rank below
//! a bounded candidate on the reward axes.

use super::liquidity::LiquidityGate;
use super::types::{Bound, ScoredStrategy, StrategyResult};
use crate::config::{LiquidityConfig, ScoringConfig};
use crate::utils::safe_div;
use std::cmp::Ordering;

/// Min-max scale into [0, 1]. Pools with no spread (including size 1) map to 0.5.
pub fn normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if !(range > 0.0) || !range.is_finite() {
        return vec![0.5; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

/// Ranks the candidate pool of one shape.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: ScoringConfig,
    liquidity: LiquidityGate,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(ScoringConfig::default(), LiquidityConfig::default())
    }
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig, liquidity: LiquidityConfig) -> Self {
        Self {
            config,
            liquidity: LiquidityGate::new(liquidity),
        }
    }

    /// Score every candidate and sort best first.
    ///
    /// Order: score descending, then chance descending, then required capital
    /// ascending, then name.
    pub fn score(&self, candidates: Vec<StrategyResult>, slider: f64) -> Vec<ScoredStrategy> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let ror = self.log_return_on_risk(&candidates);
        let pop: Vec<f64> = candidates.iter().map(|s| s.chance.max(0.0)).collect();
        let cap_eff = self.capital_efficiency(&candidates);
        let liq: Vec<f64> = candidates
            .iter()
            .map(|s| self.liquidity.score(s.contracts()))
            .collect();

        let ror_n = normalize(&ror);
        let pop_n = normalize(&pop);
        let cap_n = normalize(&cap_eff);
        let liq_n = normalize(&liq);

        let w_reward = (slider / 100.0).clamp(0.0, 1.0);
        let w_risk = 1.0 - w_reward;

        let mut scored: Vec<ScoredStrategy> = candidates
            .into_iter()
            .enumerate()
            .map(|(i, strategy)| ScoredStrategy {
                strategy,
                ror_scaled: ror_n[i],
                cop_scaled: pop_n[i],
                cap_eff_scaled: cap_n[i],
                liquidity_scaled: liq_n[i],
                score: w_reward * ror_n[i]
                    + w_risk * pop_n[i]
                    + self.config.capital_efficiency_weight * cap_n[i]
                    + self.config.liquidity_weight * liq_n[i],
            })
            .collect();

        scored.sort_by(rank);
        scored
    }

    /// Top-ranked candidate, if any.
    pub fn pick_best(&self, candidates: Vec<StrategyResult>, slider: f64) -> Option<ScoredStrategy> {
        self.score(candidates, slider).into_iter().next()
    }

    /// `log10(max(1, ror%))`, unbounded pinned to the ceiling.
    fn log_return_on_risk(&self, candidates: &[StrategyResult]) -> Vec<f64> {
        let finite_max = candidates
            .iter()
            .filter_map(|s| s.return_on_risk.finite())
            .fold(0.0, f64::max);
        let ceiling = self.config.max_return_on_risk.max(finite_max);
        candidates
            .iter()
            .map(|s| {
                let ror = match s.return_on_risk {
                    Bound::Finite(r) => r,
                    Bound::Unbounded => ceiling,
                };
                ror.max(1.0).log10()
            })
            .collect()
    }

    /// `profit / capital`, clamped at zero; unbounded profit pinned to the ceiling.
    fn capital_efficiency(&self, candidates: &[StrategyResult]) -> Vec<f64> {
        let raw: Vec<Option<f64>> = candidates
            .iter()
            .map(|s| match s.profit {
                Bound::Finite(p) => Some(safe_div(p, s.required_capital).max(0.0)),
                Bound::Unbounded if s.required_capital > 0.0 => None,
                Bound::Unbounded => Some(0.0),
            })
            .collect();
        let finite_max = raw.iter().flatten().copied().fold(0.0, f64::max);
        let ceiling = self.config.max_capital_efficiency.max(finite_max);
        raw.into_iter().map(|v| v.unwrap_or(ceiling)).collect()
    }
}

fn rank(a: &ScoredStrategy, b: &ScoredStrategy) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.strategy.chance.total_cmp(&a.strategy.chance))
        .then_with(|| a.strategy.required_capital.total_cmp(&b.strategy.required_capital))
        .then_with(|| a.strategy.name.cmp(&b.strategy.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{Contract, OptionType};
    use crate::strategy::types::{return_on_risk, Leg, StrategyKind};

    // =========================================================================
    // Test Helpers
    // =========================================================================

    fn candidate(name: &str, profit: Bound, risk: f64, capital: f64, chance: f64) -> StrategyResult {
        let contract = Contract::new(name, OptionType::Call, 100.0)
            .with_quote(1.0, 1.1)
            .with_activity(100, 10);
        StrategyResult {
            name: name.to_string(),
            kind: StrategyKind::LongCall,
            legs: vec![Leg::long(&contract)],
            underlying_shares: 0,
            return_on_risk: return_on_risk(profit, Bound::Finite(risk)),
            chance,
            profit,
            risk: Bound::Finite(risk),
            required_capital: capital,
            sentiment_fit: Vec::new(),
            break_even: 101.1,
            break_evens: vec![101.1],
            payoff_points: Vec::new(),
        }
    }

    // =========================================================================
    // Normalization
    // =========================================================================

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(&[1.0, 3.0, 2.0]), vec![0.0, 1.0, 0.5]);
        assert_eq!(normalize(&[4.0]), vec![0.5]);
        assert_eq!(normalize(&[2.0, 2.0]), vec![0.5, 0.5]);
        assert!(normalize(&[]).is_empty());
    }

    // =========================================================================
    // Ranking
    // =========================================================================

    #[test]
    fn test_slider_trades_probability_for_return() {
        let engine = ScoringEngine::default();
        let safe = candidate("safe", Bound::Finite(50.0), 200.0, 200.0, 80.0);
        let risky = candidate("risky", Bound::Finite(900.0), 100.0, 100.0, 20.0);

        let at_zero = engine.pick_best(vec![safe.clone(), risky.clone()], 0.0).unwrap();
        let at_hundred = engine.pick_best(vec![safe, risky], 100.0).unwrap();

        assert_eq!(at_zero.strategy.name, "safe");
        assert_eq!(at_hundred.strategy.name, "risky");
        let ror = |s: &ScoredStrategy| s.strategy.return_on_risk.finite().unwrap();
        assert!(ror(&at_hundred) >= ror(&at_zero));
    }

    #[test]
    fn test_single_candidate_scores_half() {
        let engine = ScoringEngine::default();
        let only = candidate("only", Bound::Finite(100.0), 100.0, 100.0, 40.0);
        let scored = engine.score(vec![only], 30.0);
        assert_eq!(scored.len(), 1);
        let s = &scored[0];
        assert_eq!(s.ror_scaled, 0.5);
        assert_eq!(s.cop_scaled, 0.5);
        // 0.3·0.5 + 0.7·0.5 + 0.15·0.5 + 0.10·0.5
        assert!((s.score - 0.625).abs() < 1e-12);
    }

    #[test]
    fn test_tie_break_prefers_lower_capital() {
        let engine = ScoringEngine::default();
        // Same return on risk, chance, efficiency and liquidity: scores tie exactly
        let expensive = candidate("expensive", Bound::Finite(100.0), 100.0, 500.0, 50.0);
        let cheap = candidate("cheap", Bound::Finite(80.0), 80.0, 400.0, 50.0);
        let ranked = engine.score(vec![expensive, cheap], 50.0);
        assert_eq!(ranked[0].score, ranked[1].score);
        assert_eq!(ranked[0].strategy.name, "cheap");
    }

    #[test]
    fn test_full_tie_breaks_on_name() {
        let engine = ScoringEngine::default();
        let b = candidate("Long Call (105)", Bound::Finite(100.0), 100.0, 100.0, 50.0);
        let a = candidate("Long Call (100)", Bound::Finite(100.0), 100.0, 100.0, 50.0);
        let ranked = engine.score(vec![b.clone(), a.clone()], 50.0);
        assert_eq!(ranked[0].strategy.name, "Long Call (100)");
        let reversed = engine.score(vec![a, b], 50.0);
        assert_eq!(reversed[0].strategy.name, "Long Call (100)");
    }

    #[test]
    fn test_zero_capital_has_zero_efficiency() {
        let engine = ScoringEngine::default();
        let free = candidate("free", Bound::Finite(50.0), 0.0, 0.0, 50.0);
        let paid = candidate("paid", Bound::Finite(50.0), 100.0, 100.0, 50.0);
        let ranked = engine.score(vec![free, paid], 50.0);
        let free = ranked.iter().find(|s| s.strategy.name == "free").unwrap();
        assert_eq!(free.cap_eff_scaled, 0.0);
        assert!(free.score.is_finite());
    }

    #[test]
    fn test_unbounded_reward_is_not_corrupting() {
        let engine = ScoringEngine::default();
        let bounded = candidate("bounded", Bound::Finite(300.0), 200.0, 200.0, 45.0);
        let unbounded = candidate("unbounded", Bound::Unbounded, 200.0, 200.0, 45.0);
        let ranked = engine.score(vec![bounded, unbounded], 100.0);

        for s in &ranked {
            assert!(s.score.is_finite());
            assert!((0.0..=1.0).contains(&s.ror_scaled));
            assert!((0.0..=1.0).contains(&s.cap_eff_scaled));
        }
        assert_eq!(ranked[0].strategy.name, "unbounded");
        assert_eq!(ranked[0].ror_scaled, 1.0);
    }

    #[test]
    fn test_empty_pool() {
        let engine = ScoringEngine::default();
        assert!(engine.score(Vec::new(), 50.0).is_empty());
        assert!(engine.pick_best(Vec::new(), 50.0).is_none());
    }
}
