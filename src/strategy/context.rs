//! Per-pass state shared by every builder.

use super::liquidity::LiquidityGate;
use super::types::{Sentiment, UserInputs};
use crate::config::EngineConfig;
use crate::market::{Contract, OptionType, StrikeIndex};
use crate::math::{greeks, BsInputs, LognormalModel};
use rust_decimal::{Decimal, RoundingStrategy};

/// Inputs resolved once per recommendation pass.
///
/// Only liquid contracts make it into the strike indexes, so builders never
/// see a contract the gate rejected.
#[derive(Debug)]
pub struct BuildContext<'a> {
    pub spot: f64,
    /// Years to expiry
    pub time_years: f64,
    /// Risk/reward slider in [0, 100]
    pub slider: f64,
    /// Normalized sentiment
    pub sentiment: Sentiment,
    pub budget: Option<Decimal>,
    pub target: Option<f64>,
    /// One-sigma dollar move, when the caller could compute it
    pub sigma: Option<f64>,
    pub calls: StrikeIndex<'a>,
    pub puts: StrikeIndex<'a>,
    pub engine: &'a EngineConfig,
}

impl<'a> BuildContext<'a> {
    /// `None` when quote, sentiment or expiration is missing.
    pub fn new(
        user: &UserInputs,
        chain: &'a [Contract],
        slider: f64,
        sigma: Option<f64>,
        engine: &'a EngineConfig,
        gate: &LiquidityGate,
    ) -> Option<Self> {
        let spot = user.spot()?;
        let sentiment = user.sentiment?.normalized();
        let time_years = user.time_to_expiry()?;

        let liquid = || chain.iter().filter(|c| gate.admits(c));
        Some(Self {
            spot,
            time_years,
            slider: if slider.is_finite() { slider.clamp(0.0, 100.0) } else { 50.0 },
            sentiment,
            budget: user.budget(),
            target: user.target(),
            sigma: sigma.filter(|s| s.is_finite() && *s > 0.0),
            calls: StrikeIndex::new(liquid().filter(|c| c.is_call())),
            puts: StrikeIndex::new(liquid().filter(|c| c.is_put())),
            engine,
        })
    }

    /// Slider as a fraction in [0, 1].
    pub fn a(&self) -> f64 {
        self.slider / 100.0
    }

    pub fn index(&self, option_type: OptionType) -> &StrikeIndex<'a> {
        match option_type {
            OptionType::Call => &self.calls,
            OptionType::Put => &self.puts,
        }
    }

    /// Contract IV, or the configured fallback.
    pub fn contract_vol(&self, contract: &Contract) -> f64 {
        contract
            .iv
            .filter(|iv| *iv > 0.0)
            .unwrap_or(self.engine.default_volatility)
    }

    /// Average volatility of several legs.
    pub fn average_vol(&self, contracts: &[&Contract]) -> f64 {
        if contracts.is_empty() {
            return self.engine.default_volatility;
        }
        contracts.iter().map(|c| self.contract_vol(c)).sum::<f64>() / contracts.len() as f64
    }

    /// Annualized volatility implied by the one-sigma dollar move.
    pub fn sigma_vol(&self) -> Option<f64> {
        let sigma = self.sigma?;
        let vol = sigma / (self.spot * self.time_years.sqrt());
        (vol.is_finite() && vol > 0.0).then_some(vol)
    }

    pub fn model(&self, volatility: f64) -> LognormalModel {
        LognormalModel::new(self.spot, volatility, self.time_years, self.engine.risk_free_rate)
    }

    /// Model driven by the one-sigma move rather than a contract's IV.
    pub fn sigma_model(&self) -> Option<LognormalModel> {
        self.sigma_vol().map(|vol| self.model(vol))
    }

    /// Quoted delta, or the Black-Scholes delta from the contract's volatility.
    pub fn delta(&self, contract: &Contract) -> f64 {
        if let Some(delta) = contract.delta {
            return delta;
        }
        let g = greeks(&BsInputs {
            spot: self.spot,
            strike: contract.strike_price,
            time_years: self.time_years,
            rate: self.engine.risk_free_rate,
            volatility: self.contract_vol(contract),
            option_type: contract.option_type,
        });
        if g.delta.is_nan() {
            0.0
        } else {
            g.delta
        }
    }

    /// Liquid contract with delta in `[min, max]` closest to `target`.
    pub fn find_by_delta(
        &self,
        option_type: OptionType,
        target: f64,
        min: f64,
        max: f64,
    ) -> Option<&'a Contract> {
        self.index(option_type)
            .iter()
            .map(|c| (c, self.delta(c)))
            .filter(|(_, d)| (min..=max).contains(d))
            .min_by(|(_, a), (_, b)| (a - target).abs().total_cmp(&(b - target).abs()))
            .map(|(c, _)| c)
    }

    /// Liquid contract whose delta is closest to `target`, without a range.
    pub fn nearest_delta(&self, option_type: OptionType, target: f64) -> Option<&'a Contract> {
        self.find_by_delta(option_type, target, f64::NEG_INFINITY, f64::INFINITY)
    }

    /// Capital is compared in whole cents; only capital above the budget fails.
    pub fn within_budget(&self, required_capital: f64) -> bool {
        match self.budget {
            None => true,
            Some(budget) => Decimal::from_f64_retain(required_capital)
                .map(|capital| {
                    capital.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero) <= budget
                })
                .unwrap_or(false),
        }
    }

    /// Width window for vertical spreads in dollars.
    pub fn spread_width_window(&self) -> (f64, f64) {
        let min = self.engine.min_spread_width;
        (min, min.max(self.spot * self.engine.max_spread_width_pct))
    }
}
