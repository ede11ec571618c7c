//! Black-Scholes European option pricing and Greeks.

use super::normal::{norm_cdf, norm_pdf};
use super::DAYS_PER_YEAR;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Call => write!(f, "call"),
            OptionType::Put => write!(f, "put"),
        }
    }
}

/// Inputs shared by pricing and Greeks.
#[derive(Debug, Clone, Copy)]
pub struct BsInputs {
    /// Underlying price
    pub spot: f64,
    pub strike: f64,
    /// Time to expiry in years
    pub time_years: f64,
    /// Continuously compounded risk-free rate
    pub rate: f64,
    /// Annualized volatility (0.25 = 25%)
    pub volatility: f64,
    pub option_type: OptionType,
}

impl BsInputs {
    fn is_degenerate(&self) -> bool {
        !(self.time_years > 0.0 && self.volatility > 0.0 && self.spot > 0.0 && self.strike > 0.0)
    }

    fn d1_d2(&self) -> (f64, f64) {
        let vol_sqrt_t = self.volatility * self.time_years.sqrt();
        let d1 = ((self.spot / self.strike).ln()
            + (self.rate + 0.5 * self.volatility * self.volatility) * self.time_years)
            / vol_sqrt_t;
        (d1, d1 - vol_sqrt_t)
    }
}

/// Option sensitivities.
///
/// Theta is per calendar day; vega and rho are per one percentage point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
}

impl Greeks {
    fn nan() -> Self {
        Self {
            delta: f64::NAN,
            gamma: f64::NAN,
            theta: f64::NAN,
            vega: f64::NAN,
            rho: f64::NAN,
        }
    }
}

/// Theoretical European option price. `NaN` when time or volatility is not positive.
pub fn black_scholes_price(inputs: &BsInputs) -> f64 {
    if inputs.is_degenerate() {
        return f64::NAN;
    }
    let (d1, d2) = inputs.d1_d2();
    let discount = (-inputs.rate * inputs.time_years).exp();
    match inputs.option_type {
        OptionType::Call => inputs.spot * norm_cdf(d1) - inputs.strike * discount * norm_cdf(d2),
        OptionType::Put => inputs.strike * discount * norm_cdf(-d2) - inputs.spot * norm_cdf(-d1),
    }
}

/// Closed-form Greeks. All fields are `NaN` for degenerate inputs.
pub fn greeks(inputs: &BsInputs) -> Greeks {
    if inputs.is_degenerate() {
        return Greeks::nan();
    }
    let BsInputs {
        spot: s,
        strike: k,
        time_years: t,
        rate: r,
        volatility: vol,
        option_type,
    } = *inputs;
    let (d1, d2) = inputs.d1_d2();
    let sqrt_t = t.sqrt();
    let discount = (-r * t).exp();
    let pdf_d1 = norm_pdf(d1);

    let gamma = pdf_d1 / (s * vol * sqrt_t);
    let vega = s * pdf_d1 * sqrt_t / 100.0;
    let decay = -s * pdf_d1 * vol / (2.0 * sqrt_t);

    let (delta, theta, rho) = match option_type {
        OptionType::Call => (
            norm_cdf(d1),
            (decay - r * k * discount * norm_cdf(d2)) / DAYS_PER_YEAR,
            k * t * discount * norm_cdf(d2) / 100.0,
        ),
        OptionType::Put => (
            norm_cdf(d1) - 1.0,
            (decay + r * k * discount * norm_cdf(-d2)) / DAYS_PER_YEAR,
            -k * t * discount * norm_cdf(-d2) / 100.0,
        ),
    };

    Greeks {
        delta,
        gamma,
        theta,
        vega,
        rho,
    }
}
