//! Probability of profit under a lognormal terminal price.
//!
//! Each shape reduces to one or two breakeven prices. A breakeven `b` maps to
//! `z = (ln(b / S) - (r - σ²/2)·T) / (σ·√T)` and the profitable region is read
//! off the standard normal tails. All results are in `[0, 1]`, or `NaN` when
//! the model is degenerate.

use super::normal::norm_cdf;

/// Terminal price distribution for one underlying and one expiry.
#[derive(Debug, Clone, Copy)]
pub struct LognormalModel {
    pub spot: f64,
    /// Annualized volatility
    pub volatility: f64,
    pub time_years: f64,
    pub rate: f64,
}

impl LognormalModel {
    pub fn new(spot: f64, volatility: f64, time_years: f64, rate: f64) -> Self {
        Self {
            spot,
            volatility,
            time_years,
            rate,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.spot > 0.0 && self.volatility > 0.0 && self.time_years > 0.0)
    }

    fn z(&self, price: f64) -> f64 {
        let drift = (self.rate - 0.5 * self.volatility * self.volatility) * self.time_years;
        ((price / self.spot).ln() - drift) / (self.volatility * self.time_years.sqrt())
    }

    fn cdf_at(&self, price: f64) -> f64 {
        if self.is_degenerate() {
            return f64::NAN;
        }
        if price <= 0.0 {
            // Price cannot finish at or below zero
            return 0.0;
        }
        norm_cdf(self.z(price))
    }

    /// P(S_T > b)
    pub fn right_tail(&self, b: f64) -> f64 {
        1.0 - self.cdf_at(b)
    }

    /// P(S_T < b)
    pub fn left_tail(&self, b: f64) -> f64 {
        self.cdf_at(b)
    }

    /// P(low < S_T < high)
    pub fn between(&self, low: f64, high: f64) -> f64 {
        let p = self.cdf_at(high) - self.cdf_at(low);
        if p.is_nan() {
            return p;
        }
        p.max(0.0)
    }

    /// P(S_T < low or S_T > high)
    pub fn outside(&self, low: f64, high: f64) -> f64 {
        1.0 - self.between(low, high)
    }

    // ---- single leg ----

    pub fn pop_long_call(&self, strike: f64, premium: f64) -> f64 {
        self.right_tail(strike + premium)
    }

    pub fn pop_long_put(&self, strike: f64, premium: f64) -> f64 {
        self.left_tail(strike - premium)
    }

    pub fn pop_short_call(&self, strike: f64, credit: f64) -> f64 {
        self.left_tail(strike + credit)
    }

    pub fn pop_short_put(&self, strike: f64, credit: f64) -> f64 {
        self.right_tail(strike - credit)
    }

    // ---- verticals ----

    /// Long the lower strike call, short the higher.
    pub fn pop_bull_call(&self, long_strike: f64, short_strike: f64, debit: f64) -> f64 {
        if debit >= short_strike - long_strike {
            return 0.0;
        }
        self.right_tail(long_strike + debit)
    }

    /// Long the higher strike put, short the lower.
    pub fn pop_bear_put(&self, long_strike: f64, short_strike: f64, debit: f64) -> f64 {
        if debit >= long_strike - short_strike {
            return 0.0;
        }
        self.left_tail(long_strike - debit)
    }

    pub fn pop_bull_put(&self, short_strike: f64, credit: f64) -> f64 {
        self.right_tail(short_strike - credit)
    }

    pub fn pop_bear_call(&self, short_strike: f64, credit: f64) -> f64 {
        self.left_tail(short_strike + credit)
    }

    // ---- iron structures ----

    pub fn pop_iron_condor(&self, short_put: f64, short_call: f64, credit: f64) -> f64 {
        self.between(short_put - credit, short_call + credit)
    }

    pub fn pop_iron_butterfly(&self, body: f64, credit: f64) -> f64 {
        self.between(body - credit, body + credit)
    }

    // ---- straddles and strangles ----

    pub fn pop_short_straddle(&self, strike: f64, credit: f64) -> f64 {
        self.between(strike - credit, strike + credit)
    }

    pub fn pop_long_straddle(&self, strike: f64, debit: f64) -> f64 {
        self.outside(strike - debit, strike + debit)
    }

    pub fn pop_short_strangle(&self, put_strike: f64, call_strike: f64, credit: f64) -> f64 {
        self.between(put_strike - credit, call_strike + credit)
    }

    pub fn pop_long_strangle(&self, put_strike: f64, call_strike: f64, debit: f64) -> f64 {
        self.outside(put_strike - debit, call_strike + debit)
    }

    // ---- others ----

    /// Long stock, long put, short call.
    pub fn pop_collar(&self, put_premium: f64, call_strike: f64, call_premium: f64) -> f64 {
        let net_debit = put_premium - call_premium;
        self.between(self.spot - net_debit, call_strike - net_debit)
    }
}

/// Convert a model probability into a reported chance in `[0, 100]`.
///
/// Unknown (`NaN`) probabilities are reported as 0.
pub fn pop_percent(probability: f64) -> f64 {
    if probability.is_nan() {
        return 0.0;
    }
    (probability * 100.0).clamp(0.0, 100.0)
}
