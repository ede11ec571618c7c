//! At-the-money volatility and the one-sigma dollar move fed to the engine.

use super::strike_index::StrikeIndex;
use super::types::Contract;
use crate::math::implied_move;
use chrono::NaiveDate;
use serde::Serialize;

/// Average IV of the nearest-strike call and put, or whichever one has an IV.
pub fn atm_implied_vol(contracts: &[Contract], spot: f64) -> Option<f64> {
    let calls = StrikeIndex::new(contracts.iter().filter(|c| c.is_call()));
    let puts = StrikeIndex::new(contracts.iter().filter(|c| c.is_put()));
    let positive = |c: &Contract| c.iv.filter(|iv| *iv > 0.0);

    let call_iv = calls.nearest(spot).and_then(positive);
    let put_iv = puts.nearest(spot).and_then(positive);
    match (call_iv, put_iv) {
        (Some(c), Some(p)) => Some((c + p) / 2.0),
        (c, p) => c.or(p),
    }
}

/// Whole calendar days from `as_of` until `expiration` (negative once expired).
pub fn days_to_expiry(expiration: NaiveDate, as_of: NaiveDate) -> i64 {
    (expiration - as_of).num_days()
}

/// Volatility inputs derived from a chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolatilityEstimate {
    pub atm_iv: f64,
    pub days_to_expiry: i64,
    /// One-standard-deviation move in dollars
    pub sigma: f64,
}

impl VolatilityEstimate {
    /// `None` when the chain has no usable ATM IV or the expiration is not in the future.
    pub fn from_chain(
        contracts: &[Contract],
        spot: f64,
        expiration: NaiveDate,
        as_of: NaiveDate,
    ) -> Option<Self> {
        let atm_iv = atm_implied_vol(contracts, spot)?;
        let dte = days_to_expiry(expiration, as_of);
        if dte <= 0 || spot <= 0.0 {
            return None;
        }
        Some(Self {
            atm_iv,
            days_to_expiry: dte,
            sigma: implied_move(spot, atm_iv, dte as f64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::OptionType;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_atm_iv_averages_call_and_put() {
        let contracts = vec![
            Contract::new("C95", OptionType::Call, 95.0).with_iv(0.40),
            Contract::new("C100", OptionType::Call, 100.0).with_iv(0.30),
            Contract::new("P100", OptionType::Put, 100.0).with_iv(0.34),
            Contract::new("P90", OptionType::Put, 90.0).with_iv(0.50),
        ];
        let iv = atm_implied_vol(&contracts, 101.0).unwrap();
        assert!((iv - 0.32).abs() < 1e-12);
    }

    #[test]
    fn test_atm_iv_falls_back_to_one_side() {
        let contracts = vec![
            Contract::new("C100", OptionType::Call, 100.0),
            Contract::new("P100", OptionType::Put, 100.0).with_iv(0.28),
        ];
        assert_eq!(atm_implied_vol(&contracts, 100.0), Some(0.28));
        assert_eq!(atm_implied_vol(&[], 100.0), None);
    }

    #[test]
    fn test_estimate() {
        let contracts = vec![
            Contract::new("C100", OptionType::Call, 100.0).with_iv(0.30),
            Contract::new("P100", OptionType::Put, 100.0).with_iv(0.30),
        ];
        let est =
            VolatilityEstimate::from_chain(&contracts, 100.0, date("2025-02-14"), date("2025-01-15"))
                .unwrap();
        assert_eq!(est.days_to_expiry, 30);
        assert!((est.sigma - 100.0 * 0.30 * (30.0f64 / 365.0).sqrt()).abs() < 1e-9);

        assert!(
            VolatilityEstimate::from_chain(&contracts, 100.0, date("2025-01-15"), date("2025-01-15"))
                .is_none()
        );
    }
}
