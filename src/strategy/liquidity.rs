//! Tradability gate and liquidity score.

use crate::config::LiquidityConfig;
use crate::market::Contract;

/// Admits contracts with a meaningful mid and some activity.
#[derive(Debug, Clone)]
pub struct LiquidityGate {
    config: LiquidityConfig,
}

impl Default for LiquidityGate {
    fn default() -> Self {
        Self::new(LiquidityConfig::default())
    }
}

impl LiquidityGate {
    pub fn new(config: LiquidityConfig) -> Self {
        Self { config }
    }

    /// Mid above the minimum and open interest plus volume above zero.
    pub fn admits(&self, contract: &Contract) -> bool {
        contract.mid() > self.config.min_mid_price
            && contract.open_interest.saturating_add(contract.volume) > 0
    }

    /// Liquidity score in [0, 1] for a set of contracts.
    ///
    /// Blends average bid/ask tightness (legs with both sides quoted) with
    /// log-scaled aggregate open interest and volume.
    pub fn score<'a>(&self, contracts: impl IntoIterator<Item = &'a Contract>) -> f64 {
        let mut open_interest = 0u64;
        let mut volume = 0u64;
        let mut tightness = 0.0;
        let mut quoted = 0usize;

        for c in contracts {
            open_interest = open_interest.saturating_add(c.open_interest);
            volume = volume.saturating_add(c.volume);
            if c.bid > 0.0 && c.ask > 0.0 {
                tightness += (1.0 - (c.ask - c.bid) / c.ask.max(0.01)).max(0.0);
                quoted += 1;
            }
        }

        let oi_score = (open_interest as f64 + 1.0).log10() / self.config.log_scale;
        let vol_score = (volume as f64 + 1.0).log10() / self.config.log_scale;
        let tightness_score = if quoted > 0 {
            tightness / quoted as f64
        } else {
            0.0
        };

        let blended = self.config.tightness_weight * tightness_score
            + self.config.open_interest_weight * oi_score
            + self.config.volume_weight * vol_score;
        blended.clamp(0.0, 1.0)
    }
}

/// Default gate: mid > 0.05 and open interest + volume > 0.
pub fn is_liquid(contract: &Contract) -> bool {
    LiquidityGate::default().admits(contract)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::OptionType;

    fn contract(bid: f64, ask: f64, oi: u64, vol: u64) -> Contract {
        Contract::new("X", OptionType::Call, 100.0)
            .with_quote(bid, ask)
            .with_activity(oi, vol)
    }

    #[test]
    fn test_gate_thresholds() {
        assert!(is_liquid(&contract(1.0, 1.1, 10, 0)));
        assert!(is_liquid(&contract(0.05, 0.07, 0, 1)));
        // Mid exactly 0.05 is rejected
        assert!(!is_liquid(&contract(0.04, 0.06, 100, 100)));
        assert!(!is_liquid(&contract(1.0, 1.1, 0, 0)));
        assert!(!is_liquid(&contract(0.0, 0.0, 100, 100)));
    }

    #[test]
    fn test_gate_reads_mid_not_sides() {
        // No bid, but the mid clears the floor
        assert!(is_liquid(&contract(0.0, 0.5, 10, 0)));
        // Crossed quote with a high mid still passes
        assert!(is_liquid(&contract(1.2, 1.0, 10, 0)));
        assert!(!is_liquid(&contract(0.0, 0.1, 10, 0)));
    }

    #[test]
    fn test_score_blend() {
        let gate = LiquidityGate::default();
        // Perfectly tight, 9 999 OI and 9 999 volume: 0.6 + 0.2 + 0.2
        let c = contract(1.0, 1.0, 9_999, 9_999);
        assert!((gate.score([&c]) - 1.0).abs() < 1e-9);

        // Half-wide market, no activity
        let c = contract(0.5, 1.0, 0, 0);
        assert!((gate.score([&c]) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_unquoted_legs_skip_tightness() {
        let gate = LiquidityGate::default();
        let quoted = contract(1.0, 1.0, 0, 0);
        let one_sided = contract(0.0, 1.0, 0, 0);
        assert!((gate.score([&quoted, &one_sided]) - 0.6).abs() < 1e-9);
        assert_eq!(gate.score(std::iter::empty::<&Contract>()), 0.0);
    }

    #[test]
    fn test_score_is_clamped() {
        let gate = LiquidityGate::default();
        let c = contract(1.0, 1.0, 10_000_000, 10_000_000);
        assert_eq!(gate.score([&c]), 1.0);
    }
}
