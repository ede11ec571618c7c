//! Strategy engine inputs and outputs.

use crate::market::{Contract, Quote};
use crate::math::target_price;
use crate::utils::parse_budget;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// User's market view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    VeryBearish,
    Bearish,
    Neutral,
    Bullish,
    VeryBullish,
    Directional,
}

impl Sentiment {
    /// Fold the "very" categories into their plain counterpart.
    pub fn normalized(self) -> Self {
        match self {
            Sentiment::VeryBullish => Sentiment::Bullish,
            Sentiment::VeryBearish => Sentiment::Bearish,
            other => other,
        }
    }

    /// Multiple of the implied move used to derive a price target.
    pub fn implied_move_multiple(self) -> f64 {
        match self {
            Sentiment::VeryBullish => 2.0,
            Sentiment::Bullish => 1.0,
            Sentiment::Neutral => 0.0,
            Sentiment::Bearish => -1.0,
            Sentiment::VeryBearish => -2.0,
            Sentiment::Directional => 0.5,
        }
    }

    /// Price target for this view given a one-sigma move.
    pub fn target_price(self, current_price: f64, implied_move: f64) -> f64 {
        target_price(current_price, implied_move, self.implied_move_multiple())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::VeryBearish => "very_bearish",
            Sentiment::Bearish => "bearish",
            Sentiment::Neutral => "neutral",
            Sentiment::Bullish => "bullish",
            Sentiment::VeryBullish => "very_bullish",
            Sentiment::Directional => "directional",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "very_bearish" => Ok(Sentiment::VeryBearish),
            "bearish" => Ok(Sentiment::Bearish),
            "neutral" => Ok(Sentiment::Neutral),
            "bullish" => Ok(Sentiment::Bullish),
            "very_bullish" => Ok(Sentiment::VeryBullish),
            "directional" => Ok(Sentiment::Directional),
            other => Err(format!("unknown sentiment '{other}'")),
        }
    }
}

/// Everything the user supplies for one recommendation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInputs {
    pub ticker: String,
    pub quote: Option<Quote>,
    pub sentiment: Option<Sentiment>,
    /// Risk/reward slider in [0, 100]: 0 favours probability, 100 favours return
    pub risk_reward: f64,
    /// Free-form target price; empty when not set
    #[serde(default)]
    pub target_price: String,
    /// Free-form budget such as "$2,500"; empty when not set
    #[serde(default)]
    pub budget: String,
    pub expiration: Option<NaiveDate>,
    /// Day the chain was observed, used for time to expiry
    pub valuation_date: NaiveDate,
}

impl UserInputs {
    /// Underlying price, if a usable quote is present.
    pub fn spot(&self) -> Option<f64> {
        self.quote
            .as_ref()
            .map(|q| q.price)
            .filter(|p| p.is_finite() && *p > 0.0)
    }

    pub fn budget(&self) -> Option<Decimal> {
        parse_budget(&self.budget)
    }

    pub fn target(&self) -> Option<f64> {
        self.target_price
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|t| t.is_finite())
    }

    /// Years to expiry, floored at one day. `None` without an expiration.
    pub fn time_to_expiry(&self) -> Option<f64> {
        let expiration = self.expiration?;
        let days = (expiration - self.valuation_date).num_days() as f64;
        Some((days / crate::math::DAYS_PER_YEAR).max(1.0 / crate::math::DAYS_PER_YEAR))
    }
}

/// Long or short a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

/// One contract of a strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leg {
    pub side: Side,
    pub contract: Contract,
}

impl Leg {
    pub fn long(contract: &Contract) -> Self {
        Self {
            side: Side::Long,
            contract: contract.clone(),
        }
    }

    pub fn short(contract: &Contract) -> Self {
        Self {
            side: Side::Short,
            contract: contract.clone(),
        }
    }

    /// Fill price per share: pay the ask when buying, receive the bid when selling.
    pub fn premium(&self) -> f64 {
        match self.side {
            Side::Long => self.contract.ask,
            Side::Short => self.contract.bid,
        }
    }
}

/// A money amount that may be unlimited.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Finite(f64),
    Unbounded,
}

impl Bound {
    pub fn finite(self) -> Option<f64> {
        match self {
            Bound::Finite(v) => Some(v),
            Bound::Unbounded => None,
        }
    }

    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Bound::Finite(v) => Bound::Finite(f(v)),
            Bound::Unbounded => Bound::Unbounded,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Finite(v) => write!(f, "{v:.2}"),
            Bound::Unbounded => f.write_str("unlimited"),
        }
    }
}

/// Finite amounts serialize as numbers, unlimited ones as the string `"unbounded"`.
impl Serialize for Bound {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Bound::Finite(v) => serializer.serialize_f64(*v),
            Bound::Unbounded => serializer.serialize_str("unbounded"),
        }
    }
}

/// `profit / risk * 100`.
///
/// Unbounded reward over a finite positive risk is unbounded; any other
/// undefined ratio (zero or unbounded risk) is 0.
pub fn return_on_risk(profit: Bound, risk: Bound) -> Bound {
    match (profit, risk) {
        (Bound::Finite(p), Bound::Finite(r)) if r > 0.0 => Bound::Finite(p / r * 100.0),
        (Bound::Unbounded, Bound::Finite(r)) if r > 0.0 => Bound::Unbounded,
        _ => Bound::Finite(0.0),
    }
}

/// Vertex of the expiry payoff polyline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PayoffPoint {
    pub price: f64,
    pub profit: f64,
}

/// Strategy shapes the engine can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    LongCall,
    LongPut,
    ShortCall,
    ShortPut,
    BullCallSpread,
    BearPutSpread,
    BullPutSpread,
    BearCallSpread,
    IronCondor,
    IronButterfly,
    InverseIronCondor,
    InverseIronButterfly,
    Straddle,
    Strangle,
    ShortStraddle,
    ShortStrangle,
    CoveredCall,
    CashSecuredPut,
}

const BULLISH: &[Sentiment] = &[Sentiment::Bullish, Sentiment::VeryBullish];
const BEARISH: &[Sentiment] = &[Sentiment::Bearish, Sentiment::VeryBearish];
const NEUTRAL: &[Sentiment] = &[Sentiment::Neutral];
const DIRECTIONAL: &[Sentiment] = &[Sentiment::Directional];

impl StrategyKind {
    pub fn label(&self) -> &'static str {
        match self {
            StrategyKind::LongCall => "Long Call",
            StrategyKind::LongPut => "Long Put",
            StrategyKind::ShortCall => "Short Call",
            StrategyKind::ShortPut => "Short Put",
            StrategyKind::BullCallSpread => "Bull Call Spread",
            StrategyKind::BearPutSpread => "Bear Put Spread",
            StrategyKind::BullPutSpread => "Bull Put Spread",
            StrategyKind::BearCallSpread => "Bear Call Spread",
            StrategyKind::IronCondor => "Iron Condor",
            StrategyKind::IronButterfly => "Iron Butterfly",
            StrategyKind::InverseIronCondor => "Inverse Iron Condor",
            StrategyKind::InverseIronButterfly => "Inverse Iron Butterfly",
            StrategyKind::Straddle => "Straddle",
            StrategyKind::Strangle => "Strangle",
            StrategyKind::ShortStraddle => "Short Straddle",
            StrategyKind::ShortStrangle => "Short Strangle",
            StrategyKind::CoveredCall => "Covered Call",
            StrategyKind::CashSecuredPut => "Cash-Secured Put",
        }
    }

    /// Sentiments this shape is offered for.
    pub fn sentiment_fit(&self) -> &'static [Sentiment] {
        match self {
            StrategyKind::LongCall
            | StrategyKind::ShortPut
            | StrategyKind::BullCallSpread
            | StrategyKind::BullPutSpread
            | StrategyKind::CoveredCall
            | StrategyKind::CashSecuredPut => BULLISH,
            StrategyKind::LongPut
            | StrategyKind::ShortCall
            | StrategyKind::BearPutSpread
            | StrategyKind::BearCallSpread => BEARISH,
            StrategyKind::IronCondor
            | StrategyKind::IronButterfly
            | StrategyKind::ShortStraddle
            | StrategyKind::ShortStrangle => NEUTRAL,
            StrategyKind::Straddle
            | StrategyKind::Strangle
            | StrategyKind::InverseIronCondor
            | StrategyKind::InverseIronButterfly => DIRECTIONAL,
        }
    }

    /// Whether this shape serves a (raw or normalized) sentiment.
    pub fn serves(&self, sentiment: Sentiment) -> bool {
        self.sentiment_fit().contains(&sentiment.normalized())
    }

    /// Shapes outside the core catalogue, toggled by configuration.
    pub fn is_extended(&self) -> bool {
        matches!(
            self,
            StrategyKind::BearCallSpread
                | StrategyKind::InverseIronCondor
                | StrategyKind::InverseIronButterfly
                | StrategyKind::ShortStraddle
                | StrategyKind::ShortStrangle
        )
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One fully evaluated candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyResult {
    /// Human label with key strikes, e.g. "Bull Call Spread (150/155)"
    pub name: String,
    pub kind: StrategyKind,
    pub legs: Vec<Leg>,
    /// Shares of the underlying held alongside the options (covered call)
    #[serde(skip_serializing_if = "is_zero")]
    pub underlying_shares: u32,
    /// Percent
    pub return_on_risk: Bound,
    /// Probability of profit in [0, 100]
    pub chance: f64,
    /// Max profit
    pub profit: Bound,
    /// Max loss
    pub risk: Bound,
    pub required_capital: f64,
    pub sentiment_fit: Vec<Sentiment>,
    /// Lower breakeven
    pub break_even: f64,
    /// All breakevens ascending
    pub break_evens: Vec<f64>,
    pub payoff_points: Vec<PayoffPoint>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl StrategyResult {
    pub fn contracts(&self) -> impl Iterator<Item = &Contract> {
        self.legs.iter().map(|l| &l.contract)
    }
}

/// A candidate with its normalized metrics and combined score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredStrategy {
    #[serde(flatten)]
    pub strategy: StrategyResult,
    pub ror_scaled: f64,
    pub cop_scaled: f64,
    pub cap_eff_scaled: f64,
    pub liquidity_scaled: f64,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> UserInputs {
        UserInputs {
            ticker: "AAPL".to_string(),
            quote: Some(Quote::new(150.0)),
            sentiment: Some(Sentiment::VeryBullish),
            risk_reward: 50.0,
            target_price: " 160.5 ".to_string(),
            budget: "$1,000".to_string(),
            expiration: NaiveDate::from_ymd_opt(2025, 2, 14),
            valuation_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        }
    }

    #[test]
    fn test_sentiment_parse_and_normalize() {
        assert_eq!("very-bullish".parse::<Sentiment>(), Ok(Sentiment::VeryBullish));
        assert_eq!("Neutral".parse::<Sentiment>(), Ok(Sentiment::Neutral));
        assert!("sideways".parse::<Sentiment>().is_err());
        assert_eq!(Sentiment::VeryBearish.normalized(), Sentiment::Bearish);
        assert_eq!(Sentiment::Directional.normalized(), Sentiment::Directional);
    }

    #[test]
    fn test_targets_by_sentiment() {
        let cases = [
            (Sentiment::VeryBullish, 120.0),
            (Sentiment::Bullish, 110.0),
            (Sentiment::Neutral, 100.0),
            (Sentiment::Bearish, 90.0),
            (Sentiment::VeryBearish, 80.0),
            (Sentiment::Directional, 105.0),
        ];
        for (sentiment, expected) in cases {
            assert_eq!(sentiment.target_price(100.0, 10.0), expected);
        }
    }

    #[test]
    fn test_user_input_accessors() {
        let user = inputs();
        assert_eq!(user.spot(), Some(150.0));
        assert_eq!(user.target(), Some(160.5));
        assert_eq!(user.budget(), Some(Decimal::from(1000)));
        let t = user.time_to_expiry().unwrap();
        assert!((t - 30.0 / 365.0).abs() < 1e-12);
    }

    #[test]
    fn test_expired_time_is_floored_at_one_day() {
        let mut user = inputs();
        user.expiration = NaiveDate::from_ymd_opt(2025, 1, 10);
        assert_eq!(user.time_to_expiry(), Some(1.0 / 365.0));
        user.expiration = None;
        assert_eq!(user.time_to_expiry(), None);
    }

    #[test]
    fn test_return_on_risk() {
        assert_eq!(return_on_risk(Bound::Finite(300.0), Bound::Finite(200.0)), Bound::Finite(150.0));
        assert_eq!(return_on_risk(Bound::Unbounded, Bound::Finite(200.0)), Bound::Unbounded);
        assert_eq!(return_on_risk(Bound::Finite(50.0), Bound::Unbounded), Bound::Finite(0.0));
        assert_eq!(return_on_risk(Bound::Finite(50.0), Bound::Finite(0.0)), Bound::Finite(0.0));
    }

    #[test]
    fn test_bound_serialization() {
        assert_eq!(serde_json::to_string(&Bound::Finite(2.5)).unwrap(), "2.5");
        assert_eq!(serde_json::to_string(&Bound::Unbounded).unwrap(), "\"unbounded\"");
    }

    #[test]
    fn test_sentiment_fit() {
        assert!(StrategyKind::LongCall.serves(Sentiment::VeryBullish));
        assert!(!StrategyKind::LongCall.serves(Sentiment::Neutral));
        assert!(StrategyKind::BearCallSpread.serves(Sentiment::VeryBearish));
        assert!(StrategyKind::Strangle.serves(Sentiment::Directional));
        assert!(StrategyKind::ShortStraddle.is_extended());
        assert!(!StrategyKind::IronCondor.is_extended());
    }
}
