//! Chain snapshot data model.
//!
//! Contracts arrive from external feeds with inconsistent typing (numbers as
//! strings, nulls, NaN). Deserialization coerces every numeric field so that
//! one bad row never aborts a recommendation pass.

pub use crate::math::OptionType;
use crate::utils::coerce_number;
use chrono::DateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One option contract row of a chain snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    #[serde(default)]
    pub symbol: String,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub strike_price: f64,
    /// Expiration date (`YYYY-MM-DD`)
    #[serde(default, deserialize_with = "lenient_date")]
    pub expiry: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub bid: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ask: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub last: f64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub open_interest: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub volume: u64,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub in_the_money: bool,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub underlying_price: f64,
    /// Implied volatility as a decimal (0.25 = 25%)
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub iv: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub delta: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub gamma: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub theta: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub vega: Option<f64>,
}

impl Contract {
    /// Create a contract with no quote, activity or Greeks.
    pub fn new(symbol: impl Into<String>, option_type: OptionType, strike_price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            option_type,
            strike_price,
            expiry: String::new(),
            bid: 0.0,
            ask: 0.0,
            last: 0.0,
            open_interest: 0,
            volume: 0,
            in_the_money: false,
            underlying_price: 0.0,
            iv: None,
            delta: None,
            gamma: None,
            theta: None,
            vega: None,
        }
    }

    /// Set bid and ask.
    pub fn with_quote(mut self, bid: f64, ask: f64) -> Self {
        self.bid = bid;
        self.ask = ask;
        self
    }

    /// Set open interest and volume.
    pub fn with_activity(mut self, open_interest: u64, volume: u64) -> Self {
        self.open_interest = open_interest;
        self.volume = volume;
        self
    }

    pub fn with_iv(mut self, iv: f64) -> Self {
        self.iv = Some(iv);
        self
    }

    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = Some(delta);
        self
    }

    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    pub fn is_call(&self) -> bool {
        self.option_type == OptionType::Call
    }

    pub fn is_put(&self) -> bool {
        self.option_type == OptionType::Put
    }
}

/// Underlying quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(deserialize_with = "lenient_f64")]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
    #[serde(default, alias = "changePercent", skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Quote {
    pub fn new(price: f64) -> Self {
        Self {
            price,
            change: None,
            change_percent: None,
            currency: None,
            name: None,
        }
    }
}

/// Full chain snapshot for one expiration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionChain {
    #[serde(default)]
    pub results: Vec<Contract>,
}

impl OptionChain {
    pub fn new(results: Vec<Contract>) -> Self {
        Self { results }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_number(&value))
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let n = lenient_f64(deserializer)?;
    Ok(if n > 0.0 { n.round() as u64 } else { 0 })
}

fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(n.filter(|v| v.is_finite()))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        other => coerce_number(&other) != 0.0,
    })
}

/// Accepts either a date string or a unix timestamp in seconds.
fn lenient_date<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.date_naive().to_string())
            .unwrap_or_default(),
        _ => String::new(),
    })
}
