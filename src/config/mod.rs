//! Configuration management for the options recommender.
//!
//! Loads settings from `.env`, an optional `config.{toml,yaml,json}` file and
//! `OPTREC__`-prefixed environment variables, in that order.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Quote and option chain sources
    #[serde(default)]
    pub market_data: MarketDataConfig,
    /// Strategy construction parameters
    #[serde(default)]
    pub engine: EngineConfig,
    /// Tradability gate and liquidity score
    #[serde(default)]
    pub liquidity: LiquidityConfig,
    /// Ranking weights and clamps
    #[serde(default)]
    pub scoring: ScoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDataConfig {
    /// MarketData.app base URL (option chains)
    #[serde(default = "default_chain_base_url")]
    pub chain_base_url: String,
    /// MarketData.app API token
    #[serde(default)]
    pub chain_api_key: String,
    /// Finnhub base URL (quotes)
    #[serde(default = "default_quote_base_url")]
    pub quote_base_url: String,
    /// Finnhub API token
    #[serde(default)]
    pub quote_api_key: String,
    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Directory holding `{TICKER}_{YYYY-MM-DD}.json` chain snapshots
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: String,
}

/// How probability of profit is estimated for shapes that historically used rough constants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopModel {
    /// Lognormal closed forms for every shape
    #[default]
    Analytic,
    /// Delta-based and constant estimates where the legacy engine used them
    Legacy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Annual risk-free rate used in the lognormal drift
    #[serde(default)]
    pub risk_free_rate: f64,
    /// Volatility assumed for contracts without an implied volatility
    #[serde(default = "default_volatility")]
    pub default_volatility: f64,
    /// Standard deviations of move used to cap long option profit
    #[serde(default = "default_profit_target_sd")]
    pub profit_target_sd: f64,
    /// Narrowest vertical spread considered, in dollars
    #[serde(default = "default_min_spread_width")]
    pub min_spread_width: f64,
    /// Widest vertical spread considered, as a fraction of spot
    /// (never narrower than `min_spread_width`)
    #[serde(default = "default_max_spread_width_pct")]
    pub max_spread_width_pct: f64,
    /// Max call/put strike gap for a straddle pair, as a fraction of spot
    #[serde(default = "default_straddle_strike_tolerance_pct")]
    pub straddle_strike_tolerance_pct: f64,
    /// Short puts with a lower PoP (percent) are not offered
    #[serde(default = "default_min_short_put_pop")]
    pub min_short_put_pop: f64,
    #[serde(default)]
    pub pop_model: PopModel,
    /// Also build inverse iron structures and short straddles/strangles
    #[serde(default = "default_true")]
    pub include_extended_shapes: bool,
    /// Drop candidates that lose money at the user's target price
    #[serde(default)]
    pub require_profit_at_target: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityConfig {
    /// Mid price must be strictly above this
    #[serde(default = "default_min_mid_price")]
    pub min_mid_price: f64,
    #[serde(default = "default_tightness_weight")]
    pub tightness_weight: f64,
    #[serde(default = "default_activity_weight")]
    pub open_interest_weight: f64,
    #[serde(default = "default_activity_weight")]
    pub volume_weight: f64,
    /// log10 divisor for open interest and volume (4 = 10 000 contracts saturates)
    #[serde(default = "default_log_scale")]
    pub log_scale: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_capital_efficiency_weight")]
    pub capital_efficiency_weight: f64,
    #[serde(default = "default_liquidity_weight")]
    pub liquidity_weight: f64,
    /// Return on risk (percent) assigned to unbounded reward before the log transform
    #[serde(default = "default_max_return_on_risk")]
    pub max_return_on_risk: f64,
    /// Capital efficiency assigned to unbounded reward
    #[serde(default = "default_max_capital_efficiency")]
    pub max_capital_efficiency: f64,
}

// Default value functions
fn default_chain_base_url() -> String {
    "https://api.marketdata.app".to_string()
}

fn default_quote_base_url() -> String {
    "https://finnhub.io".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_snapshot_dir() -> String {
    "data/snapshots".to_string()
}

fn default_volatility() -> f64 {
    0.25
}

fn default_profit_target_sd() -> f64 {
    1.5
}

fn default_min_spread_width() -> f64 {
    1.0
}

fn default_max_spread_width_pct() -> f64 {
    0.10
}

fn default_straddle_strike_tolerance_pct() -> f64 {
    0.05
}

fn default_min_short_put_pop() -> f64 {
    10.0
}

fn default_true() -> bool {
    true
}

fn default_min_mid_price() -> f64 {
    0.05
}

fn default_tightness_weight() -> f64 {
    0.6
}

fn default_activity_weight() -> f64 {
    0.2
}

fn default_log_scale() -> f64 {
    4.0
}

fn default_capital_efficiency_weight() -> f64 {
    0.15
}

fn default_liquidity_weight() -> f64 {
    0.10
}

fn default_max_return_on_risk() -> f64 {
    10_000.0
}

fn default_max_capital_efficiency() -> f64 {
    10.0
}

impl Config {
    /// Load configuration from environment variables and config files.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::default().separator("__").prefix("OPTREC"))
            .build()
            .context("Failed to build configuration")?;

        let mut config: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Conventional provider variables as a fallback
        if config.market_data.chain_api_key.is_empty() {
            if let Ok(key) = std::env::var("MARKETDATA_API_KEY") {
                config.market_data.chain_api_key = key;
            }
        }
        if config.market_data.quote_api_key.is_empty() {
            if let Ok(key) = std::env::var("FINNHUB_API_KEY") {
                config.market_data.quote_api_key = key;
            }
        }

        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        let engine = &self.engine;
        anyhow::ensure!(
            engine.default_volatility > 0.0 && engine.default_volatility <= 5.0,
            "default_volatility must be in (0, 5]"
        );
        anyhow::ensure!(
            engine.risk_free_rate.abs() < 1.0,
            "risk_free_rate must be a decimal rate, e.g. 0.05"
        );
        anyhow::ensure!(engine.profit_target_sd > 0.0, "profit_target_sd must be positive");
        anyhow::ensure!(engine.min_spread_width > 0.0, "min_spread_width must be positive");
        anyhow::ensure!(
            engine.max_spread_width_pct > 0.0 && engine.max_spread_width_pct <= 1.0,
            "max_spread_width_pct must be in (0, 1]"
        );
        anyhow::ensure!(
            (0.0..=0.5).contains(&engine.straddle_strike_tolerance_pct),
            "straddle_strike_tolerance_pct must be in [0, 0.5]"
        );
        anyhow::ensure!(
            (0.0..=100.0).contains(&engine.min_short_put_pop),
            "min_short_put_pop must be a percentage"
        );

        let liq = &self.liquidity;
        anyhow::ensure!(liq.min_mid_price >= 0.0, "min_mid_price must not be negative");
        anyhow::ensure!(liq.log_scale > 0.0, "log_scale must be positive");
        anyhow::ensure!(
            liq.tightness_weight >= 0.0 && liq.open_interest_weight >= 0.0 && liq.volume_weight >= 0.0,
            "liquidity weights must not be negative"
        );
        anyhow::ensure!(
            (liq.tightness_weight + liq.open_interest_weight + liq.volume_weight - 1.0).abs() < 1e-9,
            "liquidity weights must sum to 1"
        );

        let scoring = &self.scoring;
        anyhow::ensure!(
            scoring.capital_efficiency_weight >= 0.0 && scoring.liquidity_weight >= 0.0,
            "scoring weights must not be negative"
        );
        anyhow::ensure!(
            scoring.max_return_on_risk >= 100.0,
            "max_return_on_risk must be at least 100 (percent)"
        );
        anyhow::ensure!(
            scoring.max_capital_efficiency > 0.0,
            "max_capital_efficiency must be positive"
        );

        anyhow::ensure!(
            self.market_data.request_timeout_secs > 0,
            "request_timeout_secs must be positive"
        );

        Ok(())
    }
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            chain_base_url: default_chain_base_url(),
            chain_api_key: String::new(),
            quote_base_url: default_quote_base_url(),
            quote_api_key: String::new(),
            request_timeout_secs: default_request_timeout(),
            snapshot_dir: default_snapshot_dir(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.0,
            default_volatility: default_volatility(),
            profit_target_sd: default_profit_target_sd(),
            min_spread_width: default_min_spread_width(),
            max_spread_width_pct: default_max_spread_width_pct(),
            straddle_strike_tolerance_pct: default_straddle_strike_tolerance_pct(),
            min_short_put_pop: default_min_short_put_pop(),
            pop_model: PopModel::default(),
            include_extended_shapes: true,
            require_profit_at_target: false,
        }
    }
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            min_mid_price: default_min_mid_price(),
            tightness_weight: default_tightness_weight(),
            open_interest_weight: default_activity_weight(),
            volume_weight: default_activity_weight(),
            log_scale: default_log_scale(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            capital_efficiency_weight: default_capital_efficiency_weight(),
            liquidity_weight: default_liquidity_weight(),
            max_return_on_risk: default_max_return_on_risk(),
            max_capital_efficiency: default_max_capital_efficiency(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_liquidity_weights_must_sum_to_one() {
        let mut config = Config::default();
        config.liquidity.tightness_weight = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_spread_window() {
        let mut config = Config::default();
        config.engine.max_spread_width_pct = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: Config = serde_json::from_str(
            r#"{ "engine": { "pop_model": "legacy", "include_extended_shapes": false } }"#,
        )
        .unwrap();
        assert_eq!(parsed.engine.pop_model, PopModel::Legacy);
        assert!(!parsed.engine.include_extended_shapes);
        assert_eq!(parsed.engine.default_volatility, 0.25);
        assert_eq!(parsed.scoring.liquidity_weight, 0.10);
        assert_eq!(parsed.market_data.chain_base_url, "https://api.marketdata.app");
    }
}
