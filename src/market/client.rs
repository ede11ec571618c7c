//! HTTP market data provider.
//!
//! - Option chains from MarketData.app (columnar JSON arrays)
//! - Quotes and company profile from Finnhub

use super::traits::{MarketDataError, MarketDataProvider};
use super::types::{Contract, OptionChain, Quote};
use crate::config::MarketDataConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const CHAIN_PROVIDER: &str = "MarketData.app";
const QUOTE_PROVIDER: &str = "Finnhub";

/// MarketData.app chain response: one array per field, indexed by row.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColumnarChain {
    #[serde(default)]
    s: Option<String>,
    #[serde(default)]
    option_symbol: Vec<Value>,
    #[serde(default)]
    side: Vec<Value>,
    #[serde(default)]
    strike: Vec<Value>,
    #[serde(default)]
    expiration: Vec<Value>,
    #[serde(default)]
    bid: Vec<Value>,
    #[serde(default)]
    ask: Vec<Value>,
    #[serde(default)]
    last: Vec<Value>,
    #[serde(default)]
    open_interest: Vec<Value>,
    #[serde(default)]
    volume: Vec<Value>,
    #[serde(default)]
    in_the_money: Vec<Value>,
    #[serde(default)]
    underlying_price: Vec<Value>,
    #[serde(default)]
    iv: Vec<Value>,
    #[serde(default)]
    delta: Vec<Value>,
    #[serde(default)]
    gamma: Vec<Value>,
    #[serde(default)]
    theta: Vec<Value>,
    #[serde(default)]
    vega: Vec<Value>,
}

impl ColumnarChain {
    /// Pivot the column arrays into contract rows. Rows that cannot be
    /// interpreted (e.g. unknown side) are skipped.
    fn into_contracts(self) -> Vec<Contract> {
        let columns: [(&str, &Vec<Value>); 15] = [
            ("type", &self.side),
            ("strike_price", &self.strike),
            ("expiry", &self.expiration),
            ("bid", &self.bid),
            ("ask", &self.ask),
            ("last", &self.last),
            ("open_interest", &self.open_interest),
            ("volume", &self.volume),
            ("in_the_money", &self.in_the_money),
            ("underlying_price", &self.underlying_price),
            ("iv", &self.iv),
            ("delta", &self.delta),
            ("gamma", &self.gamma),
            ("theta", &self.theta),
            ("vega", &self.vega),
        ];

        let mut contracts = Vec::with_capacity(self.option_symbol.len());
        for (i, symbol) in self.option_symbol.iter().enumerate() {
            let mut row = Map::new();
            row.insert("symbol".to_string(), symbol.clone());
            for (field, column) in &columns {
                if let Some(v) = column.get(i) {
                    row.insert((*field).to_string(), v.clone());
                }
            }
            match serde_json::from_value::<Contract>(Value::Object(row)) {
                Ok(contract) => contracts.push(contract),
                Err(e) => warn!(row = i, %symbol, error = %e, "Skipping unreadable chain row"),
            }
        }
        contracts
    }
}

#[derive(Debug, Deserialize)]
struct FinnhubQuote {
    /// Current price
    #[serde(default)]
    c: Option<f64>,
    /// Change
    #[serde(default)]
    d: Option<f64>,
    /// Percent change
    #[serde(default)]
    dp: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct FinnhubProfile {
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// Live provider backed by MarketData.app and Finnhub.
#[derive(Debug, Clone)]
pub struct HttpMarketData {
    client: Client,
    chain_base_url: String,
    chain_api_key: String,
    quote_base_url: String,
    quote_api_key: String,
}

impl HttpMarketData {
    /// Create a client from configuration.
    pub fn new(config: &MarketDataConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            chain_base_url: config.chain_base_url.trim_end_matches('/').to_string(),
            chain_api_key: config.chain_api_key.clone(),
            quote_base_url: config.quote_base_url.trim_end_matches('/').to_string(),
            quote_api_key: config.quote_api_key.clone(),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        provider: &'static str,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MarketDataError> {
        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MarketDataError::Status {
                provider,
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| MarketDataError::Parse {
            what: format!("{provider} response"),
            source,
        })
    }

    async fn fetch_profile(&self, ticker: &str) -> FinnhubProfile {
        let url = format!("{}/api/v1/stock/profile2", self.quote_base_url);
        let query = [("symbol", ticker), ("token", self.quote_api_key.as_str())];
        match self.get_json(QUOTE_PROVIDER, &url, &query).await {
            Ok(profile) => profile,
            Err(e) => {
                debug!(ticker, error = %e, "Company profile unavailable");
                FinnhubProfile::default()
            }
        }
    }
}

#[async_trait]
impl MarketDataProvider for HttpMarketData {
    fn name(&self) -> &'static str {
        "http"
    }

    #[instrument(skip(self), name = "finnhub_quote")]
    async fn fetch_quote(&self, ticker: &str) -> Result<Quote, MarketDataError> {
        if self.quote_api_key.is_empty() {
            return Err(MarketDataError::MissingApiKey(QUOTE_PROVIDER));
        }

        let url = format!("{}/api/v1/quote", self.quote_base_url);
        let query = [("symbol", ticker), ("token", self.quote_api_key.as_str())];
        let raw: FinnhubQuote = self.get_json(QUOTE_PROVIDER, &url, &query).await?;

        // Finnhub answers unknown symbols with c = 0
        let price = match raw.c {
            Some(c) if c > 0.0 && c.is_finite() => c,
            _ => return Err(MarketDataError::NoQuote(ticker.to_string())),
        };

        let profile = self.fetch_profile(ticker).await;
        let quote = Quote {
            price,
            change: raw.d,
            change_percent: raw.dp,
            currency: Some(profile.currency.unwrap_or_else(|| "USD".to_string())),
            name: Some(profile.name.unwrap_or_else(|| ticker.to_string())),
        };

        debug!(ticker, price, "Fetched quote");
        Ok(quote)
    }

    #[instrument(skip(self), name = "marketdata_chain")]
    async fn fetch_option_chain(
        &self,
        ticker: &str,
        expiration: NaiveDate,
    ) -> Result<OptionChain, MarketDataError> {
        if self.chain_api_key.is_empty() {
            return Err(MarketDataError::MissingApiKey(CHAIN_PROVIDER));
        }

        let url = format!(
            "{}/v1/options/chain/{}/",
            self.chain_base_url,
            urlencoding::encode(ticker)
        );
        let expiration_str = expiration.format("%Y-%m-%d").to_string();
        let query = [
            ("expiration", expiration_str.as_str()),
            ("token", self.chain_api_key.as_str()),
        ];

        let no_chain = || MarketDataError::NoChain {
            ticker: ticker.to_string(),
            expiration,
        };

        let raw: ColumnarChain = match self.get_json(CHAIN_PROVIDER, &url, &query).await {
            Ok(raw) => raw,
            Err(MarketDataError::Status { status: 404, .. }) => return Err(no_chain()),
            Err(e) => return Err(e),
        };

        if raw.s.as_deref() == Some("no_data") || raw.option_symbol.is_empty() {
            return Err(no_chain());
        }

        let contracts = raw.into_contracts();
        debug!(ticker, count = contracts.len(), "Fetched option chain");
        Ok(OptionChain::new(contracts))
    }
}
