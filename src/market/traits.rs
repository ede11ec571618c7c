//! Provider interface for quotes and option chains.

use super::types::{OptionChain, Quote};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by market data providers.
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("{0} API key is not configured")]
    MissingApiKey(&'static str),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API error {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("no quote available for {0}")]
    NoQuote(String),

    #[error("no option chain for {ticker} expiring {expiration}")]
    NoChain {
        ticker: String,
        expiration: NaiveDate,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Source of underlying quotes and option chains.
///
/// Failures are reported to the caller, which decides whether to halt the
/// recommendation pass. The strategy engine itself never performs I/O.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    /// Current quote for a ticker.
    async fn fetch_quote(&self, ticker: &str) -> Result<Quote, MarketDataError>;

    /// Full chain for one expiration.
    async fn fetch_option_chain(
        &self,
        ticker: &str,
        expiration: NaiveDate,
    ) -> Result<OptionChain, MarketDataError>;
}
