//! Fetch, derive the implied move, run the engine.

use super::engine::StrategyEngine;
use super::types::{ScoredStrategy, Sentiment, UserInputs};
use crate::market::{
    Contract, MarketDataError, MarketDataProvider, OptionChain, Quote, VolatilityEstimate,
};
use crate::utils::round_penny;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, instrument, warn};

/// What the user asked for.
#[derive(Debug, Clone)]
pub struct RecommendRequest {
    pub ticker: String,
    pub expiration: NaiveDate,
    pub sentiment: Sentiment,
    /// Risk/reward slider in [0, 100]
    pub slider: f64,
    /// Free-form target price; derived from sentiment when empty
    pub target_price: String,
    pub budget: String,
    /// Valuation date for time to expiry
    pub as_of: NaiveDate,
}

/// Best strategy of each shape plus the market context it was built from.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub ticker: String,
    pub expiration: NaiveDate,
    pub quote: Quote,
    pub volatility: Option<VolatilityEstimate>,
    /// Target used for the pass (user supplied or sentiment derived)
    pub target_price: Option<f64>,
    pub strategies: Vec<ScoredStrategy>,
}

/// Implied move and the price target it suggests.
#[derive(Debug, Clone, Serialize)]
pub struct ImpliedMoveReport {
    pub ticker: String,
    pub expiration: NaiveDate,
    pub spot: f64,
    pub volatility: Option<VolatilityEstimate>,
    pub sentiment: Sentiment,
    pub target_price: Option<f64>,
}

impl ImpliedMoveReport {
    pub fn from_chain(
        ticker: &str,
        expiration: NaiveDate,
        spot: f64,
        contracts: &[Contract],
        sentiment: Sentiment,
        as_of: NaiveDate,
    ) -> Self {
        let volatility = VolatilityEstimate::from_chain(contracts, spot, expiration, as_of);
        Self {
            ticker: ticker.to_string(),
            expiration,
            spot,
            volatility,
            sentiment,
            target_price: volatility
                .map(|v| round_penny(sentiment.target_price(spot, v.sigma))),
        }
    }
}

/// Ties a market data provider to the strategy engine.
pub struct Recommender<P> {
    provider: P,
    engine: StrategyEngine,
}

impl<P: MarketDataProvider> Recommender<P> {
    pub fn new(provider: P, engine: StrategyEngine) -> Self {
        Self { provider, engine }
    }

    /// Fetch quote and chain, then build recommendations.
    ///
    /// A missing quote or chain halts the pass with an error.
    #[instrument(skip(self, request), fields(provider = self.provider.name(), ticker = %request.ticker))]
    pub async fn recommend(&self, request: &RecommendRequest) -> Result<Recommendation, MarketDataError> {
        let quote = self.provider.fetch_quote(&request.ticker).await?;
        ensure_quote(request, &quote)?;
        let chain = self
            .provider
            .fetch_option_chain(&request.ticker, request.expiration)
            .await?;
        ensure_chain(request, &chain)?;

        info!(
            price = quote.price,
            contracts = chain.results.len(),
            "Fetched market data"
        );
        Ok(self.evaluate(request, quote, &chain))
    }

    /// Implied move for a ticker and expiration.
    #[instrument(skip(self), fields(provider = self.provider.name()))]
    pub async fn implied_move(
        &self,
        ticker: &str,
        expiration: NaiveDate,
        sentiment: Sentiment,
        as_of: NaiveDate,
    ) -> Result<ImpliedMoveReport, MarketDataError> {
        let quote = self.provider.fetch_quote(ticker).await?;
        let chain = self.provider.fetch_option_chain(ticker, expiration).await?;
        Ok(ImpliedMoveReport::from_chain(
            ticker,
            expiration,
            quote.price,
            &chain.results,
            sentiment,
            as_of,
        ))
    }

    /// Build recommendations from data already in hand.
    pub fn evaluate(&self, request: &RecommendRequest, quote: Quote, chain: &OptionChain) -> Recommendation {
        evaluate(&self.engine, request, quote, chain)
    }
}

fn ensure_quote(request: &RecommendRequest, quote: &Quote) -> Result<(), MarketDataError> {
    if quote.price > 0.0 {
        Ok(())
    } else {
        Err(MarketDataError::NoQuote(request.ticker.clone()))
    }
}

fn ensure_chain(request: &RecommendRequest, chain: &OptionChain) -> Result<(), MarketDataError> {
    if chain.is_empty() {
        Err(MarketDataError::NoChain {
            ticker: request.ticker.clone(),
            expiration: request.expiration,
        })
    } else {
        Ok(())
    }
}

/// Build recommendations from a saved quote and chain.
///
/// Applies the same halting rules as a live pass: no usable quote or an
/// empty chain is an error.
pub fn evaluate_saved(
    engine: &StrategyEngine,
    request: &RecommendRequest,
    quote: Option<Quote>,
    chain: &OptionChain,
) -> Result<Recommendation, MarketDataError> {
    let quote = quote.ok_or_else(|| MarketDataError::NoQuote(request.ticker.clone()))?;
    ensure_quote(request, &quote)?;
    ensure_chain(request, chain)?;
    Ok(evaluate(engine, request, quote, chain))
}

/// Derive σ and the target, then run the engine over `chain`.
pub fn evaluate(
    engine: &StrategyEngine,
    request: &RecommendRequest,
    quote: Quote,
    chain: &OptionChain,
) -> Recommendation {
    let volatility =
        VolatilityEstimate::from_chain(&chain.results, quote.price, request.expiration, request.as_of);
    if volatility.is_none() {
        warn!(
            ticker = %request.ticker,
            "No at-the-money IV, iron and straddle shapes will be skipped"
        );
    }

    let mut user = UserInputs {
        ticker: request.ticker.clone(),
        quote: Some(quote.clone()),
        sentiment: Some(request.sentiment),
        risk_reward: request.slider,
        target_price: request.target_price.clone(),
        budget: request.budget.clone(),
        expiration: Some(request.expiration),
        valuation_date: request.as_of,
    };
    if user.target().is_none() {
        if let Some(v) = volatility {
            let derived = round_penny(request.sentiment.target_price(quote.price, v.sigma));
            user.target_price = derived.to_string();
        }
    }

    let strategies = engine.compute_scored(&user, &chain.results, request.slider, volatility.map(|v| v.sigma));
    Recommendation {
        ticker: request.ticker.clone(),
        expiration: request.expiration,
        quote,
        volatility,
        target_price: user.target(),
        strategies,
    }
}
