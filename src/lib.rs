//! # Options Recommender
//!
//! Builds, scores and ranks option strategies for a ticker, an expiration
//! and a market view.
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `market`: Option chain types, strike lookup and market data providers
//! - `math`: Black-Scholes pricing, greeks and lognormal probabilities
//! - `strategy`: Strategy builders, payoff analysis, scoring and selection
//! - `utils`: Shared utilities and decimal arithmetic

pub mod config;
pub mod market;
pub mod math;
pub mod strategy;
pub mod utils;

pub use config::Config;
