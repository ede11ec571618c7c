//! Market data: chain snapshot types and the providers that produce them.
//!
//! ## Providers
//! - `HttpMarketData`: MarketData.app option chains and Finnhub quotes
//! - `SnapshotProvider`: JSON snapshot files on disk
//!
//! Both implement [`MarketDataProvider`]; the strategy engine only ever sees
//! the resulting [`Quote`] and [`OptionChain`].

mod client;
pub mod snapshot;
mod strike_index;
mod traits;
mod types;
pub mod volatility;

pub use client::HttpMarketData;
pub use snapshot::{ChainSnapshot, SnapshotProvider};
pub use strike_index::StrikeIndex;
pub use traits::{MarketDataError, MarketDataProvider};
#[cfg(test)]
pub use traits::MockMarketDataProvider;
pub use types::{Contract, OptionChain, OptionType, Quote};
pub use volatility::{atm_implied_vol, days_to_expiry, VolatilityEstimate};
