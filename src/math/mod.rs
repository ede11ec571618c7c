//! Pricing and probability math.
//!
//! Everything here is a pure function of its arguments. Degenerate inputs
//! (non-positive time or volatility) produce `NaN`; callers decide what an
//! unknown value means for them.

pub mod black_scholes;
pub mod implied_move;
pub mod normal;
pub mod probability;

pub use black_scholes::{black_scholes_price, greeks, BsInputs, Greeks, OptionType};
pub use implied_move::{implied_move, target_price};
pub use normal::{norm_cdf, norm_pdf};
pub use probability::{pop_percent, LognormalModel};

/// Days in a year used for every time-to-expiry conversion.
pub const DAYS_PER_YEAR: f64 = 365.0;
