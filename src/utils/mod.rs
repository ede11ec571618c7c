//! Shared numeric helpers.

pub mod decimal;

pub use decimal::{coerce_number, parse_budget, round_penny, safe_div};
