//! Strategy construction, scoring and selection.
//!
//! Contains the core logic for:
//! - Liquidity gating and the per-pass build context
//! - One builder per strategy shape
//! - Multi-criteria scoring within a shape
//! - The recommendation pass and its async caller

pub mod builders;
mod context;
mod engine;
mod liquidity;
mod payoff;
mod recommender;
mod scoring;
mod types;

pub use builders::{all_builders, RejectReason, Rejections, StrategyBuilder};
pub use context::BuildContext;
pub use engine::{is_profitable_at_target, StrategyEngine};
pub use liquidity::{is_liquid, LiquidityGate};
pub use payoff::{payoff_at, payoff_curve, profit_near, StockPosition};
pub use recommender::{evaluate, evaluate_saved, ImpliedMoveReport, RecommendRequest, Recommendation, Recommender};
pub use scoring::{normalize, ScoringEngine};
pub use types::{
    return_on_risk, Bound, Leg, PayoffPoint, ScoredStrategy, Sentiment, Side, StrategyKind,
    StrategyResult, UserInputs,
};
