//! Trading logic: eligibility gate, signal strategies, position sizing.

mod config;
mod constraint;
mod position_sizer;
mod strategy;

pub use config::{RiskParameters, TradingConfig};
pub use constraint::{ConstraintSet, EligibilityGate};
pub use position_sizer::PositionSizer;
pub use strategy::{Strategy, StrategyKind};

#[cfg(test)]
pub(crate) use constraint::test_clock::FixedClock;
#[cfg(test)]
pub(crate) use constraint::{DAILY_LIMIT_REACHED, MARKET_CLOSED};
