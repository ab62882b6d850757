//! Data models for quotes, daily bars, signals and orders.

mod market_data;
mod order;

pub use market_data::{trailing, DailyBar, Quote};
pub use order::{Order, OrderResult, Signal, TOO_SMALL_MESSAGE};
