//! Point-in-time market data: live quotes and daily OHLCV bars.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Live quote snapshot for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Ticker symbol (e.g., "AAPL")
    pub symbol: String,

    /// Last traded price
    pub last: Decimal,
}

impl Quote {
    pub fn new(symbol: impl Into<String>, last: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            last,
        }
    }
}

/// One trading day of price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    /// Calendar day in `YYYY-MM-DD` form
    pub date: String,

    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl DailyBar {
    pub fn new(
        date: impl Into<String>,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            date: date.into(),
            high,
            low,
            close,
            volume,
        }
    }
}

/// Trailing `n` bars of an oldest-first history (all of it when shorter).
pub fn trailing(history: &[DailyBar], n: usize) -> &[DailyBar] {
    &history[history.len().saturating_sub(n)..]
}
