//! Directional signals, sized orders and placement results.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Directional verdict produced by a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    /// Side that closes a position opened by this signal.
    pub fn opposite(&self) -> Signal {
        match self {
            Signal::Buy => Signal::Sell,
            Signal::Sell => Signal::Buy,
            Signal::Hold => Signal::Hold,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Signal::Buy => "Buy",
            Signal::Sell => "Sell",
            Signal::Hold => "Hold",
        };
        f.write_str(s)
    }
}

/// A sized order ready for submission.
///
/// A quantity of zero means the order must not be submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub signal: Signal,
    pub quantity: u64,
    pub entry_price: Decimal,
    pub stop_loss_price: Decimal,
}

impl Order {
    /// The "do nothing" order.
    pub fn hold() -> Self {
        Self {
            signal: Signal::Hold,
            quantity: 0,
            entry_price: Decimal::ZERO,
            stop_loss_price: Decimal::ZERO,
        }
    }

    pub fn is_submittable(&self) -> bool {
        self.signal != Signal::Hold && self.quantity > 0
    }

    /// Stop price as sent to the brokerage, in whole cents.
    pub fn stop_loss_cents(&self) -> Decimal {
        to_cents(self.stop_loss_price)
    }

    /// Human-readable summary, e.g. `Buy 8 shares of AAPL at $115.00 with stop-loss at $112.70`.
    pub fn describe(&self, symbol: &str) -> String {
        format!(
            "{} {} shares of {} at ${:.2} with stop-loss at ${:.2}",
            self.signal,
            self.quantity,
            symbol,
            to_cents(self.entry_price),
            self.stop_loss_cents()
        )
    }
}

/// Result of an order placement call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderResult {
    pub success: bool,
    pub message: String,
}

impl OrderResult {
    pub fn placed(order: &Order, symbol: &str) -> Self {
        Self {
            success: true,
            message: format!("Order placed: {}", order.describe(symbol)),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    pub fn too_small() -> Self {
        Self::failed(TOO_SMALL_MESSAGE)
    }
}

/// Round to cents with halves away from zero. `{:.2}` alone truncates.
fn to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub const TOO_SMALL_MESSAGE: &str = "Position size too small. No trade placed.";
