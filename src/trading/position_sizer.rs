//! Risk-based position sizing with a maximum position value cap.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use crate::models::{Order, Quote, Signal};

use super::RiskParameters;

/// Turns a directional signal into a concrete order.
pub struct PositionSizer {
    risk: RiskParameters,
}

impl PositionSizer {
    pub fn new(risk: RiskParameters) -> Self {
        Self { risk }
    }

    /// Size an order for `signal` at the quoted price.
    ///
    /// Quantity is the number of whole shares whose stop-out loss fits inside
    /// `balance × risk_per_trade`, clamped so the position value does not
    /// exceed `balance × max_position`. Shares are always truncated, never
    /// rounded up. A quantity of zero is a valid result.
    pub fn calculate_order(&self, quote: &Quote, balance: Decimal, signal: Signal) -> Order {
        if signal == Signal::Hold {
            return Order::hold();
        }

        let entry_price = quote.last;
        let stop_loss_price = match signal {
            Signal::Buy => entry_price * (Decimal::ONE - self.risk.stop_loss),
            _ => entry_price * (Decimal::ONE + self.risk.stop_loss),
        };

        let risk_amount = balance * self.risk.risk_per_trade;
        let stop_distance = (entry_price - stop_loss_price).abs();
        let mut quantity = whole_shares(risk_amount, stop_distance);

        // Max position size
        let max_position_value = balance * self.risk.max_position;
        let position_value = Decimal::from(quantity).checked_mul(entry_price);
        if position_value.map_or(true, |value| value > max_position_value) {
            quantity = whole_shares(max_position_value, entry_price);
        }

        debug!(
            signal = %signal,
            entry = %entry_price,
            stop = %stop_loss_price,
            risk_amount = %risk_amount,
            max_position_value = %max_position_value,
            quantity = quantity,
            "Order sized"
        );

        Order {
            signal,
            quantity,
            entry_price,
            stop_loss_price,
        }
    }
}

/// `trunc(amount / per_share)`, zero when either side is non-positive.
///
/// Saturates at `u64::MAX` so a vanishing stop distance still reaches the
/// max-position clamp.
fn whole_shares(amount: Decimal, per_share: Decimal) -> u64 {
    if amount <= Decimal::ZERO || per_share <= Decimal::ZERO {
        return 0;
    }
    amount
        .checked_div(per_share)
        .and_then(|shares| shares.trunc().to_u64())
        .unwrap_or(u64::MAX)
}
