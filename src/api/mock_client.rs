//! In-memory brokerage for demos and tests.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

use crate::models::{trailing, DailyBar, Order, OrderResult, Quote};

use super::Platform;

/// Brokerage that serves canned data and accepts every sized order.
#[derive(Debug, Clone)]
pub struct MockPlatform {
    balance: Decimal,
    history: Vec<DailyBar>,
    last_price: Decimal,
}

impl MockPlatform {
    pub fn new(balance: Decimal, history: Vec<DailyBar>, last_price: Decimal) -> Self {
        Self {
            balance,
            history,
            last_price,
        }
    }

    /// Five days of rising prices ending on a high-volume day.
    pub fn sample_history() -> Vec<DailyBar> {
        vec![
            DailyBar::new("2025-05-24", dec!(100), dec!(90), dec!(95), dec!(1000)),
            DailyBar::new("2025-05-25", dec!(105), dec!(95), dec!(100), dec!(1200)),
            DailyBar::new("2025-05-26", dec!(110), dec!(100), dec!(105), dec!(1100)),
            DailyBar::new("2025-05-27", dec!(108), dec!(98), dec!(103), dec!(1300)),
            DailyBar::new("2025-05-28", dec!(112), dec!(102), dec!(110), dec!(2000)),
        ]
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new(dec!(10000), Self::sample_history(), dec!(115))
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn fetch_quote(&self, symbol: &str, _token: &str) -> Option<Quote> {
        Some(Quote::new(symbol, self.last_price))
    }

    async fn fetch_daily_history(&self, _symbol: &str, lookback_days: usize, _token: &str) -> Option<Vec<DailyBar>> {
        Some(trailing(&self.history, lookback_days).to_vec())
    }

    async fn fetch_balance(&self, _account_id: &str, _token: &str) -> Option<Decimal> {
        Some(self.balance)
    }

    async fn place_order(&self, _account_id: &str, symbol: &str, order: &Order, _token: &str) -> OrderResult {
        if order.quantity == 0 {
            return OrderResult::too_small();
        }

        info!(symbol = %symbol, signal = %order.signal, quantity = order.quantity, "Mock order accepted");
        OrderResult::placed(order, symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Signal;

    #[test]
    fn test_serves_trailing_history() {
        let platform = MockPlatform::default();

        let history = tokio_test::block_on(platform.fetch_daily_history("AAPL", 3, "")).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].date, "2025-05-26");

        let all = tokio_test::block_on(platform.fetch_daily_history("AAPL", 30, "")).unwrap();
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn test_quote_uses_requested_symbol() {
        let platform = MockPlatform::default();
        let quote = tokio_test::block_on(platform.fetch_quote("MSFT", "")).unwrap();
        assert_eq!(quote, Quote::new("MSFT", dec!(115)));
        assert_eq!(tokio_test::block_on(platform.fetch_balance("any", "")), Some(dec!(10000)));
    }

    #[test]
    fn test_rejects_empty_orders() {
        let platform = MockPlatform::default();
        let empty = Order {
            signal: Signal::Buy,
            ..Order::hold()
        };

        let result = tokio_test::block_on(platform.place_order("acct", "AAPL", &empty, ""));
        assert!(!result.success);
        assert_eq!(result.message, "Position size too small. No trade placed.");
    }
}
