//! Tradier brokerage REST client.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{Days, Utc};
use reqwest::header::ACCEPT;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::models::{DailyBar, Order, OrderResult, Quote, Signal};

use super::types::*;
use super::Platform;

const TRADIER_API_BASE: &str = "https://api.tradier.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the Tradier brokerage API.
pub struct TradierClient {
    client: Client,
    base_url: String,
}

impl TradierClient {
    /// Create a new client against the production API.
    pub fn new() -> Result<Self> {
        Self::with_base_url(TRADIER_API_BASE.to_string())
    }

    /// Create with custom base URL (for testing or the sandbox).
    pub fn with_base_url(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        token: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Tradier request");

        let response = self
            .client
            .get(&url)
            .query(query)
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", path))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("{} request failed: {} - {}", path, status, body);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", path))
    }

    async fn get_quote(&self, symbol: &str, token: &str) -> Result<Quote> {
        let response: TradierQuoteResponse = self
            .get_json("/v1/markets/quotes", &[("symbols", symbol.to_string())], token)
            .await?;

        let quote = response
            .quotes
            .and_then(|q| q.quote)
            .context("No quote in response")?;
        let last = quote.last.context("Quote has no last price")?;

        Ok(Quote::new(quote.symbol, last))
    }

    async fn get_history(&self, symbol: &str, lookback_days: usize, token: &str) -> Result<Vec<DailyBar>> {
        let end = Utc::now().date_naive();
        let start = end
            .checked_sub_days(Days::new(lookback_days as u64))
            .context("Lookback reaches before the calendar start")?;

        let query = [
            ("symbol", symbol.to_string()),
            ("interval", "daily".to_string()),
            ("start", start.format("%Y-%m-%d").to_string()),
            ("end", end.format("%Y-%m-%d").to_string()),
        ];
        let response: TradierHistoryResponse =
            self.get_json("/v1/markets/history", &query, token).await?;

        let days = response
            .history
            .and_then(|h| h.day)
            .map(OneOrMany::into_vec)
            .unwrap_or_default();

        Ok(days
            .into_iter()
            .map(|d| DailyBar::new(d.date, d.high, d.low, d.close, d.volume))
            .collect())
    }

    async fn get_balance(&self, account_id: &str, token: &str) -> Result<Decimal> {
        let path = format!("/v1/accounts/{}/balances", account_id);
        let response: TradierBalanceResponse = self.get_json(&path, &[], token).await?;

        response
            .balances
            .and_then(|b| b.total_cash)
            .context("No total_cash in balances response")
    }

    async fn submit_order(&self, account_id: &str, symbol: &str, order: &Order, token: &str) -> Result<OrderResult> {
        let url = format!("{}/v1/accounts/{}/orders", self.base_url, account_id);
        let form = TradierOrderForm {
            class: "equity",
            symbol: symbol.to_string(),
            side: if order.signal == Signal::Buy { "buy" } else { "sell" },
            quantity: order.quantity,
            order_type: "market",
            duration: "day",
            stop: format!("{:.2}", order.stop_loss_cents()),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .context("Failed to submit order")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Tradier rejected order");
            return Ok(OrderResult::failed(format!("Order failed: {}", status)));
        }

        info!(symbol = %symbol, quantity = order.quantity, "Tradier accepted order");
        Ok(OrderResult::placed(order, symbol))
    }
}

#[async_trait]
impl Platform for TradierClient {
    async fn fetch_quote(&self, symbol: &str, token: &str) -> Option<Quote> {
        match self.get_quote(symbol, token).await {
            Ok(quote) => Some(quote),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Tradier quote unavailable");
                None
            }
        }
    }

    async fn fetch_daily_history(&self, symbol: &str, lookback_days: usize, token: &str) -> Option<Vec<DailyBar>> {
        match self.get_history(symbol, lookback_days, token).await {
            Ok(history) => Some(history),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Tradier history unavailable");
                None
            }
        }
    }

    async fn fetch_balance(&self, account_id: &str, token: &str) -> Option<Decimal> {
        match self.get_balance(account_id, token).await {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!(account = %account_id, error = %e, "Tradier balance unavailable");
                None
            }
        }
    }

    async fn place_order(&self, account_id: &str, symbol: &str, order: &Order, token: &str) -> OrderResult {
        if order.quantity == 0 {
            return OrderResult::too_small();
        }

        match self.submit_order(account_id, symbol, order, token).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Tradier order submission failed");
                OrderResult::failed(format!("Order failed: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> TradierClient {
        TradierClient::with_base_url(server.uri()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_quote() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/markets/quotes"))
            .and(query_param("symbols", "AAPL"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "quotes": { "quote": { "symbol": "AAPL", "last": 115.25 } }
            })))
            .mount(&server)
            .await;

        let quote = client_for(&server).await.fetch_quote("AAPL", "tok").await.unwrap();
        assert_eq!(quote, Quote::new("AAPL", dec!(115.25)));
    }

    #[tokio::test]
    async fn test_fetch_history_accepts_array_and_single_day() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/markets/history"))
            .and(query_param("symbol", "AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "history": { "day": [
                    { "date": "2025-05-27", "high": 108.0, "low": 98.0, "close": 103.0, "volume": 1300 },
                    { "date": "2025-05-28", "high": 112.0, "low": 102.0, "close": 110.0, "volume": 2000 }
                ] }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/markets/history"))
            .and(query_param("symbol", "MSFT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "history": { "day": { "date": "2025-05-28", "high": 420.0, "low": 410.0, "close": 415.0, "volume": 900 } }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let history = client.fetch_daily_history("AAPL", 5, "tok").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].date, "2025-05-28");
        assert_eq!(history[1].volume, dec!(2000));

        let single = client.fetch_daily_history("MSFT", 5, "tok").await.unwrap();
        assert_eq!(single.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_balance_failure_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/accounts/acct-1/balances"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid Access Token"))
            .mount(&server)
            .await;

        assert!(client_for(&server).await.fetch_balance("acct-1", "bad").await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_balance() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/accounts/acct-1/balances"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "balances": { "total_cash": 10000.5, "total_equity": 25000 }
            })))
            .mount(&server)
            .await;

        let balance = client_for(&server).await.fetch_balance("acct-1", "tok").await;
        assert_eq!(balance, Some(dec!(10000.5)));
    }

    #[tokio::test]
    async fn test_place_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts/acct-1/orders"))
            .and(body_string_contains("side=buy"))
            .and(body_string_contains("quantity=8"))
            .and(body_string_contains("stop=112.70"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "order": { "id": 257459, "status": "ok" }
            })))
            .mount(&server)
            .await;

        let order = Order {
            signal: Signal::Buy,
            quantity: 8,
            entry_price: dec!(115),
            stop_loss_price: dec!(112.7),
        };
        let result = client_for(&server).await.place_order("acct-1", "AAPL", &order, "tok").await;

        assert!(result.success);
        assert_eq!(
            result.message,
            "Order placed: Buy 8 shares of AAPL at $115.00 with stop-loss at $112.70"
        );
    }

    #[tokio::test]
    async fn test_place_order_rounds_stop_to_nearest_cent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts/acct-1/orders"))
            .and(body_string_contains("stop=99.15"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let order = Order {
            signal: Signal::Buy,
            quantity: 1,
            entry_price: dec!(101.17),
            stop_loss_price: dec!(99.1466),
        };
        let result = client_for(&server).await.place_order("acct-1", "AAPL", &order, "tok").await;

        assert!(result.success);
        assert!(result.message.ends_with("with stop-loss at $99.15"));
    }

    #[tokio::test]
    async fn test_place_order_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts/acct-1/orders"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let order = Order {
            signal: Signal::Sell,
            quantity: 3,
            entry_price: dec!(50),
            stop_loss_price: dec!(51),
        };
        let result = client_for(&server).await.place_order("acct-1", "AAPL", &order, "tok").await;

        assert!(!result.success);
        assert_eq!(result.message, "Order failed: 400 Bad Request");
    }

    #[tokio::test]
    async fn test_zero_quantity_never_hits_the_wire() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let order = Order {
            signal: Signal::Buy,
            quantity: 0,
            entry_price: dec!(500),
            stop_loss_price: dec!(490),
        };
        let result = client_for(&server).await.place_order("acct-1", "AAPL", &order, "tok").await;

        assert!(!result.success);
        assert_eq!(result.message, "Position size too small. No trade placed.");
    }
}
