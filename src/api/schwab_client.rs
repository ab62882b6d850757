//! Charles Schwab trader and market data REST client.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::header::ACCEPT;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::models::{DailyBar, Order, OrderResult, Quote, Signal};

use super::types::*;
use super::Platform;

const SCHWAB_API_BASE: &str = "https://api.schwabapi.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the Schwab Trader and Market Data APIs.
pub struct SchwabClient {
    client: Client,
    base_url: String,
}

impl SchwabClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(SCHWAB_API_BASE.to_string())
    }

    /// Create with custom base URL (for testing).
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
        debug!(url = %url, "Schwab request");

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
        let mut response: SchwabQuoteResponse = self
            .get_json("/marketdata/v1/quotes", &[("symbols", symbol.to_string())], token)
            .await?;

        let entry = response
            .remove(symbol)
            .with_context(|| format!("No quote for {}", symbol))?;
        let last = entry
            .quote
            .and_then(|q| q.last_price)
            .context("Quote has no last price")?;
        let symbol = if entry.symbol.is_empty() { symbol.to_string() } else { entry.symbol };

        Ok(Quote::new(symbol, last))
    }

    async fn get_history(&self, symbol: &str, lookback_days: usize, token: &str) -> Result<Vec<DailyBar>> {
        let path = format!("/marketdata/v1/{}/pricehistory", symbol);
        let query = [
            ("periodType", "day".to_string()),
            ("period", lookback_days.to_string()),
            ("frequencyType", "daily".to_string()),
        ];
        let response: SchwabHistoryResponse = self.get_json(&path, &query, token).await?;

        response
            .candles
            .into_iter()
            .map(|c| -> Result<DailyBar> {
                let date = Utc
                    .timestamp_millis_opt(c.datetime)
                    .single()
                    .with_context(|| format!("Invalid candle timestamp {}", c.datetime))?
                    .format("%Y-%m-%d")
                    .to_string();
                Ok(DailyBar::new(date, c.high, c.low, c.close, c.volume))
            })
            .collect()
    }

    async fn get_balance(&self, account_id: &str, token: &str) -> Result<Decimal> {
        let path = format!("/trader/v1/accounts/{}", account_id);
        let response: SchwabAccountResponse = self.get_json(&path, &[], token).await?;

        response
            .securities_account
            .and_then(|a| a.current_balances)
            .and_then(|b| b.cash_balance)
            .context("No cash balance in account response")
    }

    /// Market entry with a stop on the opposite side, triggered once the entry fills.
    fn build_order_request(symbol: &str, order: &Order) -> SchwabOrderRequest {
        let instruction = |signal: Signal| if signal == Signal::Buy { "BUY" } else { "SELL" };
        let leg = |signal: Signal| SchwabOrderLeg {
            instruction: instruction(signal),
            quantity: order.quantity,
            instrument: SchwabInstrument {
                symbol: symbol.to_string(),
                asset_type: "EQUITY",
            },
        };

        let stop = SchwabOrderRequest {
            order_type: "STOP",
            session: "NORMAL",
            duration: "DAY",
            stop_price: Some(order.stop_loss_cents()),
            order_strategy_type: "SINGLE",
            order_leg_collection: vec![leg(order.signal.opposite())],
            child_order_strategies: Vec::new(),
        };

        SchwabOrderRequest {
            order_type: "MARKET",
            session: "NORMAL",
            duration: "DAY",
            stop_price: None,
            order_strategy_type: "TRIGGER",
            order_leg_collection: vec![leg(order.signal)],
            child_order_strategies: vec![stop],
        }
    }

    async fn submit_order(&self, account_id: &str, symbol: &str, order: &Order, token: &str) -> Result<OrderResult> {
        let url = format!("{}/trader/v1/accounts/{}/orders", self.base_url, account_id);
        let request = Self::build_order_request(symbol, order);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to submit order")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Schwab rejected order");
            return Ok(OrderResult::failed(format!("Order failed: {}", status)));
        }

        info!(symbol = %symbol, quantity = order.quantity, "Schwab accepted order");
        Ok(OrderResult::placed(order, symbol))
    }
}

#[async_trait]
impl Platform for SchwabClient {
    async fn fetch_quote(&self, symbol: &str, token: &str) -> Option<Quote> {
        match self.get_quote(symbol, token).await {
            Ok(quote) => Some(quote),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Schwab quote unavailable");
                None
            }
        }
    }

    async fn fetch_daily_history(&self, symbol: &str, lookback_days: usize, token: &str) -> Option<Vec<DailyBar>> {
        match self.get_history(symbol, lookback_days, token).await {
            Ok(history) => Some(history),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Schwab history unavailable");
                None
            }
        }
    }

    async fn fetch_balance(&self, account_id: &str, token: &str) -> Option<Decimal> {
        match self.get_balance(account_id, token).await {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!(account = %account_id, error = %e, "Schwab balance unavailable");
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
                warn!(error = %e, "Schwab order submission failed");
                OrderResult::failed(format!("Order failed: {}", e))
            }
        }
    }
}
