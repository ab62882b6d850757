//! Wire types for the Tradier and Schwab REST APIs.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==================== Tradier ====================

/// Response from /v1/markets/quotes.
#[derive(Debug, Clone, Deserialize)]
pub struct TradierQuoteResponse {
    pub quotes: Option<TradierQuotes>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradierQuotes {
    pub quote: Option<TradierQuote>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradierQuote {
    pub symbol: String,
    pub last: Option<Decimal>,
}

/// Response from /v1/markets/history.
#[derive(Debug, Clone, Deserialize)]
pub struct TradierHistoryResponse {
    pub history: Option<TradierHistory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradierHistory {
    pub day: Option<OneOrMany<TradierDay>>,
}

/// Tradier collapses single-element arrays into a bare object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradierDay {
    pub date: String,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(default)]
    pub volume: Decimal,
}

/// Response from /v1/accounts/{id}/balances.
#[derive(Debug, Clone, Deserialize)]
pub struct TradierBalanceResponse {
    pub balances: Option<TradierBalances>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradierBalances {
    pub total_cash: Option<Decimal>,
}

/// Form body for /v1/accounts/{id}/orders.
#[derive(Debug, Clone, Serialize)]
pub struct TradierOrderForm {
    pub class: &'static str,
    pub symbol: String,
    pub side: &'static str,
    pub quantity: u64,
    #[serde(rename = "type")]
    pub order_type: &'static str,
    pub duration: &'static str,
    pub stop: String,
}

// ==================== Schwab ====================

/// Response from /marketdata/v1/quotes, keyed by symbol.
pub type SchwabQuoteResponse = HashMap<String, SchwabQuoteEntry>;

#[derive(Debug, Clone, Deserialize)]
pub struct SchwabQuoteEntry {
    #[serde(default)]
    pub symbol: String,
    pub quote: Option<SchwabQuote>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchwabQuote {
    pub last_price: Option<Decimal>,
}

/// Response from /marketdata/v1/pricehistory.
#[derive(Debug, Clone, Deserialize)]
pub struct SchwabHistoryResponse {
    #[serde(default)]
    pub candles: Vec<SchwabCandle>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchwabCandle {
    /// Epoch milliseconds
    pub datetime: i64,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(default)]
    pub volume: Decimal,
}

/// Response from /trader/v1/accounts/{id}.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchwabAccountResponse {
    pub securities_account: Option<SchwabSecuritiesAccount>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchwabSecuritiesAccount {
    pub current_balances: Option<SchwabBalances>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchwabBalances {
    pub cash_balance: Option<Decimal>,
}

/// Order body for /trader/v1/accounts/{id}/orders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchwabOrderRequest {
    pub order_type: &'static str,
    pub session: &'static str,
    pub duration: &'static str,
    #[serde(skip_serializing_if = "Option::is_none", with = "rust_decimal::serde::float_option")]
    pub stop_price: Option<Decimal>,
    pub order_strategy_type: &'static str,
    pub order_leg_collection: Vec<SchwabOrderLeg>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub child_order_strategies: Vec<SchwabOrderRequest>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchwabOrderLeg {
    pub instruction: &'static str,
    pub quantity: u64,
    pub instrument: SchwabInstrument,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchwabInstrument {
    pub symbol: String,
    pub asset_type: &'static str,
}
