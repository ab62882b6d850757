//! Brokerage backends for market data, balances and order placement.

mod mock_client;
mod schwab_client;
mod tradier_client;
mod types;

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::models::{DailyBar, Order, OrderResult, Quote};

pub use mock_client::MockPlatform;
pub use schwab_client::SchwabClient;
pub use tradier_client::TradierClient;

/// Market data and account access offered by every brokerage backend.
///
/// Implementations never return errors: transport and parse failures come
/// back as `None` for fetches and as an unsuccessful [`OrderResult`] for
/// placement.
#[async_trait]
pub trait Platform: Send + Sync {
    async fn fetch_quote(&self, symbol: &str, token: &str) -> Option<Quote>;

    /// Daily bars, oldest first, covering roughly the last `lookback_days`.
    async fn fetch_daily_history(
        &self,
        symbol: &str,
        lookback_days: usize,
        token: &str,
    ) -> Option<Vec<DailyBar>>;

    /// Available cash.
    async fn fetch_balance(&self, account_id: &str, token: &str) -> Option<Decimal>;

    async fn place_order(
        &self,
        account_id: &str,
        symbol: &str,
        order: &Order,
        token: &str,
    ) -> OrderResult;
}

/// Supported brokerage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformKind {
    Tradier,
    Schwab,
    Mock,
}

impl PlatformKind {
    /// Account used when none is given on the command line.
    pub fn default_account_id(&self) -> &'static str {
        match self {
            PlatformKind::Tradier => "tradier-account",
            PlatformKind::Schwab => "schwab-account",
            PlatformKind::Mock => "mock-account",
        }
    }

    /// Environment variable holding the API token, e.g. `TRADIER_TOKEN`.
    pub fn token_env_var(&self) -> String {
        format!("{}_TOKEN", self.to_string().to_uppercase())
    }

    /// Build the client for this backend.
    pub fn connect(&self) -> Result<Box<dyn Platform>> {
        let platform: Box<dyn Platform> = match self {
            PlatformKind::Tradier => Box::new(TradierClient::new()?),
            PlatformKind::Schwab => Box::new(SchwabClient::new()?),
            PlatformKind::Mock => Box::new(MockPlatform::default()),
        };
        Ok(platform)
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlatformKind::Tradier => "Tradier",
            PlatformKind::Schwab => "Schwab",
            PlatformKind::Mock => "Mock",
        };
        f.write_str(s)
    }
}

impl FromStr for PlatformKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tradier" => Ok(Self::Tradier),
            "schwab" => Ok(Self::Schwab),
            "mock" => Ok(Self::Mock),
            _ => bail!("Platform {} not supported.", s),
        }
    }
}
