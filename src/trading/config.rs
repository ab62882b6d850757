//! Trading configuration.

use anyhow::{bail, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::api::PlatformKind;

use super::{ConstraintSet, Strategy};

/// Risk budget applied when sizing an order.
///
/// Every fraction lies in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskParameters {
    /// Fraction of the balance put at risk per trade (distance to stop × quantity)
    pub risk_per_trade: Decimal,

    /// Stop distance as a fraction of the entry price
    pub stop_loss: Decimal,

    /// Maximum position value as a fraction of the balance
    pub max_position: Decimal,
}

impl RiskParameters {
    pub fn new(risk_per_trade: Decimal, stop_loss: Decimal, max_position: Decimal) -> Result<Self> {
        for (name, value) in [
            ("risk per trade", risk_per_trade),
            ("stop loss", stop_loss),
            ("max position", max_position),
        ] {
            if value <= Decimal::ZERO || value > Decimal::ONE {
                bail!("Invalid {} fraction {}: must be in (0, 1]", name, value);
            }
        }

        Ok(Self {
            risk_per_trade,
            stop_loss,
            max_position,
        })
    }
}

impl Default for RiskParameters {
    fn default() -> Self {
        Self {
            risk_per_trade: dec!(0.01), // 1% of balance at risk
            stop_loss: dec!(0.02),      // 2% stop
            max_position: dec!(0.10),   // 10% max position
        }
    }
}

/// Everything one pipeline run needs to know.
#[derive(Debug, Clone)]
pub struct TradingConfig {
    pub platform: PlatformKind,

    /// Brokerage API access token
    pub token: String,

    pub account_id: String,

    /// Ticker to trade (e.g., "AAPL")
    pub symbol: String,

    pub risk: RiskParameters,

    pub strategy: Strategy,

    pub constraint_set: ConstraintSet,
}

impl TradingConfig {
    /// Config for `platform` with the stock defaults: AAPL, 1% risk, 2% stop,
    /// 10% max position, five-day trend following and the market-hours gate.
    pub fn new(platform: PlatformKind, token: impl Into<String>) -> Self {
        Self {
            platform,
            token: token.into(),
            account_id: platform.default_account_id().to_string(),
            symbol: "AAPL".to_string(),
            risk: RiskParameters::default(),
            strategy: Strategy::TrendFollowing { lookback: 5 },
            constraint_set: ConstraintSet::Default,
        }
    }

    /// Token with everything but the last four characters hidden.
    pub fn masked_token(&self) -> String {
        let chars: Vec<char> = self.token.chars().collect();
        if chars.len() <= 4 {
            return "****".to_string();
        }
        let visible: String = chars[chars.len() - 4..].iter().collect();
        format!("****{}", visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_parameters_validation() {
        assert!(RiskParameters::new(dec!(0.01), dec!(0.02), dec!(0.10)).is_ok());
        assert!(RiskParameters::new(dec!(1), dec!(1), dec!(1)).is_ok());

        let err = RiskParameters::new(dec!(0), dec!(0.02), dec!(0.10)).unwrap_err();
        assert!(err.to_string().contains("risk per trade"));

        assert!(RiskParameters::new(dec!(0.01), dec!(-0.02), dec!(0.10)).is_err());
        assert!(RiskParameters::new(dec!(0.01), dec!(0.02), dec!(1.5)).is_err());
    }

    #[test]
    fn test_defaults() {
        let config = TradingConfig::new(PlatformKind::Mock, "secret-token");
        assert_eq!(config.account_id, "mock-account");
        assert_eq!(config.symbol, "AAPL");
        assert_eq!(config.risk, RiskParameters::default());
        assert_eq!(config.constraint_set, ConstraintSet::Default);
        assert_eq!(config.masked_token(), "****oken");
    }
}
