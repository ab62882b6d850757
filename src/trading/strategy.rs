//! Signal detection strategies.
//!
//! Each strategy looks at a trailing window of daily bars and the live quote
//! and returns a [`Signal`]. All comparisons are strict, so a quote sitting
//! exactly on a boundary always resolves to `Hold`.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, warn};

use crate::models::{trailing, DailyBar, Quote, Signal};

/// Latest-day volume must exceed the window average by this factor to count as a breakout.
const BREAKOUT_VOLUME_MULTIPLIER: Decimal = dec!(1.5);

/// Strategy family, as named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    TrendFollowing,
    MeanReversion,
    Breakout,
}

impl FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "trendfollowing" | "trend" => Ok(Self::TrendFollowing),
            "meanreversion" | "mean" => Ok(Self::MeanReversion),
            "breakout" => Ok(Self::Breakout),
            _ => bail!("Strategy {} not supported.", s),
        }
    }
}

/// A fully parameterized strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Buy above the recent high, sell below the recent low.
    TrendFollowing { lookback: usize },
    /// Buy below the simple moving average, sell above it.
    MeanReversion { lookback: usize, sma_period: usize },
    /// Trend following gated on an unusually high-volume latest day.
    Breakout { lookback: usize },
}

impl Strategy {
    /// Build a strategy, rejecting zero-length windows.
    pub fn new(kind: StrategyKind, lookback: usize, sma_period: usize) -> Result<Self> {
        if lookback == 0 {
            bail!("Lookback must be at least one day");
        }
        let strategy = match kind {
            StrategyKind::TrendFollowing => Strategy::TrendFollowing { lookback },
            StrategyKind::MeanReversion => {
                if sma_period == 0 {
                    bail!("SMA period must be at least one day");
                }
                Strategy::MeanReversion {
                    lookback,
                    sma_period,
                }
            }
            StrategyKind::Breakout => Strategy::Breakout { lookback },
        };
        Ok(strategy)
    }

    /// Number of daily bars to request from the broker.
    pub fn history_window(&self) -> usize {
        match *self {
            Strategy::TrendFollowing { lookback } | Strategy::Breakout { lookback } => lookback,
            Strategy::MeanReversion {
                lookback,
                sma_period,
            } => lookback.max(sma_period),
        }
    }

    /// Derive a signal from the live quote and oldest-first history.
    pub fn detect(&self, quote: &Quote, history: &[DailyBar]) -> Signal {
        if history.is_empty() {
            return Signal::Hold;
        }
        if history.len() < self.history_window() {
            warn!(
                strategy = %self,
                available = history.len(),
                wanted = self.history_window(),
                "Short history, using all available bars"
            );
        }

        let signal = match *self {
            Strategy::TrendFollowing { lookback } => trend_following(quote, history, lookback),
            Strategy::MeanReversion { sma_period, .. } => {
                mean_reversion(quote, history, sma_period)
            }
            Strategy::Breakout { lookback } => breakout(quote, history, lookback),
        };

        debug!(strategy = %self, last = %quote.last, signal = %signal, "Signal detected");
        signal
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::TrendFollowing { lookback } => write!(f, "TrendFollowing({}d)", lookback),
            Strategy::MeanReversion {
                lookback,
                sma_period,
            } => write!(f, "MeanReversion({}d, SMA {})", lookback, sma_period),
            Strategy::Breakout { lookback } => write!(f, "Breakout({}d)", lookback),
        }
    }
}

/// (max high, min low) over a non-empty window.
fn high_low(window: &[DailyBar]) -> (Decimal, Decimal) {
    window.iter().fold((Decimal::MIN, Decimal::MAX), |(hi, lo), bar| {
        (hi.max(bar.high), lo.min(bar.low))
    })
}

fn average(values: impl Iterator<Item = Decimal>) -> Decimal {
    let (sum, count) = values.fold((Decimal::ZERO, 0u32), |(sum, n), v| (sum + v, n + 1));
    if count == 0 {
        Decimal::ZERO
    } else {
        sum / Decimal::from(count)
    }
}

fn trend_following(quote: &Quote, history: &[DailyBar], lookback: usize) -> Signal {
    let (recent_high, recent_low) = high_low(trailing(history, lookback));

    if quote.last > recent_high {
        Signal::Buy
    } else if quote.last < recent_low {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

fn mean_reversion(quote: &Quote, history: &[DailyBar], sma_period: usize) -> Signal {
    let sma = average(trailing(history, sma_period).iter().map(|d| d.close));

    if quote.last < sma {
        Signal::Buy
    } else if quote.last > sma {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

fn breakout(quote: &Quote, history: &[DailyBar], lookback: usize) -> Signal {
    let window = trailing(history, lookback);
    let (recent_high, recent_low) = high_low(window);
    let avg_volume = average(window.iter().map(|d| d.volume));

    // Latest day of the full history, not of the window.
    let high_volume = history
        .last()
        .is_some_and(|latest| latest.volume > avg_volume * BREAKOUT_VOLUME_MULTIPLIER);

    if high_volume && quote.last > recent_high {
        Signal::Buy
    } else if high_volume && quote.last < recent_low {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(last: Decimal) -> Quote {
        Quote::new("AAPL", last)
    }

    /// The five-day history served by the mock platform.
    fn sample_history() -> Vec<DailyBar> {
        vec![
            DailyBar::new("2025-05-24", dec!(100), dec!(90), dec!(95), dec!(1000)),
            DailyBar::new("2025-05-25", dec!(105), dec!(95), dec!(100), dec!(1200)),
            DailyBar::new("2025-05-26", dec!(110), dec!(100), dec!(105), dec!(1100)),
            DailyBar::new("2025-05-27", dec!(108), dec!(98), dec!(103), dec!(1300)),
            DailyBar::new("2025-05-28", dec!(112), dec!(102), dec!(110), dec!(2000)),
        ]
    }

    fn flat_closes(close: Decimal, days: usize) -> Vec<DailyBar> {
        (0..days)
            .map(|i| DailyBar::new(format!("2025-06-{:02}", i + 1), close, close, close, dec!(1000)))
            .collect()
    }

    #[test]
    fn test_strategy_kind_parsing() {
        assert_eq!("TrendFollowing".parse::<StrategyKind>().unwrap(), StrategyKind::TrendFollowing);
        assert_eq!("mean-reversion".parse::<StrategyKind>().unwrap(), StrategyKind::MeanReversion);
        assert_eq!("BREAKOUT".parse::<StrategyKind>().unwrap(), StrategyKind::Breakout);

        let err = "Momentum".parse::<StrategyKind>().unwrap_err();
        assert_eq!(err.to_string(), "Strategy Momentum not supported.");
    }

    #[test]
    fn test_strategy_rejects_empty_windows() {
        assert!(Strategy::new(StrategyKind::TrendFollowing, 0, 5).is_err());
        assert!(Strategy::new(StrategyKind::MeanReversion, 5, 0).is_err());
        assert!(Strategy::new(StrategyKind::Breakout, 0, 0).is_err());
        // SMA period is irrelevant outside mean reversion
        assert!(Strategy::new(StrategyKind::Breakout, 5, 0).is_ok());
    }

    #[test]
    fn test_history_window() {
        let mr = Strategy::new(StrategyKind::MeanReversion, 5, 20).unwrap();
        assert_eq!(mr.history_window(), 20);
        let tf = Strategy::new(StrategyKind::TrendFollowing, 10, 20).unwrap();
        assert_eq!(tf.history_window(), 10);
    }

    #[test]
    fn test_trend_following_breakout_above_high() {
        let strategy = Strategy::TrendFollowing { lookback: 5 };
        assert_eq!(strategy.detect(&quote(dec!(115)), &sample_history()), Signal::Buy);
    }

    #[test]
    fn test_trend_following_boundaries() {
        let strategy = Strategy::TrendFollowing { lookback: 5 };
        let history = sample_history();

        // High is 112, low is 90: the exact extremes are Hold
        assert_eq!(strategy.detect(&quote(dec!(112)), &history), Signal::Hold);
        assert_eq!(strategy.detect(&quote(dec!(90)), &history), Signal::Hold);
        assert_eq!(strategy.detect(&quote(dec!(112.01)), &history), Signal::Buy);
        assert_eq!(strategy.detect(&quote(dec!(89.99)), &history), Signal::Sell);
        assert_eq!(strategy.detect(&quote(dec!(100)), &history), Signal::Hold);
    }

    #[test]
    fn test_trend_following_only_uses_lookback_window() {
        // Last two bars: high 112, low 98
        let strategy = Strategy::TrendFollowing { lookback: 2 };
        assert_eq!(strategy.detect(&quote(dec!(95)), &sample_history()), Signal::Sell);
    }

    #[test]
    fn test_mean_reversion_around_sma() {
        let strategy = Strategy::MeanReversion {
            lookback: 5,
            sma_period: 5,
        };
        let history = flat_closes(dec!(100), 5);

        assert_eq!(strategy.detect(&quote(dec!(99.99)), &history), Signal::Buy);
        assert_eq!(strategy.detect(&quote(dec!(100.01)), &history), Signal::Sell);
        assert_eq!(strategy.detect(&quote(dec!(100.00)), &history), Signal::Hold);
    }

    #[test]
    fn test_mean_reversion_uses_sma_period() {
        // SMA over the last three closes: (105 + 103 + 110) / 3 = 106
        let strategy = Strategy::MeanReversion {
            lookback: 5,
            sma_period: 3,
        };
        assert_eq!(strategy.detect(&quote(dec!(106)), &sample_history()), Signal::Hold);
        assert_eq!(strategy.detect(&quote(dec!(105)), &sample_history()), Signal::Buy);
    }

    #[test]
    fn test_breakout_requires_high_volume() {
        let strategy = Strategy::Breakout { lookback: 5 };

        // Average volume 1320, latest 2000 > 1980: high volume
        assert_eq!(strategy.detect(&quote(dec!(115)), &sample_history()), Signal::Buy);
        assert_eq!(strategy.detect(&quote(dec!(85)), &sample_history()), Signal::Sell);
        assert_eq!(strategy.detect(&quote(dec!(100)), &sample_history()), Signal::Hold);

        // Same prices, ordinary volume
        let mut quiet = sample_history();
        quiet[4].volume = dec!(1300);
        assert_eq!(strategy.detect(&quote(dec!(115)), &quiet), Signal::Hold);
    }

    #[test]
    fn test_breakout_volume_exactly_one_and_a_half_times_is_not_high() {
        let strategy = Strategy::Breakout { lookback: 2 };
        // Window volumes 1000 and 2000: average 1500, latest must beat 2250
        let history = vec![
            DailyBar::new("2025-06-01", dec!(100), dec!(90), dec!(95), dec!(1000)),
            DailyBar::new("2025-06-02", dec!(100), dec!(90), dec!(95), dec!(2000)),
        ];
        assert_eq!(strategy.detect(&quote(dec!(150)), &history), Signal::Hold);

        // avg = (1000 + 3000) / 2 = 2000, 1.5x = 3000: equal, still Hold
        let history = vec![
            DailyBar::new("2025-06-01", dec!(100), dec!(90), dec!(95), dec!(1000)),
            DailyBar::new("2025-06-02", dec!(100), dec!(90), dec!(95), dec!(3000)),
        ];
        assert_eq!(strategy.detect(&quote(dec!(150)), &history), Signal::Hold);
    }

    #[test]
    fn test_empty_history_holds() {
        let strategy = Strategy::TrendFollowing { lookback: 5 };
        assert_eq!(strategy.detect(&quote(dec!(115)), &[]), Signal::Hold);
    }
}
