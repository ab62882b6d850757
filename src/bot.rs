//! Bot runner: the single-trade decision pipeline.
//!
//! One run walks Gating → Fetching → Deciding → Sizing → Submitting and ends
//! in exactly one [`TradeOutcome`]. Every early exit is a value, never an
//! error; nothing is retried.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Notify;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::api::Platform;
use crate::models::{Order, OrderResult, Signal, TOO_SMALL_MESSAGE};
use crate::trading::{EligibilityGate, PositionSizer, TradingConfig};

pub const BALANCE_UNAVAILABLE: &str = "Failed to fetch account balance.";
pub const HISTORY_UNAVAILABLE: &str = "Failed to fetch daily history data.";
pub const QUOTE_UNAVAILABLE: &str = "Failed to fetch real-time quote.";
pub const NO_SIGNAL: &str = "No clear trend: Hold.";

/// Terminal state of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeOutcome {
    /// The eligibility gate said no; carries its reason.
    Ineligible(String),
    BalanceUnavailable,
    HistoryUnavailable,
    QuoteUnavailable,
    /// Strategy returned Hold.
    NoSignal,
    /// Sizing produced zero shares.
    PositionTooSmall,
    /// Sized but deliberately not submitted.
    DryRun { symbol: String, order: Order },
    /// The brokerage answered the placement call.
    Submitted(OrderResult),
}

impl TradeOutcome {
    pub fn is_trade_placed(&self) -> bool {
        matches!(self, TradeOutcome::Submitted(result) if result.success)
    }
}

impl fmt::Display for TradeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeOutcome::Ineligible(reason) => f.write_str(reason),
            TradeOutcome::BalanceUnavailable => f.write_str(BALANCE_UNAVAILABLE),
            TradeOutcome::HistoryUnavailable => f.write_str(HISTORY_UNAVAILABLE),
            TradeOutcome::QuoteUnavailable => f.write_str(QUOTE_UNAVAILABLE),
            TradeOutcome::NoSignal => f.write_str(NO_SIGNAL),
            TradeOutcome::PositionTooSmall => f.write_str(TOO_SMALL_MESSAGE),
            TradeOutcome::DryRun { symbol, order } => {
                write!(f, "[DRY RUN] Would place order: {}", order.describe(symbol))
            }
            TradeOutcome::Submitted(result) => f.write_str(&result.message),
        }
    }
}

/// Stop request for the run loop, set from the Ctrl+C handler.
#[derive(Default)]
struct Shutdown {
    requested: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    fn trigger(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    fn is_triggered(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Main bot runner.
pub struct Bot {
    config: TradingConfig,
    platform: Arc<dyn Platform>,
    gate: EligibilityGate,
    sizer: PositionSizer,
    dry_run: bool,

    // Shutdown signal
    shutdown: Arc<Shutdown>,
}

impl Bot {
    /// Create a bot wired to the configured brokerage and constraint set.
    pub fn new(config: TradingConfig) -> Result<Self> {
        let platform: Arc<dyn Platform> = Arc::from(config.platform.connect()?);
        let gate = EligibilityGate::new(config.constraint_set);
        info!(platform = %config.platform, constraint = ?config.constraint_set, "Bot created");
        Ok(Self::with_platform(config, platform, gate))
    }

    /// Create a bot around an existing backend and gate.
    ///
    /// Bots built from clones of the same gate share its daily trade limit.
    pub fn with_platform(config: TradingConfig, platform: Arc<dyn Platform>, gate: EligibilityGate) -> Self {
        let sizer = PositionSizer::new(config.risk);
        Self {
            config,
            platform,
            gate,
            sizer,
            dry_run: false,
            shutdown: Arc::new(Shutdown::default()),
        }
    }

    /// Size orders without submitting them.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn gate(&self) -> &EligibilityGate {
        &self.gate
    }

    /// Run the pipeline once.
    pub async fn run_once(&self) -> TradeOutcome {
        let outcome = self.execute().await;
        info!(symbol = %self.config.symbol, outcome = %outcome, "Pipeline finished");
        outcome
    }

    async fn execute(&self) -> TradeOutcome {
        let cfg = &self.config;

        // 1. Gate. The session holds the gate lock until the trade is recorded.
        let mut session = self.gate.session().await;
        let eligibility = session.can_trade();
        if !eligibility.allowed {
            return TradeOutcome::Ineligible(eligibility.reason);
        }

        // 2. Fetch balance, history, quote in that order
        debug!(account = %cfg.account_id, "Fetching balance");
        let Some(balance) = self.platform.fetch_balance(&cfg.account_id, &cfg.token).await else {
            return TradeOutcome::BalanceUnavailable;
        };

        let window = cfg.strategy.history_window();
        debug!(symbol = %cfg.symbol, window = window, "Fetching daily history");
        let history = match self
            .platform
            .fetch_daily_history(&cfg.symbol, window, &cfg.token)
            .await
        {
            Some(history) if !history.is_empty() => history,
            _ => return TradeOutcome::HistoryUnavailable,
        };

        debug!(symbol = %cfg.symbol, "Fetching quote");
        let Some(quote) = self.platform.fetch_quote(&cfg.symbol, &cfg.token).await else {
            return TradeOutcome::QuoteUnavailable;
        };

        // 3. Decide
        let signal = cfg.strategy.detect(&quote, &history);
        info!(
            symbol = %cfg.symbol,
            strategy = %cfg.strategy,
            last = %quote.last,
            bars = history.len(),
            signal = %signal,
            "Signal"
        );
        if signal == Signal::Hold {
            return TradeOutcome::NoSignal;
        }

        // 4. Size
        let order = self.sizer.calculate_order(&quote, balance, signal);
        if !order.is_submittable() {
            return TradeOutcome::PositionTooSmall;
        }

        if self.dry_run {
            return TradeOutcome::DryRun {
                symbol: cfg.symbol.clone(),
                order,
            };
        }

        // 5. Submit
        let result = self
            .platform
            .place_order(&cfg.account_id, &cfg.symbol, &order, &cfg.token)
            .await;
        if result.success {
            session.record_trade();
        } else {
            warn!(message = %result.message, "Order not placed");
        }

        TradeOutcome::Submitted(result)
    }

    /// Run the pipeline every `interval_secs` until Ctrl+C, handing each
    /// outcome to `on_outcome`.
    pub async fn run<F>(&self, interval_secs: u64, mut on_outcome: F) -> Result<()>
    where
        F: FnMut(&TradeOutcome),
    {
        info!(
            symbol = %self.config.symbol,
            interval = interval_secs,
            constraint = ?self.gate().constraint_set(),
            dry_run = self.dry_run,
            "Starting bot run loop"
        );

        let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));

        // Register shutdown handler
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
            shutdown.trigger();
        });

        while !self.shutdown.is_triggered() {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.shutdown.notify.notified() => break,
            }

            let outcome = self.run_once().await;
            if outcome.is_trade_placed() {
                let at = self.gate.last_trade_at().await;
                info!(symbol = %self.config.symbol, at = ?at, "Trade placed this tick");
            }
            on_outcome(&outcome);
        }

        info!("Bot shutdown complete");
        Ok(())
    }
}
