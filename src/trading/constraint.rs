//! Trade eligibility: market-hours calendar and the one-trade-per-day limit.
//!
//! The gate owns the only state that outlives a pipeline run, the timestamp of
//! the last placed trade. A run that intends to trade opens a [`GateSession`],
//! which holds the state lock from the eligibility check until the trade is
//! recorded, so concurrent runs cannot both pass the daily limit.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use chrono_tz::America::New_York;
use chrono_tz::Tz;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

pub const TRADE_ALLOWED: &str = "Trade allowed.";
pub const MARKET_CLOSED: &str = "Market is closed. Trading not allowed.";
pub const DAILY_LIMIT_REACHED: &str = "Trade limit reached for today.";

/// Exchange calendar timezone.
const EXCHANGE_TZ: Tz = New_York;

fn market_open() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN)
}

fn market_close() -> NaiveTime {
    NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Source of "now" for the gate.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Which eligibility rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSet {
    /// Regular US equity session plus one trade per calendar day.
    Default,
    /// No restrictions.
    AlwaysTrade,
}

impl FromStr for ConstraintSet {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "default" | "markethours" => Ok(Self::Default),
            "alwaystrade" | "always" => Ok(Self::AlwaysTrade),
            _ => bail!("Constraint set {} not supported.", s),
        }
    }
}

/// Outcome of an eligibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateResult {
    pub allowed: bool,
    pub reason: String,
}

impl GateResult {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: TRADE_ALLOWED.to_string(),
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

/// Trade history needed for the daily limit.
#[derive(Debug, Default, Clone)]
pub struct EligibilityState {
    pub last_trade_at: Option<DateTime<Utc>>,
}

/// Shared eligibility gate. Clones share the same state.
#[derive(Clone)]
pub struct EligibilityGate {
    constraint_set: ConstraintSet,
    state: Arc<Mutex<EligibilityState>>,
    clock: Arc<dyn Clock>,
}

impl EligibilityGate {
    pub fn new(constraint_set: ConstraintSet) -> Self {
        Self::with_clock(constraint_set, Arc::new(SystemClock))
    }

    pub fn with_clock(constraint_set: ConstraintSet, clock: Arc<dyn Clock>) -> Self {
        Self {
            constraint_set,
            state: Arc::new(Mutex::new(EligibilityState::default())),
            clock,
        }
    }

    pub fn constraint_set(&self) -> ConstraintSet {
        self.constraint_set
    }

    /// Lock the gate state for one pipeline run.
    pub async fn session(&self) -> GateSession<'_> {
        GateSession {
            gate: self,
            state: self.state.lock().await,
        }
    }

    /// One-off eligibility check.
    pub async fn can_trade(&self) -> GateResult {
        self.session().await.can_trade()
    }

    /// Record a trade placed now. Runs record through their [`GateSession`].
    #[cfg(test)]
    pub async fn record_trade(&self) {
        self.session().await.record_trade();
    }

    pub async fn last_trade_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.last_trade_at
    }

    fn evaluate(&self, state: &EligibilityState) -> GateResult {
        match self.constraint_set {
            ConstraintSet::AlwaysTrade => GateResult::allow(),
            ConstraintSet::Default => {
                let now = self.clock.now().with_timezone(&EXCHANGE_TZ);

                if !is_trading_day(now.weekday()) || !is_session_time(now.time()) {
                    debug!(local_time = %now, "Outside regular session");
                    return GateResult::deny(MARKET_CLOSED);
                }

                let traded_today = state
                    .last_trade_at
                    .is_some_and(|last| last.with_timezone(&EXCHANGE_TZ).date_naive() == now.date_naive());
                if traded_today {
                    return GateResult::deny(DAILY_LIMIT_REACHED);
                }

                GateResult::allow()
            }
        }
    }
}

/// Exclusive access to the gate state for the span of one run.
pub struct GateSession<'a> {
    gate: &'a EligibilityGate,
    state: MutexGuard<'a, EligibilityState>,
}

impl GateSession<'_> {
    pub fn can_trade(&self) -> GateResult {
        self.gate.evaluate(&self.state)
    }

    /// Must only be called after a successful placement.
    pub fn record_trade(&mut self) {
        let now = self.gate.clock.now();
        self.state.last_trade_at = Some(now);
        info!(at = %now, "Trade recorded");
    }
}

fn is_trading_day(day: Weekday) -> bool {
    !matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Open and close instants are both inside the session.
fn is_session_time(time: NaiveTime) -> bool {
    time >= market_open() && time <= market_close()
}
