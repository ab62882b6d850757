//! Single-shot equity trade bot
//!
//! Checks whether a trade is allowed, reads market data from a brokerage,
//! derives a buy/sell/hold signal, sizes the position against a risk budget
//! and places at most one order.

mod api;
mod bot;
mod models;
mod trading;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::api::PlatformKind;
use crate::bot::Bot;
use crate::trading::{
    ConstraintSet, EligibilityGate, RiskParameters, Strategy, StrategyKind, TradingConfig,
};

/// Equity trade bot CLI.
#[derive(Parser)]
#[command(name = "tradebot")]
#[command(about = "Place at most one risk-sized equity trade", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline once and print the outcome
    Trade {
        #[command(flatten)]
        args: TradeArgs,
    },

    /// Run the pipeline on a fixed interval until Ctrl+C
    Watch {
        /// Seconds between runs
        #[arg(short, long, default_value = "60")]
        interval: u64,

        #[command(flatten)]
        args: TradeArgs,
    },

    /// Show the resolved configuration
    Config {
        #[command(flatten)]
        args: TradeArgs,
    },
}

#[derive(Args)]
struct TradeArgs {
    /// Brokerage (tradier, schwab, mock)
    #[arg(short, long, default_value = "tradier")]
    platform: String,

    /// API token; defaults to the {PLATFORM}_TOKEN environment variable
    #[arg(short, long)]
    token: Option<String>,

    /// Strategy (trend-following, mean-reversion, breakout)
    #[arg(long, default_value = "trend-following")]
    strategy: String,

    /// Constraint set (default, always-trade)
    #[arg(long, default_value = "default")]
    constraint: String,

    /// Ticker symbol
    #[arg(long, default_value = "AAPL")]
    symbol: String,

    /// Brokerage account; defaults per platform
    #[arg(long)]
    account_id: Option<String>,

    /// Fraction of the balance at risk per trade
    #[arg(long, default_value = "0.01")]
    risk_per_trade: Decimal,

    /// Stop distance as a fraction of the entry price
    #[arg(long, default_value = "0.02")]
    stop_loss: Decimal,

    /// Maximum position value as a fraction of the balance
    #[arg(long, default_value = "0.10")]
    max_position: Decimal,

    /// Days of history for the high/low window
    #[arg(long, default_value = "5")]
    lookback: usize,

    /// Days in the moving average (mean reversion only)
    #[arg(long, default_value = "5")]
    sma_period: usize,

    /// Size the order but do not submit it
    #[arg(long)]
    dry_run: bool,
}

impl TradeArgs {
    fn into_config(self) -> Result<(TradingConfig, bool)> {
        let platform: PlatformKind = self.platform.parse()?;
        let kind: StrategyKind = self.strategy.parse()?;
        let constraint_set: ConstraintSet = self.constraint.parse()?;

        let token = match self.token.or_else(|| std::env::var(platform.token_env_var()).ok()) {
            Some(token) => token,
            // The mock backend never authenticates
            None if platform == PlatformKind::Mock => String::new(),
            None => bail!("Token not provided and {} not set.", platform.token_env_var()),
        };

        let mut config = TradingConfig::new(platform, token);
        if let Some(account_id) = self.account_id {
            config.account_id = account_id;
        }
        config.symbol = self.symbol.to_uppercase();
        config.risk = RiskParameters::new(self.risk_per_trade, self.stop_loss, self.max_position)?;
        config.strategy = Strategy::new(kind, self.lookback, self.sma_period)?;
        config.constraint_set = constraint_set;

        Ok((config, self.dry_run))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Trade { args } => {
            let (config, dry_run) = args.into_config()?;
            info!(
                platform = %config.platform,
                symbol = %config.symbol,
                strategy = %config.strategy,
                dry_run = dry_run,
                "Running trade pipeline"
            );

            let bot = Bot::new(config)?.with_dry_run(dry_run);
            let outcome = bot.run_once().await;
            println!("{}", outcome);
        }

        Commands::Watch { interval, args } => {
            let (config, dry_run) = args.into_config()?;

            println!("\n=== Equity Trade Bot ===");
            println!("Platform:      {}", config.platform);
            println!("Symbol:        {}", config.symbol);
            println!("Strategy:      {}", config.strategy);
            println!("Interval:      {}s", interval);
            println!("Mode:          {}", if dry_run { "DRY RUN (no real trades)" } else { "LIVE TRADING" });
            println!("\nPress Ctrl+C to stop.\n");

            let bot = Bot::new(config)?.with_dry_run(dry_run);
            bot.run(interval, |outcome| println!("{}", outcome)).await?;

            println!("\nBot stopped.");
        }

        Commands::Config { args } => {
            let (config, dry_run) = args.into_config()?;
            let pct = Decimal::from(100);

            println!("\n=== Trading Configuration ===\n");
            println!("Brokerage:");
            println!("  Platform:             {}", config.platform);
            println!("  Account:              {}", config.account_id);
            println!("  Token:                {}", config.masked_token());

            println!("\nStrategy:");
            println!("  Symbol:               {}", config.symbol);
            println!("  Strategy:             {}", config.strategy);
            println!("  History Window:       {} days", config.strategy.history_window());
            println!("  Constraint Set:       {:?}", config.constraint_set);

            println!("\nRisk Management:");
            println!("  Risk Per Trade:       {}%", config.risk.risk_per_trade * pct);
            println!("  Stop Loss:            {}%", config.risk.stop_loss * pct);
            println!("  Max Position:         {}%", config.risk.max_position * pct);
            println!("  Dry Run:              {}", dry_run);

            let eligibility = EligibilityGate::new(config.constraint_set).can_trade().await;
            println!("\nEligibility:");
            println!("  Now:                  {}", eligibility.reason);
        }
    }

    Ok(())
}
