use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Args, Parser, Subcommand};
use ibor_config::{load_config, ConfigSources, IborConfig};
use ibor_core::{Isin, PortfolioId, Side, TradeId, TradeRequest};
use ibor_ledger::{TradeQuery, DEFAULT_TRADE_LIMIT};
use ibor_portfolio::{BookOfRecord, DEFAULT_RECENT_JOURNALS};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::telemetry::init_tracing;

const DEFAULT_CASH_HISTORY: usize = 100;

#[derive(Parser)]
#[command(name = "ibor", version, about = "Investment book of record operator CLI")]
pub struct Cli {
    /// Configuration environment; loads config/<env>.toml on top of the defaults
    #[arg(long, global = true)]
    env: Option<String>,
    /// Directory containing default.toml and per-environment overrides
    #[arg(long, global = true, default_value = "config")]
    config_dir: PathBuf,
    /// Extra configuration file applied after the environment layer
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the SQLite database path
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Book and inspect trades
    Trade {
        #[command(subcommand)]
        action: TradeCommand,
    },
    /// Cash balances and the cash ledger
    Cash {
        #[command(subcommand)]
        action: CashCommand,
    },
    /// Current positions across all instruments
    Positions,
    /// Accounting journals
    Journals {
        #[command(subcommand)]
        action: JournalCommand,
    },
    /// Post settlement-date journals for trades due on a date
    Settle {
        /// Settlement date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Net asset value snapshots
    Nav {
        #[command(subcommand)]
        action: NavCommand,
    },
    /// Inspect the resolved configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum TradeCommand {
    /// Book a trade; resubmitting a trade id is answered idempotently
    Book(BookArgs),
    /// Show one trade
    Show { trade_id: TradeId },
    /// List trades, newest first
    List(ListArgs),
    /// Delete every trade row (operations only)
    Clear {
        /// Identity of the person performing the clear
        #[arg(long)]
        operator: String,
    },
}

#[derive(Args)]
pub struct BookArgs {
    #[arg(long)]
    isin: String,
    #[arg(long)]
    quantity: i64,
    #[arg(long)]
    price: Decimal,
    /// BUY or SELL
    #[arg(long)]
    side: Side,
    #[arg(long)]
    trade_id: Option<TradeId>,
    /// Defaults to today
    #[arg(long)]
    trade_date: Option<NaiveDate>,
    /// Defaults to trade date plus two business days
    #[arg(long)]
    settle_date: Option<NaiveDate>,
    #[arg(long)]
    portfolio: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Earliest trade date (inclusive)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Latest trade date (inclusive)
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long)]
    isin: Option<Isin>,
    #[arg(long, default_value_t = DEFAULT_TRADE_LIMIT)]
    limit: usize,
}

#[derive(Subcommand)]
pub enum CashCommand {
    /// Current balance of a portfolio
    Balance {
        #[arg(long)]
        portfolio: Option<String>,
    },
    /// Most recent cash movements
    History {
        #[arg(long)]
        portfolio: Option<String>,
        #[arg(long, default_value_t = DEFAULT_CASH_HISTORY)]
        limit: usize,
    },
    /// Erase the cash history and seed a single balance row
    Reset {
        /// Identity of the person authorizing the reset
        #[arg(long)]
        operator: String,
        #[arg(long)]
        portfolio: Option<String>,
        /// Defaults to cash.reset_amount
        #[arg(long)]
        amount: Option<Decimal>,
    },
}

#[derive(Subcommand)]
pub enum JournalCommand {
    /// Journals posted for one trade
    Trade { trade_id: TradeId },
    /// Most recently posted journals
    Recent {
        #[arg(long, default_value_t = DEFAULT_RECENT_JOURNALS)]
        limit: usize,
    },
}

#[derive(Subcommand)]
pub enum NavCommand {
    /// Value the portfolio now and store the snapshot
    Calculate {
        #[arg(long)]
        portfolio: Option<String>,
    },
    /// Most recent snapshot
    Latest {
        #[arg(long)]
        portfolio: Option<String>,
    },
    /// Snapshots calculated between two dates (inclusive)
    History {
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[arg(long)]
        portfolio: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the merged configuration as TOML
    Show,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    let _guard = init_tracing(&config.log)?;
    debug!(database = %config.database.path.display(), "configuration resolved");

    if let Commands::Config {
        action: ConfigCommand::Show,
    } = &cli.command
    {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let book = BookOfRecord::from_config(&config).context("failed to open the book of record")?;
    dispatch(&book, cli.command)
}

fn resolve_config(cli: &Cli) -> Result<IborConfig> {
    let mut sources = ConfigSources::new(&cli.config_dir);
    if let Some(env) = &cli.env {
        sources = sources.with_env(env);
    }
    if let Some(file) = &cli.config {
        sources = sources.with_file(file);
    }
    let mut config = load_config(&sources)?;
    if let Some(path) = &cli.database {
        config.database.path = path.clone();
    }
    Ok(config)
}

fn dispatch(book: &BookOfRecord, command: Commands) -> Result<()> {
    match command {
        Commands::Trade { action } => trade(book, action),
        Commands::Cash { action } => cash(book, action),
        Commands::Positions => emit(&book.get_all_positions()?),
        Commands::Journals { action } => match action {
            JournalCommand::Trade { trade_id } => emit(&book.get_journals_for_trade(&trade_id)?),
            JournalCommand::Recent { limit } => emit(&book.get_recent_journals(Some(limit))?),
        },
        Commands::Settle { date } => {
            let settled = book.process_settlements(date)?;
            info!(settled, "settlement complete");
            emit(&json!({ "settled": settled }))
        }
        Commands::Nav { action } => nav(book, action),
        Commands::Config { .. } => Ok(()),
    }
}

fn trade(book: &BookOfRecord, action: TradeCommand) -> Result<()> {
    match action {
        TradeCommand::Book(args) => {
            let trade_date = args.trade_date.unwrap_or_else(|| Utc::now().date_naive());
            let mut request =
                TradeRequest::new(args.isin, args.quantity, args.price, args.side, trade_date);
            request.trade_id = args.trade_id;
            request.settle_date = args.settle_date;
            request.portfolio_id = args.portfolio.map(PortfolioId::from);
            emit(&book.book_trade(request)?)
        }
        TradeCommand::Show { trade_id } => emit(&book.get_trade(&trade_id)?),
        TradeCommand::List(args) => {
            let mut query = TradeQuery::default()
                .with_trade_date_range(args.from, args.to)
                .with_limit(args.limit);
            if let Some(isin) = args.isin {
                query = query.with_isin(isin);
            }
            emit(&book.list_trades(&query)?)
        }
        TradeCommand::Clear { operator } => {
            let deleted = book.clear_trades(&operator)?;
            emit(&json!({ "deleted": deleted }))
        }
    }
}

fn cash(book: &BookOfRecord, action: CashCommand) -> Result<()> {
    match action {
        CashCommand::Balance { portfolio } => {
            emit(&book.get_current_balance(portfolio_id(portfolio).as_ref())?)
        }
        CashCommand::History { portfolio, limit } => {
            emit(&book.get_cash_history(portfolio_id(portfolio).as_ref(), limit)?)
        }
        CashCommand::Reset {
            operator,
            portfolio,
            amount,
        } => emit(&book.reset_cash_balance(portfolio_id(portfolio).as_ref(), amount, &operator)?),
    }
}

fn nav(book: &BookOfRecord, action: NavCommand) -> Result<()> {
    match action {
        NavCommand::Calculate { portfolio } => {
            emit(&book.calculate_nav(portfolio_id(portfolio).as_ref())?)
        }
        NavCommand::Latest { portfolio } => {
            emit(&book.get_latest_nav(portfolio_id(portfolio).as_ref())?)
        }
        NavCommand::History {
            start,
            end,
            portfolio,
        } => {
            if end < start {
                bail!("--end {end} precedes --start {start}");
            }
            let history = book.get_nav_history(
                portfolio_id(portfolio).as_ref(),
                start_of_day(start),
                end_of_day(end)?,
            )?;
            emit(&history)
        }
    }
}

fn portfolio_id(raw: Option<String>) -> Option<PortfolioId> {
    raw.map(PortfolioId::from)
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(date: NaiveDate) -> Result<DateTime<Utc>> {
    date.and_hms_micro_opt(23, 59, 59, 999_999)
        .map(|ts| ts.and_utc())
        .with_context(|| format!("cannot represent end of {date}"))
}

fn emit<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}
