//! Investment book of record: trade booking, positions, cash, journals,
//! settlement and NAV, wired together behind [`BookOfRecord`].

mod booking;
mod cash;
mod error;
mod journal;
mod nav;
mod position;
mod settlement;
mod store;

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use ibor_config::IborConfig;
use ibor_core::{
    BookingReceipt, CashBalance, CashEntry, CashResetOutcome, Clock, Journal, NavSnapshot,
    PortfolioId, Position, PriceOracle, StaticPriceOracle, SystemClock, Trade, TradeId,
    TradeRequest,
};
use ibor_events::{EventBus, EventStream};
use ibor_ledger::{SqliteLedger, TradeQuery};
use rust_decimal::Decimal;
use tracing::{info, warn};

pub use booking::TradeBookingEngine;
pub use cash::CashLedger;
pub use error::{IborError, IborResult};
pub use journal::JournalEngine;
pub use nav::NavCalculator;
pub use position::PositionLedger;
pub use settlement::SettlementProcessor;
pub use store::{Store, UnitOfWork};

pub const DEFAULT_RECENT_JOURNALS: usize = 10;

/// Tunables for the book of record, normally taken from [`IborConfig`].
#[derive(Clone, Debug)]
pub struct BookSettings {
    pub currency: String,
    pub default_portfolio: PortfolioId,
    pub reset_amount: Decimal,
    pub fee_rate: Decimal,
    pub shares_outstanding: u64,
    pub allow_short: bool,
}

impl Default for BookSettings {
    fn default() -> Self {
        Self {
            currency: "USD".into(),
            default_portfolio: PortfolioId::default(),
            reset_amount: Decimal::new(1_000_000_000, 2),
            fee_rate: Decimal::new(5, 3),
            shares_outstanding: 1_000_000,
            allow_short: false,
        }
    }
}

impl From<&IborConfig> for BookSettings {
    fn from(config: &IborConfig) -> Self {
        Self {
            currency: config.cash.currency.clone(),
            default_portfolio: config.cash.default_portfolio(),
            reset_amount: config.cash.reset_amount,
            fee_rate: config.nav.fee_rate,
            shares_outstanding: config.nav.shares_outstanding,
            allow_short: config.positions.allow_short,
        }
    }
}

/// Entry point for every book-of-record operation.
pub struct BookOfRecord {
    store: Store,
    settings: BookSettings,
    booking: TradeBookingEngine,
    positions: PositionLedger,
    cash: CashLedger,
    journals: JournalEngine,
    settlement: SettlementProcessor,
    nav: NavCalculator,
}

impl BookOfRecord {
    pub fn new(
        ledger: SqliteLedger,
        settings: BookSettings,
        clock: Arc<dyn Clock>,
        oracle: Arc<dyn PriceOracle>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            booking: TradeBookingEngine::new(clock.clone(), settings.default_portfolio.clone()),
            positions: PositionLedger::new(clock.clone(), settings.allow_short),
            cash: CashLedger::new(clock.clone(), settings.currency.clone()),
            journals: JournalEngine::new(clock.clone()),
            settlement: SettlementProcessor::new(),
            nav: NavCalculator::new(
                clock.clone(),
                oracle,
                settings.fee_rate,
                settings.shares_outstanding,
            ),
            store: Store::new(ledger, bus, clock),
            settings,
        }
    }

    /// Open the configured database with the wall clock and the configured price table.
    pub fn from_config(config: &IborConfig) -> IborResult<Self> {
        let prices = config
            .price_table()
            .map_err(|err| IborError::Config(format!("{err:#}")))?;
        let ledger = SqliteLedger::with_busy_timeout(
            &config.database.path,
            config.database.busy_timeout(),
        )?;
        info!(
            path = %config.database.path.display(),
            prices = prices.len(),
            "book of record opened"
        );
        Ok(Self::new(
            ledger,
            BookSettings::from(config),
            Arc::new(SystemClock),
            Arc::new(StaticPriceOracle::new(prices)),
            Arc::new(EventBus::new(config.events.capacity)),
        ))
    }

    pub fn settings(&self) -> &BookSettings {
        &self.settings
    }

    pub fn subscribe(&self) -> EventStream {
        self.store.bus().subscribe()
    }

    pub fn book_trade(&self, request: TradeRequest) -> IborResult<BookingReceipt> {
        self.store.transact(|uow| {
            self.booking
                .book(uow, request, &self.positions, &self.cash, &self.journals)
        })
    }

    pub fn get_trade(&self, trade_id: &TradeId) -> IborResult<Trade> {
        self.store
            .read(|session| Ok(session.trade(trade_id)?))?
            .ok_or_else(|| IborError::NotFound(format!("trade {trade_id}")))
    }

    pub fn list_trades(&self, query: &TradeQuery) -> IborResult<Vec<Trade>> {
        self.store.read(|session| Ok(session.trades(query)?))
    }

    /// Delete every trade row. Idempotency markers, cash and journals stay.
    pub fn clear_trades(&self, operator: &str) -> IborResult<usize> {
        let operator = require_operator(operator)?;
        let deleted = self
            .store
            .transact(|uow| Ok(uow.session().clear_trades()?))?;
        warn!(operator, deleted, "trades cleared");
        Ok(deleted)
    }

    pub fn get_current_balance(&self, portfolio: Option<&PortfolioId>) -> IborResult<CashBalance> {
        let portfolio = self.portfolio(portfolio);
        self.store
            .read(|session| self.cash.balance(session, &portfolio))
    }

    pub fn get_cash_history(
        &self,
        portfolio: Option<&PortfolioId>,
        limit: usize,
    ) -> IborResult<Vec<CashEntry>> {
        let portfolio = self.portfolio(portfolio);
        self.store
            .read(|session| self.cash.history(session, &portfolio, limit))
    }

    /// Administrative reset; `target` defaults to the configured reset amount.
    pub fn reset_cash_balance(
        &self,
        portfolio: Option<&PortfolioId>,
        target: Option<Decimal>,
        operator: &str,
    ) -> IborResult<CashResetOutcome> {
        let portfolio = self.portfolio(portfolio);
        let target = target.unwrap_or(self.settings.reset_amount);
        self.store
            .transact(|uow| self.cash.reset(uow, &portfolio, target, operator))
    }

    pub fn get_all_positions(&self) -> IborResult<Vec<Position>> {
        self.store.read(|session| self.positions.positions(session))
    }

    pub fn get_journals_for_trade(&self, trade_id: &TradeId) -> IborResult<Vec<Journal>> {
        self.store
            .read(|session| self.journals.journals_for_trade(session, trade_id))
    }

    pub fn get_recent_journals(&self, limit: Option<usize>) -> IborResult<Vec<Journal>> {
        let limit = limit.unwrap_or(DEFAULT_RECENT_JOURNALS);
        self.store
            .read(|session| self.journals.recent_journals(session, limit))
    }

    /// Settle trades due on `date`, or on the clock's today when omitted.
    pub fn process_settlements(&self, date: Option<NaiveDate>) -> IborResult<usize> {
        let date = date.unwrap_or_else(|| self.store.clock().today());
        self.settlement.process(&self.store, &self.journals, date)
    }

    /// Post the settlement-date journal for a single trade.
    pub fn settle_trade(&self, trade_id: TradeId) -> IborResult<Journal> {
        self.store
            .transact(|uow| self.journals.create_settlement_date_journal(uow, trade_id))
    }

    pub fn calculate_nav(&self, portfolio: Option<&PortfolioId>) -> IborResult<NavSnapshot> {
        let portfolio = self.portfolio(portfolio);
        self.store
            .transact(|uow| self.nav.calculate(uow, &portfolio))
    }

    pub fn get_latest_nav(
        &self,
        portfolio: Option<&PortfolioId>,
    ) -> IborResult<Option<NavSnapshot>> {
        let portfolio = self.portfolio(portfolio);
        self.store.read(|session| self.nav.latest(session, &portfolio))
    }

    pub fn get_nav_history(
        &self,
        portfolio: Option<&PortfolioId>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> IborResult<Vec<NavSnapshot>> {
        if end < start {
            return Err(IborError::validation("end", "must not precede start"));
        }
        let portfolio = self.portfolio(portfolio);
        self.store
            .read(|session| self.nav.history(session, &portfolio, start, end))
    }

    fn portfolio(&self, portfolio: Option<&PortfolioId>) -> PortfolioId {
        portfolio
            .cloned()
            .unwrap_or_else(|| self.settings.default_portfolio.clone())
    }
}

fn require_operator(operator: &str) -> IborResult<&str> {
    let operator = operator.trim();
    if operator.is_empty() {
        return Err(IborError::validation("operator", "is required"));
    }
    Ok(operator)
}
