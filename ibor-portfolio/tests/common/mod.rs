#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use ibor_core::{Clock, FixedClock, Isin, PriceOracle, Side, StaticPriceOracle, TradeRequest};
use ibor_events::EventBus;
use ibor_ledger::SqliteLedger;
use ibor_portfolio::{BookOfRecord, BookSettings};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::TempDir;

pub const APPLE: &str = "US0378331005";
pub const MICROSOFT: &str = "US5949181045";

pub struct Harness {
    pub dir: TempDir,
    pub book: BookOfRecord,
    pub ledger: SqliteLedger,
    pub clock: Arc<FixedClock>,
    pub oracle: Arc<StaticPriceOracle>,
}

/// Wednesday 2024-01-10.
pub fn today() -> NaiveDate {
    date(2024, 1, 10)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn harness() -> Harness {
    harness_with(BookSettings::default())
}

pub fn harness_with(settings: BookSettings) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let ledger = SqliteLedger::new(dir.path().join("ibor.db")).unwrap();
    let clock = Arc::new(FixedClock::on(today()));
    let oracle = Arc::new(StaticPriceOracle::new([
        (Isin::parse(APPLE).unwrap(), dec!(175.50)),
        (Isin::parse(MICROSOFT).unwrap(), dec!(415.20)),
    ]));
    let book = BookOfRecord::new(
        ledger.clone(),
        settings,
        clock.clone() as Arc<dyn Clock>,
        oracle.clone() as Arc<dyn PriceOracle>,
        Arc::new(EventBus::new(256)),
    );
    Harness {
        dir,
        book,
        ledger,
        clock,
        oracle,
    }
}

pub fn request(
    isin: &str,
    quantity: i64,
    price: Decimal,
    side: Side,
    trade_date: NaiveDate,
) -> TradeRequest {
    TradeRequest::new(isin, quantity, price, side, trade_date)
}

pub fn buy(isin: &str, quantity: i64, price: Decimal) -> TradeRequest {
    request(isin, quantity, price, Side::Buy, date(2024, 1, 5))
}

pub fn sell(isin: &str, quantity: i64, price: Decimal) -> TradeRequest {
    request(isin, quantity, price, Side::Sell, date(2024, 1, 5))
}
