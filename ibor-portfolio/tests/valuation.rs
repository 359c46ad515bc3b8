mod common;

use chrono::Duration;
use common::*;
use ibor_core::{CashReason, Clock, Isin, PortfolioId};
use ibor_portfolio::IborError;
use rust_decimal_macros::dec;

#[test]
fn nav_matches_worked_example() {
    let h = harness();
    h.book.book_trade(buy(APPLE, 100, dec!(175.50))).unwrap();
    h.book
        .reset_cash_balance(None, Some(dec!(1000.00)), "ops@desk")
        .unwrap();

    let snapshot = h.book.calculate_nav(None).unwrap();
    assert_eq!(snapshot.gross_value, dec!(18550.00));
    assert_eq!(snapshot.fee_accrual, dec!(0.2541));
    assert_eq!(snapshot.net_value, dec!(18549.7459));
    assert_eq!(snapshot.shares_outstanding, 1_000_000);
    assert_eq!(snapshot.nav_per_share, dec!(0.0185));

    let latest = h.book.get_latest_nav(None).unwrap().unwrap();
    assert_eq!(latest.id, snapshot.id);
    assert_eq!(latest.net_value, dec!(18549.7459));
}

#[test]
fn empty_book_values_to_zero() {
    let h = harness();
    let snapshot = h.book.calculate_nav(None).unwrap();
    assert_eq!(snapshot.gross_value, dec!(0));
    assert_eq!(snapshot.nav_per_share, dec!(0));
}

#[test]
fn missing_price_writes_no_snapshot() {
    let h = harness();
    h.book.book_trade(buy("US0231351067", 1, dec!(182.75))).unwrap();
    let err = h.book.calculate_nav(None).unwrap_err();
    assert!(matches!(err, IborError::PriceUnavailable(_)));
    assert!(h.book.get_latest_nav(None).unwrap().is_none());

    h.oracle
        .set_price(Isin::parse("US0231351067").unwrap(), dec!(182.75));
    assert!(h.book.calculate_nav(None).is_ok());
}

#[test]
fn nav_history_is_an_ordered_series() {
    let h = harness();
    let start = h.clock.now();
    for _ in 0..3 {
        h.book.calculate_nav(None).unwrap();
        h.clock.advance(Duration::days(1));
    }
    let history = h
        .book
        .get_nav_history(None, start, start + Duration::days(1))
        .unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].calculation_date < history[1].calculation_date);
    assert!(matches!(
        h.book.get_nav_history(None, start, start - Duration::days(1)),
        Err(IborError::Validation(_))
    ));
}

#[test]
fn reset_replaces_history_with_one_admin_row() {
    let h = harness();
    h.book.book_trade(buy(APPLE, 10, dec!(175.50))).unwrap();
    h.book.book_trade(buy(MICROSOFT, 5, dec!(415.20))).unwrap();

    let outcome = h
        .book
        .reset_cash_balance(None, Some(dec!(250000.00)), "treasury")
        .unwrap();
    assert_eq!(outcome.entries_cleared, 2);
    assert_eq!(outcome.balance, dec!(250000.00));
    assert_eq!(outcome.currency, "USD");

    let history = h.book.get_cash_history(None, 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].reason, CashReason::ResetBalance);
    assert_eq!(history[0].balance, Some(dec!(250000.00)));
    assert_eq!(h.book.get_current_balance(None).unwrap().balance, dec!(250000.00));
}

#[test]
fn reset_requires_an_operator_and_uses_configured_default() {
    let h = harness();
    assert!(matches!(
        h.book.reset_cash_balance(None, None, ""),
        Err(IborError::Validation(_))
    ));
    let outcome = h.book.reset_cash_balance(None, None, "ops").unwrap();
    assert_eq!(outcome.balance, dec!(10000000.00));
}

#[test]
fn cash_is_tracked_per_portfolio() {
    let h = harness();
    let growth = PortfolioId::from("GROWTH");
    h.book
        .book_trade(buy(APPLE, 10, dec!(175.50)).with_portfolio("GROWTH"))
        .unwrap();
    assert_eq!(
        h.book.get_current_balance(Some(&growth)).unwrap().balance,
        dec!(-1755.00)
    );
    assert_eq!(h.book.get_current_balance(None).unwrap().balance, dec!(0.00));
}
