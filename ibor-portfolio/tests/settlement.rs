mod common;

use chrono::Utc;
use common::*;
use ibor_core::{
    Isin, JournalType, PortfolioId, SettlementMarker, Side, Trade, TradeId, TradeStatus,
};
use ibor_events::Event;
use ibor_ledger::LedgerResult;
use ibor_portfolio::IborError;
use rust_decimal_macros::dec;

#[test]
fn friday_trade_settles_on_tuesday() {
    let h = harness();
    let receipt = h.book.book_trade(buy(APPLE, 100, dec!(175.50))).unwrap();
    let trade = h.book.get_trade(&receipt.trade_id).unwrap();
    assert_eq!(trade.trade_date, date(2024, 1, 5));
    assert_eq!(trade.settle_date, date(2024, 1, 9));

    assert_eq!(h.book.process_settlements(Some(date(2024, 1, 8))).unwrap(), 0);
    assert_eq!(h.book.process_settlements(Some(date(2024, 1, 9))).unwrap(), 1);
}

#[test]
fn settling_twice_settles_each_trade_once() {
    let h = harness();
    let buy_id = h.book.book_trade(buy(APPLE, 100, dec!(175.50))).unwrap().trade_id;
    let sell_id = h.book.book_trade(sell(APPLE, 30, dec!(176.00))).unwrap().trade_id;

    assert_eq!(h.book.process_settlements(Some(date(2024, 1, 9))).unwrap(), 2);
    assert_eq!(h.book.process_settlements(Some(date(2024, 1, 9))).unwrap(), 0);

    for trade_id in [buy_id, sell_id] {
        let journals = h.book.get_journals_for_trade(&trade_id).unwrap();
        assert_eq!(journals.len(), 2);
        assert!(journals.iter().all(|journal| journal.is_balanced()));
        let trade = h.book.get_trade(&trade_id).unwrap();
        assert_eq!(trade.status, TradeStatus::Settled);
        assert_eq!(trade.version, 1);
    }

    let settlement = h
        .book
        .get_journals_for_trade(&sell_id)
        .unwrap()
        .into_iter()
        .find(|journal| journal.journal_type == JournalType::SettlementDate)
        .unwrap();
    assert_eq!(settlement.lines.len(), 4);
    assert_eq!(settlement.total_debit(), dec!(10560.0000));
}

#[test]
fn omitted_date_uses_clock_today() {
    let h = harness();
    let request = request(APPLE, 5, dec!(175.50), Side::Buy, date(2024, 1, 8));
    let trade_id = h.book.book_trade(request).unwrap().trade_id;
    assert_eq!(h.book.get_trade(&trade_id).unwrap().settle_date, today());
    assert_eq!(h.book.process_settlements(None).unwrap(), 1);
}

#[test]
fn one_bad_trade_does_not_block_the_batch() {
    let h = harness();
    let good = h.book.book_trade(buy(APPLE, 100, dec!(175.50))).unwrap().trade_id;

    let orphan = Trade {
        trade_id: TradeId::new(),
        isin: Isin::parse(MICROSOFT).unwrap(),
        quantity: 1,
        price: dec!(415.20),
        side: Side::Buy,
        trade_date: date(2024, 1, 5),
        settle_date: date(2024, 1, 9),
        status: TradeStatus::New,
        portfolio_id: PortfolioId::default(),
        version: 0,
        created_at: Utc::now(),
    };
    h.ledger.write(|s| s.insert_trade(&orphan)).unwrap();

    assert_eq!(h.book.process_settlements(Some(date(2024, 1, 9))).unwrap(), 1);
    assert_eq!(h.book.get_journals_for_trade(&good).unwrap().len(), 2);
    assert!(matches!(
        h.book.settle_trade(orphan.trade_id),
        Err(IborError::MissingTradeDateJournal(_))
    ));
    assert_eq!(h.book.get_trade(&orphan.trade_id).unwrap().status, TradeStatus::New);
}

#[test]
fn settlement_journal_always_has_a_trade_date_journal() {
    let h = harness();
    for quantity in [10, 20, 30] {
        h.book.book_trade(buy(APPLE, quantity, dec!(175.50))).unwrap();
    }
    h.book.process_settlements(Some(date(2024, 1, 9))).unwrap();
    let recent = h.book.get_recent_journals(Some(50)).unwrap();
    assert_eq!(recent.len(), 6);
    for journal in recent
        .iter()
        .filter(|journal| journal.journal_type == JournalType::SettlementDate)
    {
        assert!(recent.iter().any(|other| other.trade_id == journal.trade_id
            && other.journal_type == JournalType::TradeDate));
    }
}

#[test]
fn marker_without_journal_is_reported_and_alerted() {
    let h = harness();
    let trade_id = h.book.book_trade(buy(APPLE, 1, dec!(175.50))).unwrap().trade_id;
    h.ledger
        .write(|s| -> LedgerResult<bool> {
            s.insert_settlement_marker(&SettlementMarker {
                trade_id,
                settled_at: Utc::now(),
            })
        })
        .unwrap();
    let mut stream = h.book.subscribe();

    let err = h.book.settle_trade(trade_id).unwrap_err();
    assert!(matches!(err, IborError::SettlementInconsistency(id) if id == trade_id));
    assert!(err.is_alert());
    let alerts: Vec<_> = stream
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            Event::Alert(alert) => Some(alert),
            _ => None,
        })
        .collect();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, "settlement_inconsistency");
    assert_eq!(h.book.get_journals_for_trade(&trade_id).unwrap().len(), 1);
}
