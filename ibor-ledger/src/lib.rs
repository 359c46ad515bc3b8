//! Durable storage for the book of record plus the double-entry posting rules.

mod codec;
mod error;
mod journal;
mod query;
mod schema;
mod sqlite;
mod tables;

pub use error::{LedgerError, LedgerResult};
pub use journal::{build_journal, ensure_balanced, infer_side, settlement_lines, trade_date_lines};
pub use query::{TradeQuery, DEFAULT_TRADE_LIMIT};
pub use sqlite::{LedgerSession, SqliteLedger};
pub use tables::NewCashEntry;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use ibor_core::{
        CashReason, Isin, JournalType, NavSnapshot, PortfolioId, ProcessedTrade, SettlementMarker,
        Side, Trade, TradeId, TradeStatus,
    };
    use rust_decimal_macros::dec;
    use tempfile::{tempdir, TempDir};

    fn ledger() -> (TempDir, SqliteLedger) {
        let dir = tempdir().unwrap();
        let ledger = SqliteLedger::new(dir.path().join("ibor.db")).unwrap();
        (dir, ledger)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_trade(settle_date: NaiveDate) -> Trade {
        Trade {
            trade_id: TradeId::new(),
            isin: Isin::parse("US0378331005").unwrap(),
            quantity: 100,
            price: dec!(175.50),
            side: Side::Buy,
            trade_date: date(2024, 1, 5),
            settle_date,
            status: TradeStatus::New,
            portfolio_id: PortfolioId::default(),
            version: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn trade_round_trips_and_rejects_duplicates() {
        let (_dir, ledger) = ledger();
        let trade = sample_trade(date(2024, 1, 9));
        let first = ledger.write(|s| s.insert_trade(&trade)).unwrap();
        let second = ledger.write(|s| s.insert_trade(&trade)).unwrap();
        assert!(first);
        assert!(!second);
        let stored = ledger.read(|s| s.trade(&trade.trade_id)).unwrap().unwrap();
        assert_eq!(stored.price, dec!(175.50));
        assert_eq!(stored.settle_date, date(2024, 1, 9));
        assert_eq!(stored.status, TradeStatus::New);
    }

    #[test]
    fn status_update_is_compare_and_set() {
        let (_dir, ledger) = ledger();
        let trade = sample_trade(date(2024, 1, 9));
        ledger.write(|s| s.insert_trade(&trade)).unwrap();
        let applied = ledger
            .write(|s| s.update_trade_status(&trade.trade_id, 0, TradeStatus::Settled))
            .unwrap();
        let stale = ledger
            .write(|s| s.update_trade_status(&trade.trade_id, 0, TradeStatus::Settled))
            .unwrap();
        assert!(applied);
        assert!(!stale);
        let stored = ledger.read(|s| s.trade(&trade.trade_id)).unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.status, TradeStatus::Settled);
    }

    #[test]
    fn due_trades_exclude_settled_markers() {
        let (_dir, ledger) = ledger();
        let due = sample_trade(date(2024, 1, 9));
        let settled = sample_trade(date(2024, 1, 9));
        let later = sample_trade(date(2024, 1, 10));
        ledger
            .write(|s| -> LedgerResult<()> {
                for trade in [&due, &settled, &later] {
                    s.insert_trade(trade)?;
                }
                s.insert_settlement_marker(&SettlementMarker {
                    trade_id: settled.trade_id,
                    settled_at: Utc::now(),
                })?;
                Ok(())
            })
            .unwrap();
        let pending = ledger.read(|s| s.unsettled_trades_due(date(2024, 1, 9))).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].trade_id, due.trade_id);
    }

    #[test]
    fn trade_query_filters_by_isin_and_limit() {
        let (_dir, ledger) = ledger();
        let mut other = sample_trade(date(2024, 1, 9));
        other.isin = Isin::parse("US5949181045").unwrap();
        ledger
            .write(|s| -> LedgerResult<()> {
                for _ in 0..3 {
                    s.insert_trade(&sample_trade(date(2024, 1, 9)))?;
                }
                s.insert_trade(&other)?;
                Ok(())
            })
            .unwrap();
        let apple = TradeQuery::default().with_isin(Isin::parse("US0378331005").unwrap());
        assert_eq!(ledger.read(|s| s.trades(&apple)).unwrap().len(), 3);
        let limited = TradeQuery::default().with_limit(2);
        assert_eq!(ledger.read(|s| s.trades(&limited)).unwrap().len(), 2);
        let none = TradeQuery::default().with_trade_date_range(Some(date(2024, 2, 1)), None);
        assert!(ledger.read(|s| s.trades(&none)).unwrap().is_empty());
    }

    #[test]
    fn processed_marker_is_claimed_once_and_position_accumulates() {
        let (_dir, ledger) = ledger();
        let isin = Isin::parse("US0378331005").unwrap();
        let marker = ProcessedTrade {
            trade_id: TradeId::new(),
            isin: isin.clone(),
            applied_delta: dec!(100),
            processed_at: Utc::now(),
        };
        assert!(ledger.write(|s| s.claim_processed_trade(&marker)).unwrap());
        assert!(!ledger.write(|s| s.claim_processed_trade(&marker)).unwrap());

        let first = ledger.write(|s| s.add_to_position(&isin, dec!(100), Utc::now())).unwrap();
        let second = ledger.write(|s| s.add_to_position(&isin, dec!(-40), Utc::now())).unwrap();
        assert_eq!(first, dec!(100));
        assert_eq!(second, dec!(60));
        let positions = ledger.read(|s| s.positions()).unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].quantity, dec!(60));
    }

    #[test]
    fn cash_is_unique_per_trade_and_sums_to_balance() {
        let (_dir, ledger) = ledger();
        let portfolio = PortfolioId::default();
        let trade_id = TradeId::new();
        let entry = NewCashEntry {
            portfolio_id: portfolio.clone(),
            delta: dec!(-17550.00),
            balance: None,
            currency: "USD".into(),
            reason: CashReason::Trade {
                side: Side::Buy,
                trade_id,
            },
            trade_id: Some(trade_id),
            created_at: Utc::now(),
        };
        let first = ledger.write(|s| s.append_cash(entry.clone())).unwrap();
        let second = ledger.write(|s| s.append_cash(entry.clone())).unwrap();
        assert!(first.is_some());
        assert!(second.is_none());

        let reset = NewCashEntry {
            delta: dec!(20000.00),
            balance: Some(dec!(20000.00)),
            reason: CashReason::ResetBalance,
            trade_id: None,
            ..entry
        };
        ledger.write(|s| s.append_cash(reset.clone())).unwrap();
        ledger.write(|s| s.append_cash(reset)).unwrap();

        let balance = ledger.read(|s| s.cash_balance(&portfolio)).unwrap();
        assert_eq!(balance, dec!(22450.00));
        let history = ledger.read(|s| s.cash_history(&portfolio, 10)).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].reason, CashReason::ResetBalance);
        let by_trade = ledger.read(|s| s.cash_entry_for_trade(&trade_id)).unwrap().unwrap();
        assert_eq!(by_trade.delta, dec!(-17550.00));
    }

    #[test]
    fn cash_marker_survives_history_reset() {
        let (_dir, ledger) = ledger();
        let portfolio = PortfolioId::default();
        let trade_id = TradeId::new();
        let claim = |s: &LedgerSession<'_>| {
            s.claim_trade_cash(&trade_id, &portfolio, dec!(-17550.00), Utc::now())
        };
        assert!(ledger.write(claim).unwrap());
        assert_eq!(ledger.write(|s| s.delete_cash_history(&portfolio)).unwrap(), 0);
        assert!(!ledger.write(claim).unwrap());
        let delete = ledger.write(|s| {
            s.conn().execute("DELETE FROM cash_applied_trades", [])?;
            Ok::<_, LedgerError>(())
        });
        assert!(delete.is_err());
    }

    #[test]
    fn journal_insert_is_unique_per_trade_and_type() {
        let (_dir, ledger) = ledger();
        let trade_id = TradeId::new();
        let first = build_journal(
            trade_id,
            JournalType::TradeDate,
            trade_date_lines(Side::Sell, dec!(4152)),
            Utc::now(),
        )
        .unwrap();
        let duplicate = build_journal(
            trade_id,
            JournalType::TradeDate,
            trade_date_lines(Side::Sell, dec!(1)),
            Utc::now(),
        )
        .unwrap();
        assert!(ledger.write(|s| s.insert_journal(&first)).unwrap());
        assert!(!ledger.write(|s| s.insert_journal(&duplicate)).unwrap());

        let stored = ledger
            .read(|s| s.journal(&trade_id, JournalType::TradeDate))
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.lines, first.lines);
        assert_eq!(ledger.read(|s| s.journals_for_trade(&trade_id)).unwrap().len(), 1);
        assert_eq!(ledger.read(|s| s.recent_journals(10)).unwrap().len(), 1);
    }

    #[test]
    fn journals_cannot_be_deleted() {
        let (_dir, ledger) = ledger();
        let journal = build_journal(
            TradeId::new(),
            JournalType::TradeDate,
            trade_date_lines(Side::Buy, dec!(10)),
            Utc::now(),
        )
        .unwrap();
        ledger.write(|s| s.insert_journal(&journal)).unwrap();
        let result: LedgerResult<usize> =
            ledger.write(|s| Ok(s.conn().execute("DELETE FROM journals", [])?));
        assert!(result.is_err());
    }

    #[test]
    fn nav_history_is_ordered_and_latest_wins() {
        let (_dir, ledger) = ledger();
        let portfolio = PortfolioId::default();
        let start = Utc::now();
        let snapshot = |offset: i64, net| NavSnapshot {
            id: uuid::Uuid::new_v4(),
            portfolio_id: PortfolioId::default(),
            calculation_date: start + chrono::Duration::seconds(offset),
            gross_value: net,
            fee_accrual: dec!(0),
            net_value: net,
            shares_outstanding: 1_000_000,
            nav_per_share: dec!(0.0185),
        };
        ledger
            .write(|s| -> LedgerResult<()> {
                s.insert_nav_snapshot(&snapshot(10, dec!(2)))?;
                s.insert_nav_snapshot(&snapshot(0, dec!(1)))?;
                Ok(())
            })
            .unwrap();
        let latest = ledger.read(|s| s.latest_nav(&portfolio)).unwrap().unwrap();
        assert_eq!(latest.net_value, dec!(2));
        let history = ledger
            .read(|s| s.nav_history(&portfolio, start, start + chrono::Duration::seconds(60)))
            .unwrap();
        let nets: Vec<_> = history.iter().map(|snap| snap.net_value).collect();
        assert_eq!(nets, vec![dec!(1), dec!(2)]);
    }
}
