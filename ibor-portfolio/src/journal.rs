use std::sync::Arc;

use ibor_core::{Clock, Isin, Journal, JournalType, SettlementMarker, Side, TradeId};
use ibor_events::{Event, JournalPostedEvent};
use ibor_ledger::{
    build_journal, infer_side, settlement_lines, trade_date_lines, LedgerError, LedgerSession,
};
use rust_decimal::Decimal;
use tracing::{debug, error, info};

use crate::error::notional;
use crate::store::UnitOfWork;
use crate::{IborError, IborResult};

/// Builds, checks and stores the two journals of each trade.
pub struct JournalEngine {
    clock: Arc<dyn Clock>,
}

impl JournalEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Post the trade-date journal, or return the one posted earlier.
    pub fn create_trade_date_journal(
        &self,
        uow: &mut UnitOfWork<'_, '_>,
        trade_id: TradeId,
        isin: &Isin,
        quantity: i64,
        price: Decimal,
        side: Side,
    ) -> IborResult<Journal> {
        if let Some(existing) = uow.session().journal(&trade_id, JournalType::TradeDate)? {
            debug!(%trade_id, "trade-date journal already posted");
            return Ok(existing);
        }
        let amount = notional(quantity, price)?;
        let journal = build_journal(
            trade_id,
            JournalType::TradeDate,
            trade_date_lines(side, amount),
            self.clock.now(),
        )?;
        debug!(%trade_id, %isin, %side, %amount, "posting trade-date journal");
        self.post(uow, journal)
    }

    /// Post the settlement-date journal together with its marker.
    ///
    /// A marker without its journal is reported as an inconsistency and left
    /// for an operator to repair.
    pub fn create_settlement_date_journal(
        &self,
        uow: &mut UnitOfWork<'_, '_>,
        trade_id: TradeId,
    ) -> IborResult<Journal> {
        let session = uow.session();
        if session.settlement_marker(&trade_id)?.is_some() {
            return match session.journal(&trade_id, JournalType::SettlementDate)? {
                Some(existing) => Ok(existing),
                None => {
                    error!(%trade_id, repair = true, "settlement marker without journal");
                    Err(IborError::SettlementInconsistency(trade_id))
                }
            };
        }

        let trade_date = session
            .journal(&trade_id, JournalType::TradeDate)?
            .ok_or(IborError::MissingTradeDateJournal(trade_id))?;
        let (side, amount) = infer_side(&trade_date).ok_or_else(|| {
            IborError::Ledger(LedgerError::InvalidState(format!(
                "trade-date journal {} for trade {trade_id} has no receivable leg",
                trade_date.id
            )))
        })?;
        let now = self.clock.now();
        let journal = build_journal(
            trade_id,
            JournalType::SettlementDate,
            settlement_lines(side, amount),
            now,
        )?;
        let journal = self.post(uow, journal)?;
        uow.session().insert_settlement_marker(&SettlementMarker {
            trade_id,
            settled_at: now,
        })?;
        Ok(journal)
    }

    pub fn journals_for_trade(
        &self,
        session: &LedgerSession<'_>,
        trade_id: &TradeId,
    ) -> IborResult<Vec<Journal>> {
        Ok(session.journals_for_trade(trade_id)?)
    }

    pub fn recent_journals(
        &self,
        session: &LedgerSession<'_>,
        limit: usize,
    ) -> IborResult<Vec<Journal>> {
        Ok(session.recent_journals(limit)?)
    }

    /// Store `journal`; if one of its type already exists, return that one instead.
    fn post(&self, uow: &mut UnitOfWork<'_, '_>, journal: Journal) -> IborResult<Journal> {
        if !uow.session().insert_journal(&journal)? {
            return uow
                .session()
                .journal(&journal.trade_id, journal.journal_type)?
                .ok_or_else(|| {
                    IborError::NotFound(format!(
                        "{} journal for trade {}",
                        journal.journal_type, journal.trade_id
                    ))
                });
        }
        info!(
            trade_id = %journal.trade_id,
            journal_type = %journal.journal_type,
            amount = %journal.total_debit(),
            "journal posted"
        );
        uow.emit(Event::JournalPosted(JournalPostedEvent {
            journal_id: journal.id,
            trade_id: journal.trade_id,
            journal_type: journal.journal_type,
            amount: journal.total_debit(),
        }));
        Ok(journal)
    }
}
