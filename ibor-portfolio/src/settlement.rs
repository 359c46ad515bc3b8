use chrono::NaiveDate;
use ibor_core::{Trade, TradeStatus};
use ibor_ledger::LedgerError;
use tracing::{debug, info, warn};

use crate::journal::JournalEngine;
use crate::store::{Store, UnitOfWork};
use crate::{IborError, IborResult};

/// Batch driver posting settlement-date journals for trades due on a date.
#[derive(Default)]
pub struct SettlementProcessor;

impl SettlementProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Settle every unmarked trade due on `date`, one unit of work per trade.
    ///
    /// A failing trade is logged and skipped; the rest of the batch proceeds.
    /// Returns how many trades this call settled.
    pub fn process(
        &self,
        store: &Store,
        journals: &JournalEngine,
        date: NaiveDate,
    ) -> IborResult<usize> {
        let candidates = store.read(|session| Ok(session.unsettled_trades_due(date)?))?;
        let total = candidates.len();
        let mut settled = 0;
        for trade in candidates {
            let trade_id = trade.trade_id;
            match store.transact(|uow| self.settle(uow, journals, &trade)) {
                Ok(true) => settled += 1,
                Ok(false) => debug!(%trade_id, "trade settled concurrently"),
                Err(err) => warn!(%trade_id, %date, error = %err, "settlement failed for trade"),
            }
        }
        info!(%date, candidates = total, settled, "settlement run finished");
        Ok(settled)
    }

    /// Settle one trade. Returns `false` if another run got there first.
    pub fn settle(
        &self,
        uow: &mut UnitOfWork<'_, '_>,
        journals: &JournalEngine,
        trade: &Trade,
    ) -> IborResult<bool> {
        let already_marked = uow.session().settlement_marker(&trade.trade_id)?.is_some();
        journals.create_settlement_date_journal(uow, trade.trade_id)?;
        if already_marked {
            return Ok(false);
        }
        if trade.status != TradeStatus::Settled {
            let updated = uow.session().update_trade_status(
                &trade.trade_id,
                trade.version,
                TradeStatus::Settled,
            )?;
            if !updated {
                return Err(IborError::Ledger(LedgerError::InvalidState(format!(
                    "trade {} changed while settling (expected version {})",
                    trade.trade_id, trade.version
                ))));
            }
        }
        Ok(true)
    }
}
