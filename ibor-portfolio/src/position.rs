use std::sync::Arc;

use ibor_core::{Clock, Isin, Position, ProcessedTrade, Side, TradeId};
use ibor_events::{Event, PositionUpdatedEvent};
use ibor_ledger::LedgerSession;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::store::UnitOfWork;
use crate::{IborError, IborResult};

/// Per-instrument net holdings, moved exactly once per trade.
pub struct PositionLedger {
    clock: Arc<dyn Clock>,
    allow_short: bool,
}

impl PositionLedger {
    pub fn new(clock: Arc<dyn Clock>, allow_short: bool) -> Self {
        Self { clock, allow_short }
    }

    /// Apply the trade's delta. Returns `false` when it was applied before.
    ///
    /// The processed-trade marker is claimed before the position moves, so a
    /// duplicate never reaches the increment. A negative result fails the
    /// whole unit of work unless short positions are allowed.
    pub fn apply(
        &self,
        uow: &mut UnitOfWork<'_, '_>,
        trade_id: TradeId,
        isin: &Isin,
        side: Side,
        quantity: i64,
    ) -> IborResult<bool> {
        let now = self.clock.now();
        let delta = side.position_sign() * Decimal::from(quantity);
        let claimed = uow.session().claim_processed_trade(&ProcessedTrade {
            trade_id,
            isin: isin.clone(),
            applied_delta: delta,
            processed_at: now,
        })?;
        if !claimed {
            debug!(%trade_id, %isin, "position effect already applied");
            return Ok(false);
        }

        let quantity = uow.session().add_to_position(isin, delta, now)?;
        if quantity < Decimal::ZERO && !self.allow_short {
            return Err(IborError::NegativePosition {
                isin: isin.clone(),
                quantity,
            });
        }

        info!(%trade_id, %isin, %delta, %quantity, "position updated");
        uow.emit(Event::PositionUpdated(PositionUpdatedEvent {
            trade_id,
            isin: isin.clone(),
            delta,
            quantity,
            updated_at: now,
        }));
        Ok(true)
    }

    pub fn positions(&self, session: &LedgerSession<'_>) -> IborResult<Vec<Position>> {
        Ok(session.positions()?)
    }
}
