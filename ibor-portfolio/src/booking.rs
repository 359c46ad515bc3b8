use std::sync::Arc;

use ibor_core::calendar;
use ibor_core::money::PRICE_SCALE;
use ibor_core::{
    BookingReceipt, Clock, Isin, PortfolioId, Trade, TradeId, TradeRequest, TradeStatus,
};
use ibor_events::{Event, TradeBookedEvent};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::cash::CashLedger;
use crate::error::notional;
use crate::journal::JournalEngine;
use crate::position::PositionLedger;
use crate::store::UnitOfWork;
use crate::{IborError, IborResult};

/// Validates trades and applies position, cash and trade-date journal as one unit.
pub struct TradeBookingEngine {
    clock: Arc<dyn Clock>,
    default_portfolio: PortfolioId,
}

impl TradeBookingEngine {
    pub fn new(clock: Arc<dyn Clock>, default_portfolio: PortfolioId) -> Self {
        Self {
            clock,
            default_portfolio,
        }
    }

    /// Book `request`. A trade id seen before is answered from storage with no side effects.
    pub fn book(
        &self,
        uow: &mut UnitOfWork<'_, '_>,
        request: TradeRequest,
        positions: &PositionLedger,
        cash: &CashLedger,
        journals: &JournalEngine,
    ) -> IborResult<BookingReceipt> {
        let trade_id = request.trade_id.unwrap_or_default();
        if let Some(existing) = uow.session().trade(&trade_id)? {
            debug!(%trade_id, "duplicate trade submission");
            return Ok(idempotent_hit(&existing));
        }

        let trade = self.validate(trade_id, request)?;
        if !uow.session().insert_trade(&trade)? {
            let existing = uow
                .session()
                .trade(&trade_id)?
                .ok_or_else(|| IborError::NotFound(format!("trade {trade_id}")))?;
            return Ok(idempotent_hit(&existing));
        }

        positions.apply(uow, trade.trade_id, &trade.isin, trade.side, trade.quantity)?;
        cash.record(
            uow,
            trade.trade_id,
            trade.side,
            trade.quantity,
            trade.price,
            &trade.portfolio_id,
        )?;
        journals.create_trade_date_journal(
            uow,
            trade.trade_id,
            &trade.isin,
            trade.quantity,
            trade.price,
            trade.side,
        )?;

        info!(
            trade_id = %trade.trade_id,
            isin = %trade.isin,
            side = %trade.side,
            quantity = trade.quantity,
            price = %trade.price,
            settle_date = %trade.settle_date,
            "trade booked"
        );
        uow.emit(Event::TradeBooked(TradeBookedEvent {
            trade_id: trade.trade_id,
            isin: trade.isin.clone(),
            side: trade.side,
            quantity: trade.quantity,
            price: trade.price,
            portfolio_id: trade.portfolio_id.clone(),
        }));
        Ok(BookingReceipt {
            trade_id: trade.trade_id,
            status: trade.status,
            idempotent_hit: false,
        })
    }

    /// Check every field rule and resolve defaults into a storable trade.
    pub fn validate(&self, trade_id: TradeId, request: TradeRequest) -> IborResult<Trade> {
        let isin = Isin::parse(request.isin)?;
        if request.quantity <= 0 {
            return Err(IborError::validation("quantity", "must be greater than zero"));
        }
        if request.price <= Decimal::ZERO {
            return Err(IborError::validation("price", "must be greater than zero"));
        }
        if request.price.normalize().scale() > PRICE_SCALE {
            return Err(IborError::validation("price", "must have at most 2 decimal places"));
        }
        notional(request.quantity, request.price)?;
        let now = self.clock.now();
        if request.trade_date > now.date_naive() {
            return Err(IborError::validation("tradeDate", "must not be in the future"));
        }
        let settle_date = match request.settle_date {
            Some(settle_date) if settle_date < request.trade_date => {
                return Err(IborError::validation(
                    "settleDate",
                    "must not precede the trade date",
                ));
            }
            Some(settle_date) => settle_date,
            None => calendar::settlement_date(request.trade_date),
        };
        let portfolio_id = match request.portfolio_id {
            Some(portfolio) if portfolio.as_str().trim().is_empty() => {
                return Err(IborError::validation("portfolioId", "must not be blank"));
            }
            Some(portfolio) => portfolio,
            None => self.default_portfolio.clone(),
        };

        Ok(Trade {
            trade_id,
            isin,
            quantity: request.quantity,
            price: request.price,
            side: request.side,
            trade_date: request.trade_date,
            settle_date,
            status: TradeStatus::New,
            portfolio_id,
            version: 0,
            created_at: now,
        })
    }
}

fn idempotent_hit(trade: &Trade) -> BookingReceipt {
    BookingReceipt {
        trade_id: trade.trade_id,
        status: trade.status,
        idempotent_hit: true,
    }
}
