use std::sync::Arc;

use ibor_core::money::{self, CASH_SCALE};
use ibor_core::{
    CashBalance, CashEntry, CashReason, CashResetOutcome, Clock, PortfolioId, Side, TradeId,
};
use ibor_events::{CashMovementEvent, Event};
use ibor_ledger::{LedgerError, LedgerSession, NewCashEntry};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::notional;
use crate::store::UnitOfWork;
use crate::{IborError, IborResult};

/// Append-only cash movements; balances are derived by summing deltas.
pub struct CashLedger {
    clock: Arc<dyn Clock>,
    currency: String,
}

impl CashLedger {
    pub fn new(clock: Arc<dyn Clock>, currency: impl Into<String>) -> Self {
        Self {
            clock,
            currency: currency.into(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Record the cash leg of a trade once per trade id.
    ///
    /// Returns the row recorded earlier on a repeat, or `None` when that row
    /// has since been erased by a reset.
    pub fn record(
        &self,
        uow: &mut UnitOfWork<'_, '_>,
        trade_id: TradeId,
        side: Side,
        quantity: i64,
        price: Decimal,
        portfolio: &PortfolioId,
    ) -> IborResult<Option<CashEntry>> {
        let delta = money::round_half_up(side.cash_sign() * notional(quantity, price)?, CASH_SCALE);
        let now = self.clock.now();
        if !uow.session().claim_trade_cash(&trade_id, portfolio, delta, now)? {
            debug!(%trade_id, "cash already recorded");
            return Ok(uow.session().cash_entry_for_trade(&trade_id)?);
        }
        let entry = NewCashEntry {
            portfolio_id: portfolio.clone(),
            delta,
            balance: None,
            currency: self.currency.clone(),
            reason: CashReason::Trade { side, trade_id },
            trade_id: Some(trade_id),
            created_at: now,
        };
        let recorded = uow.session().append_cash(entry)?.ok_or_else(|| {
            IborError::Ledger(LedgerError::InvalidState(format!(
                "cash row for trade {trade_id} exists without its marker"
            )))
        })?;
        info!(%trade_id, portfolio = %portfolio, %delta, "cash recorded");
        uow.emit(movement(&recorded));
        Ok(Some(recorded))
    }

    pub fn balance(
        &self,
        session: &LedgerSession<'_>,
        portfolio: &PortfolioId,
    ) -> IborResult<CashBalance> {
        let balance = session.cash_balance(portfolio)?;
        Ok(CashBalance {
            portfolio_id: portfolio.clone(),
            balance: money::round_half_up(balance, CASH_SCALE),
            currency: self.currency.clone(),
        })
    }

    pub fn history(
        &self,
        session: &LedgerSession<'_>,
        portfolio: &PortfolioId,
        limit: usize,
    ) -> IborResult<Vec<CashEntry>> {
        Ok(session.cash_history(portfolio, limit)?)
    }

    /// Replace the portfolio's entire history with one seeded balance row.
    ///
    /// Destroys the audit trail; callers must name the operator.
    pub fn reset(
        &self,
        uow: &mut UnitOfWork<'_, '_>,
        portfolio: &PortfolioId,
        target: Decimal,
        operator: &str,
    ) -> IborResult<CashResetOutcome> {
        let operator = operator.trim();
        if operator.is_empty() {
            return Err(IborError::validation("operator", "is required for a cash reset"));
        }
        if target.normalize().scale() > CASH_SCALE {
            return Err(IborError::validation("amount", "must have at most 2 decimal places"));
        }
        let target = money::round_half_up(target, CASH_SCALE);
        let entries_cleared = uow.session().delete_cash_history(portfolio)?;
        let entry = NewCashEntry {
            portfolio_id: portfolio.clone(),
            delta: target,
            balance: Some(target),
            currency: self.currency.clone(),
            reason: CashReason::ResetBalance,
            trade_id: None,
            created_at: self.clock.now(),
        };
        let recorded = uow
            .session()
            .append_cash(entry)?
            .ok_or_else(|| IborError::NotFound(format!("reset entry for portfolio {portfolio}")))?;
        warn!(
            operator,
            portfolio = %portfolio,
            entries_cleared,
            balance = %target,
            "cash history reset"
        );
        uow.emit(movement(&recorded));
        Ok(CashResetOutcome {
            portfolio_id: portfolio.clone(),
            entries_cleared,
            balance: target,
            currency: self.currency.clone(),
        })
    }
}

fn movement(entry: &CashEntry) -> Event {
    Event::CashMovement(CashMovementEvent {
        trade_id: entry.trade_id,
        portfolio_id: entry.portfolio_id.clone(),
        delta: entry.delta,
        reason: entry.reason.to_string(),
        created_at: entry.created_at,
    })
}
