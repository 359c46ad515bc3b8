use std::sync::Arc;

use chrono::{DateTime, Utc};
use ibor_core::money::{self, NAV_SCALE};
use ibor_core::{Clock, NavSnapshot, PortfolioId, PriceOracle};
use ibor_events::{Event, NavCalculatedEvent};
use ibor_ledger::LedgerSession;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::store::UnitOfWork;
use crate::{IborError, IborResult};

const DAYS_PER_YEAR: u32 = 365;

/// Daily valuation of positions plus cash, net of the accrued management fee.
pub struct NavCalculator {
    clock: Arc<dyn Clock>,
    oracle: Arc<dyn PriceOracle>,
    fee_rate: Decimal,
    shares_outstanding: u64,
}

impl NavCalculator {
    pub fn new(
        clock: Arc<dyn Clock>,
        oracle: Arc<dyn PriceOracle>,
        fee_rate: Decimal,
        shares_outstanding: u64,
    ) -> Self {
        Self {
            clock,
            oracle,
            fee_rate,
            shares_outstanding,
        }
    }

    pub fn calculate(
        &self,
        uow: &mut UnitOfWork<'_, '_>,
        portfolio: &PortfolioId,
    ) -> IborResult<NavSnapshot> {
        if self.shares_outstanding == 0 {
            return Err(IborError::Config("nav.shares_outstanding must be positive".into()));
        }
        let session = uow.session();
        let mut positions_value = Decimal::ZERO;
        for position in session.positions()? {
            if position.quantity.is_zero() {
                continue;
            }
            let price = self
                .oracle
                .price(&position.isin)
                .ok_or_else(|| IborError::PriceUnavailable(position.isin.clone()))?;
            positions_value += position.quantity * price;
        }
        let cash = session.cash_balance(portfolio)?;

        let gross_value = money::round_half_up(positions_value + cash, NAV_SCALE);
        let fee_accrual = money::round_half_up(
            gross_value * self.fee_rate / Decimal::from(DAYS_PER_YEAR),
            NAV_SCALE,
        );
        let net_value = gross_value - fee_accrual;
        let nav_per_share = money::round_half_up(
            net_value / Decimal::from(self.shares_outstanding),
            NAV_SCALE,
        );
        let snapshot = NavSnapshot {
            id: Uuid::new_v4(),
            portfolio_id: portfolio.clone(),
            calculation_date: self.clock.now(),
            gross_value,
            fee_accrual,
            net_value,
            shares_outstanding: self.shares_outstanding,
            nav_per_share,
        };
        session.insert_nav_snapshot(&snapshot)?;

        info!(
            portfolio = %portfolio,
            gross = %gross_value,
            fee = %fee_accrual,
            net = %net_value,
            nav_per_share = %nav_per_share,
            "nav calculated"
        );
        uow.emit(Event::NavCalculated(NavCalculatedEvent {
            snapshot_id: snapshot.id,
            portfolio_id: portfolio.clone(),
            net_value,
            nav_per_share,
        }));
        Ok(snapshot)
    }

    pub fn latest(
        &self,
        session: &LedgerSession<'_>,
        portfolio: &PortfolioId,
    ) -> IborResult<Option<NavSnapshot>> {
        Ok(session.latest_nav(portfolio)?)
    }

    pub fn history(
        &self,
        session: &LedgerSession<'_>,
        portfolio: &PortfolioId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> IborResult<Vec<NavSnapshot>> {
        Ok(session.nav_history(portfolio, start, end)?)
    }
}
