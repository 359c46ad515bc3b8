use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::PortfolioId;

/// Immutable point-in-time valuation of a portfolio.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavSnapshot {
    pub id: Uuid,
    pub portfolio_id: PortfolioId,
    pub calculation_date: DateTime<Utc>,
    pub gross_value: Decimal,
    pub fee_accrual: Decimal,
    pub net_value: Decimal,
    pub shares_outstanding: u64,
    pub nav_per_share: Decimal,
}
