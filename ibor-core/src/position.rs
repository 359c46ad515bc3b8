use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Isin, TradeId};

/// Current net holding of one instrument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub isin: Isin,
    pub quantity: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Marker proving that a trade's position effect has been applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedTrade {
    pub trade_id: TradeId,
    pub isin: Isin,
    pub applied_delta: Decimal,
    pub processed_at: DateTime<Utc>,
}
