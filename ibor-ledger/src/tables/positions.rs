use chrono::{DateTime, Utc};
use ibor_core::money::QUANTITY_SCALE;
use ibor_core::{Isin, Position, ProcessedTrade};
use rusqlite::{params, Row};
use rust_decimal::Decimal;

use crate::codec::{decode, decode_fixed, decode_ts, encode_fixed, encode_ts, query_all};
use crate::{LedgerResult, LedgerSession};

impl LedgerSession<'_> {
    /// Record that `marker.trade_id` has moved its position.
    ///
    /// Returns `false` when a marker already exists, in which case the caller
    /// must not apply the delta again.
    pub fn claim_processed_trade(&self, marker: &ProcessedTrade) -> LedgerResult<bool> {
        let inserted = self.conn().execute(
            "INSERT INTO processed_trades (trade_id, isin, applied_delta_micros, processed_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(trade_id) DO NOTHING",
            params![
                marker.trade_id.to_string(),
                marker.isin.as_str(),
                encode_fixed(marker.applied_delta, QUANTITY_SCALE, "position delta")?,
                encode_ts(marker.processed_at),
            ],
        )?;
        Ok(inserted == 1)
    }

    /// Atomically add `delta` to the holding of `isin` and return the new quantity.
    pub fn add_to_position(
        &self,
        isin: &Isin,
        delta: Decimal,
        updated_at: DateTime<Utc>,
    ) -> LedgerResult<Decimal> {
        let quantity: i64 = self.conn().query_row(
            "INSERT INTO positions (isin, quantity_micros, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(isin) DO UPDATE SET
                quantity_micros = positions.quantity_micros + excluded.quantity_micros,
                updated_at = excluded.updated_at
             RETURNING quantity_micros",
            params![
                isin.as_str(),
                encode_fixed(delta, QUANTITY_SCALE, "position delta")?,
                encode_ts(updated_at),
            ],
            |row| row.get(0),
        )?;
        Ok(decode_fixed(quantity, QUANTITY_SCALE))
    }

    pub fn positions(&self) -> LedgerResult<Vec<Position>> {
        query_all(
            self.conn(),
            "SELECT isin, quantity_micros, updated_at FROM positions ORDER BY isin",
            [],
            row_to_position,
        )
    }
}

fn row_to_position(row: &Row<'_>) -> LedgerResult<Position> {
    let isin: String = row.get(0)?;
    let quantity: i64 = row.get(1)?;
    let updated_at: String = row.get(2)?;
    Ok(Position {
        isin: decode(&isin, "isin")?,
        quantity: decode_fixed(quantity, QUANTITY_SCALE),
        updated_at: decode_ts(&updated_at)?,
    })
}
