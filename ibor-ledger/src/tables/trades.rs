use chrono::NaiveDate;
use ibor_core::money::PRICE_SCALE;
use ibor_core::{Side, Trade, TradeId, TradeStatus};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Row};

use crate::codec::{
    decode, decode_date, decode_fixed, decode_ts, encode_date, encode_fixed, encode_ts, query_all,
    query_first,
};
use crate::{LedgerResult, LedgerSession, TradeQuery};

const TRADE_COLUMNS: &str = "t.trade_id, t.isin, t.quantity, t.price_cents, t.side, t.trade_date, \
     t.settle_date, t.status, t.portfolio_id, t.version, t.created_at";

impl LedgerSession<'_> {
    /// Insert a new trade. Returns `false` when the trade id already exists.
    pub fn insert_trade(&self, trade: &Trade) -> LedgerResult<bool> {
        let inserted = self.conn().execute(
            "INSERT INTO trades (
                trade_id, isin, quantity, price_cents, side, trade_date, settle_date,
                status, portfolio_id, version, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(trade_id) DO NOTHING",
            params![
                trade.trade_id.to_string(),
                trade.isin.as_str(),
                trade.quantity,
                encode_fixed(trade.price, PRICE_SCALE, "price")?,
                trade.side.as_str(),
                encode_date(trade.trade_date),
                encode_date(trade.settle_date),
                trade.status.as_str(),
                trade.portfolio_id.as_str(),
                trade.version,
                encode_ts(trade.created_at),
            ],
        )?;
        Ok(inserted == 1)
    }

    pub fn trade(&self, trade_id: &TradeId) -> LedgerResult<Option<Trade>> {
        query_first(
            self.conn(),
            &format!("SELECT {TRADE_COLUMNS} FROM trades t WHERE t.trade_id = ?1"),
            [trade_id.to_string()],
            row_to_trade,
        )
    }

    pub fn trades(&self, query: &TradeQuery) -> LedgerResult<Vec<Trade>> {
        let sql = format!(
            "SELECT {TRADE_COLUMNS} FROM trades t
             WHERE (?1 IS NULL OR t.isin = ?1)
               AND (?2 IS NULL OR t.trade_date >= ?2)
               AND (?3 IS NULL OR t.trade_date <= ?3)
             ORDER BY t.created_at DESC, t.rowid DESC
             LIMIT ?4"
        );
        let params: Vec<Value> = vec![
            optional_text(query.isin.as_ref().map(|isin| isin.to_string())),
            optional_text(query.from_date.map(encode_date)),
            optional_text(query.to_date.map(encode_date)),
            Value::Integer(query.limit as i64),
        ];
        query_all(self.conn(), &sql, params_from_iter(params.iter()), row_to_trade)
    }

    /// Trades settling on `date` that carry no settlement marker yet.
    pub fn unsettled_trades_due(&self, date: NaiveDate) -> LedgerResult<Vec<Trade>> {
        query_all(
            self.conn(),
            &format!(
                "SELECT {TRADE_COLUMNS} FROM trades t
                 LEFT JOIN settlement_markers m ON m.trade_id = t.trade_id
                 WHERE t.settle_date = ?1 AND m.trade_id IS NULL
                 ORDER BY t.created_at ASC, t.rowid ASC"
            ),
            [encode_date(date)],
            row_to_trade,
        )
    }

    /// Compare-and-set the status. Returns `false` if `expected_version` is stale.
    pub fn update_trade_status(
        &self,
        trade_id: &TradeId,
        expected_version: i64,
        status: TradeStatus,
    ) -> LedgerResult<bool> {
        let updated = self.conn().execute(
            "UPDATE trades SET status = ?1, version = version + 1
             WHERE trade_id = ?2 AND version = ?3",
            params![status.as_str(), trade_id.to_string(), expected_version],
        )?;
        Ok(updated == 1)
    }

    /// Bulk delete of every trade row. Returns the number removed.
    pub fn clear_trades(&self) -> LedgerResult<usize> {
        Ok(self.conn().execute("DELETE FROM trades", [])?)
    }
}

fn optional_text(value: Option<String>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

fn row_to_trade(row: &Row<'_>) -> LedgerResult<Trade> {
    let trade_id: String = row.get(0)?;
    let isin: String = row.get(1)?;
    let quantity: i64 = row.get(2)?;
    let price_cents: i64 = row.get(3)?;
    let side: String = row.get(4)?;
    let trade_date: String = row.get(5)?;
    let settle_date: String = row.get(6)?;
    let status: String = row.get(7)?;
    let portfolio_id: String = row.get(8)?;
    let version: i64 = row.get(9)?;
    let created_at: String = row.get(10)?;

    Ok(Trade {
        trade_id: decode(&trade_id, "trade id")?,
        isin: decode(&isin, "isin")?,
        quantity,
        price: decode_fixed(price_cents, PRICE_SCALE),
        side: decode::<Side>(&side, "side")?,
        trade_date: decode_date(&trade_date)?,
        settle_date: decode_date(&settle_date)?,
        status: decode::<TradeStatus>(&status, "trade status")?,
        portfolio_id: portfolio_id.into(),
        version,
        created_at: decode_ts(&created_at)?,
    })
}
