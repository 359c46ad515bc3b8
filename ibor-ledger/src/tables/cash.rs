use chrono::{DateTime, Utc};
use ibor_core::money::CASH_SCALE;
use ibor_core::{CashEntry, CashReason, PortfolioId, TradeId};
use rusqlite::{params, OptionalExtension, Row};
use rust_decimal::Decimal;

use crate::codec::{
    decode, decode_fixed, decode_ts, encode_fixed, encode_ts, query_all, query_first,
};
use crate::{LedgerResult, LedgerSession};

const CASH_COLUMNS: &str =
    "id, portfolio_id, delta_cents, balance_cents, currency, reason, trade_id, created_at";

/// Cash row before the store assigns its id.
#[derive(Clone, Debug)]
pub struct NewCashEntry {
    pub portfolio_id: PortfolioId,
    pub delta: Decimal,
    pub balance: Option<Decimal>,
    pub currency: String,
    pub reason: CashReason,
    pub trade_id: Option<TradeId>,
    pub created_at: DateTime<Utc>,
}

impl NewCashEntry {
    fn into_entry(self, id: i64) -> CashEntry {
        CashEntry {
            id,
            portfolio_id: self.portfolio_id,
            delta: self.delta,
            balance: self.balance,
            currency: self.currency,
            reason: self.reason,
            trade_id: self.trade_id,
            created_at: self.created_at,
        }
    }
}

impl LedgerSession<'_> {
    /// Append a cash row.
    ///
    /// Rows tied to a trade are unique per trade id; a second append for the
    /// same trade inserts nothing and returns `None`.
    pub fn append_cash(&self, entry: NewCashEntry) -> LedgerResult<Option<CashEntry>> {
        let balance = entry
            .balance
            .map(|balance| encode_fixed(balance, CASH_SCALE, "cash balance"))
            .transpose()?;
        let id: Option<i64> = self
            .conn()
            .query_row(
                "INSERT INTO cash_ledger (
                    portfolio_id, delta_cents, balance_cents, currency, reason, trade_id, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(trade_id) WHERE trade_id IS NOT NULL DO NOTHING
                 RETURNING id",
                params![
                    entry.portfolio_id.as_str(),
                    encode_fixed(entry.delta, CASH_SCALE, "cash delta")?,
                    balance,
                    entry.currency,
                    entry.reason.to_string(),
                    entry.trade_id.map(|id| id.to_string()),
                    encode_ts(entry.created_at),
                ],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map(|id| entry.into_entry(id)))
    }

    /// Record that the cash leg of `trade_id` has been applied.
    ///
    /// The marker outlives cash resets, so a `false` return means the leg
    /// must not be appended again even when its cash row is gone.
    pub fn claim_trade_cash(
        &self,
        trade_id: &TradeId,
        portfolio: &PortfolioId,
        delta: Decimal,
        applied_at: DateTime<Utc>,
    ) -> LedgerResult<bool> {
        let inserted = self.conn().execute(
            "INSERT INTO cash_applied_trades (trade_id, portfolio_id, delta_cents, applied_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(trade_id) DO NOTHING",
            params![
                trade_id.to_string(),
                portfolio.as_str(),
                encode_fixed(delta, CASH_SCALE, "cash delta")?,
                encode_ts(applied_at),
            ],
        )?;
        Ok(inserted == 1)
    }

    pub fn cash_entry_for_trade(&self, trade_id: &TradeId) -> LedgerResult<Option<CashEntry>> {
        query_first(
            self.conn(),
            &format!("SELECT {CASH_COLUMNS} FROM cash_ledger WHERE trade_id = ?1"),
            [trade_id.to_string()],
            row_to_cash_entry,
        )
    }

    /// Sum of every delta for the portfolio; zero when it has no rows.
    pub fn cash_balance(&self, portfolio: &PortfolioId) -> LedgerResult<Decimal> {
        let cents: i64 = self.conn().query_row(
            "SELECT COALESCE(SUM(delta_cents), 0) FROM cash_ledger WHERE portfolio_id = ?1",
            [portfolio.as_str()],
            |row| row.get(0),
        )?;
        Ok(decode_fixed(cents, CASH_SCALE))
    }

    /// Most recent rows first.
    pub fn cash_history(
        &self,
        portfolio: &PortfolioId,
        limit: usize,
    ) -> LedgerResult<Vec<CashEntry>> {
        query_all(
            self.conn(),
            &format!(
                "SELECT {CASH_COLUMNS} FROM cash_ledger WHERE portfolio_id = ?1
                 ORDER BY created_at DESC, id DESC LIMIT ?2"
            ),
            params![portfolio.as_str(), limit as i64],
            row_to_cash_entry,
        )
    }

    /// Remove every row of the portfolio. Returns the number removed.
    ///
    /// Applied-trade markers are kept.
    pub fn delete_cash_history(&self, portfolio: &PortfolioId) -> LedgerResult<usize> {
        Ok(self
            .conn()
            .execute("DELETE FROM cash_ledger WHERE portfolio_id = ?1", [portfolio.as_str()])?)
    }
}

fn row_to_cash_entry(row: &Row<'_>) -> LedgerResult<CashEntry> {
    let id: i64 = row.get(0)?;
    let portfolio_id: String = row.get(1)?;
    let delta: i64 = row.get(2)?;
    let balance: Option<i64> = row.get(3)?;
    let currency: String = row.get(4)?;
    let reason: String = row.get(5)?;
    let trade_id: Option<String> = row.get(6)?;
    let created_at: String = row.get(7)?;
    Ok(CashEntry {
        id,
        portfolio_id: portfolio_id.into(),
        delta: decode_fixed(delta, CASH_SCALE),
        balance: balance.map(|raw| decode_fixed(raw, CASH_SCALE)),
        currency,
        reason: decode::<CashReason>(&reason, "cash reason")?,
        trade_id: trade_id
            .map(|raw| decode::<TradeId>(&raw, "trade id"))
            .transpose()?,
        created_at: decode_ts(&created_at)?,
    })
}
