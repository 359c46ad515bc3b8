use chrono::{DateTime, Utc};
use ibor_core::money::NAV_SCALE;
use ibor_core::{NavSnapshot, PortfolioId};
use rusqlite::{params, Row};
use uuid::Uuid;

use crate::codec::{
    decode, decode_fixed, decode_ts, encode_fixed, encode_ts, query_all, query_first,
};
use crate::{LedgerError, LedgerResult, LedgerSession};

const NAV_COLUMNS: &str = "snapshot_id, portfolio_id, calculation_date, gross_value, fee_accrual, \
     net_value, shares_outstanding, nav_per_share";

impl LedgerSession<'_> {
    pub fn insert_nav_snapshot(&self, snapshot: &NavSnapshot) -> LedgerResult<()> {
        let shares = i64::try_from(snapshot.shares_outstanding).map_err(|_| {
            LedgerError::InvalidState(format!(
                "shares outstanding {} is out of range",
                snapshot.shares_outstanding
            ))
        })?;
        self.conn().execute(
            &format!(
                "INSERT INTO nav_snapshots ({NAV_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ),
            params![
                snapshot.id.to_string(),
                snapshot.portfolio_id.as_str(),
                encode_ts(snapshot.calculation_date),
                encode_fixed(snapshot.gross_value, NAV_SCALE, "gross value")?,
                encode_fixed(snapshot.fee_accrual, NAV_SCALE, "fee accrual")?,
                encode_fixed(snapshot.net_value, NAV_SCALE, "net value")?,
                shares,
                encode_fixed(snapshot.nav_per_share, NAV_SCALE, "nav per share")?,
            ],
        )?;
        Ok(())
    }

    pub fn latest_nav(&self, portfolio: &PortfolioId) -> LedgerResult<Option<NavSnapshot>> {
        query_first(
            self.conn(),
            &format!(
                "SELECT {NAV_COLUMNS} FROM nav_snapshots WHERE portfolio_id = ?1
                 ORDER BY calculation_date DESC, rowid DESC LIMIT 1"
            ),
            [portfolio.as_str()],
            row_to_snapshot,
        )
    }

    /// Snapshots calculated within `[start, end]`, oldest first.
    pub fn nav_history(
        &self,
        portfolio: &PortfolioId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> LedgerResult<Vec<NavSnapshot>> {
        query_all(
            self.conn(),
            &format!(
                "SELECT {NAV_COLUMNS} FROM nav_snapshots
                 WHERE portfolio_id = ?1 AND calculation_date >= ?2 AND calculation_date <= ?3
                 ORDER BY calculation_date ASC, rowid ASC"
            ),
            params![portfolio.as_str(), encode_ts(start), encode_ts(end)],
            row_to_snapshot,
        )
    }
}

fn row_to_snapshot(row: &Row<'_>) -> LedgerResult<NavSnapshot> {
    let id: String = row.get(0)?;
    let portfolio_id: String = row.get(1)?;
    let calculation_date: String = row.get(2)?;
    let gross: i64 = row.get(3)?;
    let fee: i64 = row.get(4)?;
    let net: i64 = row.get(5)?;
    let shares: i64 = row.get(6)?;
    let per_share: i64 = row.get(7)?;
    Ok(NavSnapshot {
        id: decode::<Uuid>(&id, "snapshot id")?,
        portfolio_id: portfolio_id.into(),
        calculation_date: decode_ts(&calculation_date)?,
        gross_value: decode_fixed(gross, NAV_SCALE),
        fee_accrual: decode_fixed(fee, NAV_SCALE),
        net_value: decode_fixed(net, NAV_SCALE),
        shares_outstanding: u64::try_from(shares).map_err(|_| {
            LedgerError::Serialization(format!("invalid shares outstanding {shares}"))
        })?,
        nav_per_share: decode_fixed(per_share, NAV_SCALE),
    })
}
