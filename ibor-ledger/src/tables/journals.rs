use ibor_core::money::JOURNAL_SCALE;
use ibor_core::{Account, Journal, JournalLine, JournalType, SettlementMarker, TradeId};
use rusqlite::{params, Row};
use uuid::Uuid;

use crate::codec::{
    decode, decode_fixed, decode_ts, encode_fixed, encode_ts, query_all, query_first,
};
use crate::{LedgerResult, LedgerSession};

impl LedgerSession<'_> {
    /// Insert a journal and its lines.
    ///
    /// Returns `false` without writing anything when a journal of the same
    /// type already exists for the trade.
    pub fn insert_journal(&self, journal: &Journal) -> LedgerResult<bool> {
        let journal_id = journal.id.to_string();
        let inserted = self.conn().execute(
            "INSERT INTO journals (journal_id, trade_id, journal_type, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(trade_id, journal_type) DO NOTHING",
            params![
                journal_id,
                journal.trade_id.to_string(),
                journal.journal_type.as_str(),
                encode_ts(journal.created_at),
            ],
        )?;
        if inserted == 0 {
            return Ok(false);
        }
        let mut stmt = self.conn().prepare_cached(
            "INSERT INTO journal_lines (journal_id, line_no, account, debit, credit)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for (line_no, line) in journal.lines.iter().enumerate() {
            stmt.execute(params![
                journal_id,
                line_no as i64,
                line.account.as_str(),
                encode_fixed(line.debit, JOURNAL_SCALE, "journal debit")?,
                encode_fixed(line.credit, JOURNAL_SCALE, "journal credit")?,
            ])?;
        }
        Ok(true)
    }

    pub fn journal(
        &self,
        trade_id: &TradeId,
        journal_type: JournalType,
    ) -> LedgerResult<Option<Journal>> {
        let header = query_first(
            self.conn(),
            "SELECT journal_id, trade_id, journal_type, created_at FROM journals
             WHERE trade_id = ?1 AND journal_type = ?2",
            params![trade_id.to_string(), journal_type.as_str()],
            row_to_header,
        )?;
        header.map(|header| self.with_lines(header)).transpose()
    }

    /// Every journal of the trade, newest first.
    pub fn journals_for_trade(&self, trade_id: &TradeId) -> LedgerResult<Vec<Journal>> {
        let headers = query_all(
            self.conn(),
            "SELECT journal_id, trade_id, journal_type, created_at FROM journals
             WHERE trade_id = ?1 ORDER BY created_at DESC, rowid DESC",
            [trade_id.to_string()],
            row_to_header,
        )?;
        headers.into_iter().map(|header| self.with_lines(header)).collect()
    }

    pub fn recent_journals(&self, limit: usize) -> LedgerResult<Vec<Journal>> {
        let headers = query_all(
            self.conn(),
            "SELECT journal_id, trade_id, journal_type, created_at FROM journals
             ORDER BY created_at DESC, rowid DESC LIMIT ?1",
            [limit as i64],
            row_to_header,
        )?;
        headers.into_iter().map(|header| self.with_lines(header)).collect()
    }

    pub fn settlement_marker(&self, trade_id: &TradeId) -> LedgerResult<Option<SettlementMarker>> {
        query_first(
            self.conn(),
            "SELECT trade_id, settled_at FROM settlement_markers WHERE trade_id = ?1",
            [trade_id.to_string()],
            |row| {
                let trade_id: String = row.get(0)?;
                let settled_at: String = row.get(1)?;
                Ok(SettlementMarker {
                    trade_id: decode(&trade_id, "trade id")?,
                    settled_at: decode_ts(&settled_at)?,
                })
            },
        )
    }

    /// Returns `false` when the trade already carries a marker.
    pub fn insert_settlement_marker(&self, marker: &SettlementMarker) -> LedgerResult<bool> {
        let inserted = self.conn().execute(
            "INSERT INTO settlement_markers (trade_id, settled_at) VALUES (?1, ?2)
             ON CONFLICT(trade_id) DO NOTHING",
            params![marker.trade_id.to_string(), encode_ts(marker.settled_at)],
        )?;
        Ok(inserted == 1)
    }

    fn with_lines(&self, mut journal: Journal) -> LedgerResult<Journal> {
        journal.lines = query_all(
            self.conn(),
            "SELECT account, debit, credit FROM journal_lines
             WHERE journal_id = ?1 ORDER BY line_no",
            [journal.id.to_string()],
            |row| {
                let account: String = row.get(0)?;
                let debit: i64 = row.get(1)?;
                let credit: i64 = row.get(2)?;
                Ok(JournalLine {
                    account: decode::<Account>(&account, "account")?,
                    debit: decode_fixed(debit, JOURNAL_SCALE),
                    credit: decode_fixed(credit, JOURNAL_SCALE),
                })
            },
        )?;
        Ok(journal)
    }
}

fn row_to_header(row: &Row<'_>) -> LedgerResult<Journal> {
    let journal_id: String = row.get(0)?;
    let trade_id: String = row.get(1)?;
    let journal_type: String = row.get(2)?;
    let created_at: String = row.get(3)?;
    Ok(Journal {
        id: decode::<Uuid>(&journal_id, "journal id")?,
        trade_id: decode(&trade_id, "trade id")?,
        journal_type: decode::<JournalType>(&journal_type, "journal type")?,
        created_at: decode_ts(&created_at)?,
        lines: Vec::new(),
    })
}
