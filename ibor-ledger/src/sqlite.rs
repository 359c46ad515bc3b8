use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, TransactionBehavior};
use tracing::debug;

use crate::schema::LEDGER_SCHEMA;
use crate::{LedgerError, LedgerResult};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed book of record.
///
/// Every call opens its own connection, so one `SqliteLedger` can be shared
/// freely across threads; concurrent writers are serialized by SQLite's
/// `BEGIN IMMEDIATE` locking and wait up to the busy timeout.
#[derive(Clone, Debug)]
pub struct SqliteLedger {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteLedger {
    pub fn new(path: impl Into<PathBuf>) -> LedgerResult<Self> {
        Self::with_busy_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn with_busy_timeout(
        path: impl Into<PathBuf>,
        busy_timeout: Duration,
    ) -> LedgerResult<Self> {
        let ledger = Self {
            path: path.into(),
            busy_timeout,
        };
        ledger.initialize_schema()?;
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn initialize_schema(&self) -> LedgerResult<()> {
        let conn = self.connect()?;
        conn.execute_batch(LEDGER_SCHEMA)?;
        debug!(path = %self.path.display(), "ledger schema ready");
        Ok(())
    }

    fn connect(&self) -> LedgerResult<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL; PRAGMA foreign_keys = ON;",
        )?;
        Ok(conn)
    }

    /// Run `work` as one all-or-nothing unit of work.
    ///
    /// The transaction is taken with `BEGIN IMMEDIATE` so the write lock is held
    /// from the first read, which closes check-then-insert races between
    /// concurrent callers. It commits only when `work` returns `Ok`; any error
    /// drops the transaction, which rolls it back.
    pub fn write<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&LedgerSession<'_>) -> Result<T, E>,
        E: From<LedgerError>,
    {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(LedgerError::from)?;
        let value = work(&LedgerSession::new(&tx))?;
        tx.commit().map_err(LedgerError::from)?;
        Ok(value)
    }

    /// Run read-only `work` against a fresh connection.
    pub fn read<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&LedgerSession<'_>) -> Result<T, E>,
        E: From<LedgerError>,
    {
        let conn = self.connect()?;
        work(&LedgerSession::new(&conn))
    }
}

/// Table accessors bound to one connection or open transaction.
pub struct LedgerSession<'c> {
    conn: &'c Connection,
}

impl<'c> LedgerSession<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub(crate) fn conn(&self) -> &'c Connection {
        self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_parent_directories_and_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("ibor.db");
        let ledger = SqliteLedger::new(&path).unwrap();
        assert!(path.exists());
        let tables: i64 = ledger
            .read(|session| -> LedgerResult<i64> {
                Ok(session.conn().query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
                        ('trades', 'positions', 'processed_trades', 'cash_ledger', 'journals',
                         'journal_lines', 'settlement_markers', 'nav_snapshots')",
                    [],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(tables, 8);
    }

    #[test]
    fn failed_work_rolls_back() {
        let dir = tempdir().unwrap();
        let ledger = SqliteLedger::new(dir.path().join("ibor.db")).unwrap();
        let result: LedgerResult<()> = ledger.write(|session| {
            session.conn().execute(
                "INSERT INTO positions (isin, quantity_micros, updated_at)
                 VALUES ('US0378331005', 1, 'now')",
                [],
            )?;
            Err(LedgerError::InvalidState("abort".into()))
        });
        assert!(result.is_err());
        let count: i64 = ledger
            .read(|session| -> LedgerResult<i64> {
                Ok(session
                    .conn()
                    .query_row("SELECT COUNT(*) FROM positions", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }
}
