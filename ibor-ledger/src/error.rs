use ibor_core::{JournalType, TradeId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Error type surfaced by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("invalid ledger state: {0}")]
    InvalidState(String),
    #[error(
        "unbalanced {journal_type} journal for trade {trade_id}: debit {debit} != credit {credit}"
    )]
    UnbalancedJournal {
        trade_id: TradeId,
        journal_type: JournalType,
        debit: Decimal,
        credit: Decimal,
    },
}

impl From<rusqlite::Error> for LedgerError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(value: std::io::Error) -> Self {
        Self::Storage(value.to_string())
    }
}
