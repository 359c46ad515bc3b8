use ibor_core::money::{self, JOURNAL_SCALE};
use ibor_core::{Isin, JournalType, TradeId, ValidationError};
use ibor_ledger::LedgerError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Result alias for book-of-record operations.
pub type IborResult<T> = Result<T, IborError>;

/// Error type surfaced by the book-of-record components.
#[derive(Debug, Error)]
pub enum IborError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Ledger(LedgerError),
    #[error("position in {isin} would become negative ({quantity})")]
    NegativePosition { isin: Isin, quantity: Decimal },
    #[error(
        "unbalanced {journal_type} journal for trade {trade_id}: debit {debit} != credit {credit}"
    )]
    UnbalancedJournal {
        trade_id: TradeId,
        journal_type: JournalType,
        debit: Decimal,
        credit: Decimal,
    },
    #[error("trade {0} has no trade-date journal to settle against")]
    MissingTradeDateJournal(TradeId),
    #[error("trade {0} carries a settlement marker but no settlement-date journal")]
    SettlementInconsistency(TradeId),
    #[error("no price available for {0}")]
    PriceUnavailable(Isin),
    #[error("{0} not found")]
    NotFound(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl IborError {
    /// Defensive failures that indicate a bug or corrupted state and must raise an alert.
    pub fn is_alert(&self) -> bool {
        matches!(
            self,
            IborError::UnbalancedJournal { .. } | IborError::SettlementInconsistency(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            IborError::Validation(_) => "validation",
            IborError::Ledger(_) => "ledger",
            IborError::NegativePosition { .. } => "negative_position",
            IborError::UnbalancedJournal { .. } => "unbalanced_journal",
            IborError::MissingTradeDateJournal(_) => "missing_trade_date_journal",
            IborError::SettlementInconsistency(_) => "settlement_inconsistency",
            IborError::PriceUnavailable(_) => "price_unavailable",
            IborError::NotFound(_) => "not_found",
            IborError::Config(_) => "config",
        }
    }

    pub(crate) fn validation(field: &str, message: impl Into<String>) -> Self {
        IborError::Validation(ValidationError::new(field, message))
    }
}

/// `quantity * price`, rejected on `price` when it cannot be carried or stored.
pub(crate) fn notional(quantity: i64, price: Decimal) -> IborResult<Decimal> {
    money::notional(quantity, price)
        .filter(|amount| money::to_fixed(*amount, JOURNAL_SCALE).is_some())
        .ok_or_else(|| IborError::validation("price", "notional out of range"))
}

impl From<LedgerError> for IborError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::UnbalancedJournal {
                trade_id,
                journal_type,
                debit,
                credit,
            } => IborError::UnbalancedJournal {
                trade_id,
                journal_type,
                debit,
                credit,
            },
            other => IborError::Ledger(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn unbalanced_ledger_error_becomes_alerting_variant() {
        let err: IborError = LedgerError::UnbalancedJournal {
            trade_id: TradeId::new(),
            journal_type: JournalType::TradeDate,
            debit: dec!(1),
            credit: dec!(2),
        }
        .into();
        assert!(err.is_alert());
        assert_eq!(err.kind(), "unbalanced_journal");
    }

    #[test]
    fn business_errors_do_not_alert() {
        let err = IborError::validation("quantity", "must be positive");
        assert!(!err.is_alert());
        assert_eq!(err.to_string(), "validation failed: quantity: must be positive");
        assert!(!IborError::MissingTradeDateJournal(TradeId::new()).is_alert());
    }
}
