//! Double-entry posting rules for trade-date and settlement-date journals.

use chrono::{DateTime, Utc};
use ibor_core::money::{self, JOURNAL_SCALE};
use ibor_core::{Account, Journal, JournalLine, JournalType, Side, TradeId};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{LedgerError, LedgerResult};

/// Lines recognising the trade on trade date.
pub fn trade_date_lines(side: Side, amount: Decimal) -> Vec<JournalLine> {
    let amount = money::round_half_up(amount, JOURNAL_SCALE);
    match side {
        Side::Buy => vec![
            JournalLine::debit(Account::SecuritiesReceivable, amount),
            JournalLine::credit(Account::CashPayable, amount),
        ],
        Side::Sell => vec![
            JournalLine::debit(Account::CashReceivable, amount),
            JournalLine::credit(Account::SecuritiesPayable, amount),
        ],
    }
}

/// Lines clearing the receivable and payable legs on settlement date.
pub fn settlement_lines(side: Side, amount: Decimal) -> Vec<JournalLine> {
    let amount = money::round_half_up(amount, JOURNAL_SCALE);
    match side {
        Side::Buy => vec![
            JournalLine::debit(Account::Securities, amount),
            JournalLine::credit(Account::SecuritiesReceivable, amount),
            JournalLine::debit(Account::CashPayable, amount),
            JournalLine::credit(Account::Cash, amount),
        ],
        Side::Sell => vec![
            JournalLine::debit(Account::SecuritiesPayable, amount),
            JournalLine::credit(Account::Securities, amount),
            JournalLine::debit(Account::Cash, amount),
            JournalLine::credit(Account::CashReceivable, amount),
        ],
    }
}

/// Recover side and amount from a trade-date journal via its receivable debit.
pub fn infer_side(trade_date: &Journal) -> Option<(Side, Decimal)> {
    if let Some(amount) = trade_date.debit_on(Account::SecuritiesReceivable) {
        return Some((Side::Buy, amount));
    }
    trade_date
        .debit_on(Account::CashReceivable)
        .map(|amount| (Side::Sell, amount))
}

/// Assemble a journal and verify it before it is handed to storage.
pub fn build_journal(
    trade_id: TradeId,
    journal_type: JournalType,
    lines: Vec<JournalLine>,
    created_at: DateTime<Utc>,
) -> LedgerResult<Journal> {
    let journal = Journal {
        id: Uuid::new_v4(),
        trade_id,
        journal_type,
        created_at,
        lines,
    };
    ensure_balanced(&journal)?;
    Ok(journal)
}

/// Reject journals whose lines are malformed or whose debits and credits differ.
pub fn ensure_balanced(journal: &Journal) -> LedgerResult<()> {
    if journal.lines.is_empty() {
        return Err(LedgerError::InvalidState(format!(
            "{} journal for trade {} has no lines",
            journal.journal_type, journal.trade_id
        )));
    }
    if let Some(line) = journal.lines.iter().find(|line| !line.is_well_formed()) {
        return Err(LedgerError::InvalidState(format!(
            "malformed {} line on {} journal for trade {}",
            line.account, journal.journal_type, journal.trade_id
        )));
    }
    if !journal.is_balanced() {
        return Err(LedgerError::UnbalancedJournal {
            trade_id: journal.trade_id,
            journal_type: journal.journal_type,
            debit: journal.total_debit(),
            credit: journal.total_credit(),
        });
    }
    Ok(())
}
