use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TradeId;

/// Fixed account set used by trade-date and settlement-date journals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Account {
    Securities,
    SecuritiesReceivable,
    SecuritiesPayable,
    Cash,
    CashReceivable,
    CashPayable,
}

impl Account {
    pub fn as_str(self) -> &'static str {
        match self {
            Account::Securities => "SECURITIES",
            Account::SecuritiesReceivable => "SECURITIES_RECEIVABLE",
            Account::SecuritiesPayable => "SECURITIES_PAYABLE",
            Account::Cash => "CASH",
            Account::CashReceivable => "CASH_RECEIVABLE",
            Account::CashPayable => "CASH_PAYABLE",
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Account {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SECURITIES" => Ok(Account::Securities),
            "SECURITIES_RECEIVABLE" => Ok(Account::SecuritiesReceivable),
            "SECURITIES_PAYABLE" => Ok(Account::SecuritiesPayable),
            "CASH" => Ok(Account::Cash),
            "CASH_RECEIVABLE" => Ok(Account::CashReceivable),
            "CASH_PAYABLE" => Ok(Account::CashPayable),
            other => Err(format!("unknown account: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JournalType {
    TradeDate,
    SettlementDate,
}

impl JournalType {
    pub fn as_str(self) -> &'static str {
        match self {
            JournalType::TradeDate => "TRADE_DATE",
            JournalType::SettlementDate => "SETTLEMENT_DATE",
        }
    }
}

impl fmt::Display for JournalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JournalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TRADE_DATE" => Ok(JournalType::TradeDate),
            "SETTLEMENT_DATE" => Ok(JournalType::SettlementDate),
            other => Err(format!("unknown journal type: {other}")),
        }
    }
}

/// One side of a double-entry posting. Exactly one of `debit`/`credit` is non-zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JournalLine {
    pub account: Account,
    pub debit: Decimal,
    pub credit: Decimal,
}

impl JournalLine {
    pub fn debit(account: Account, amount: Decimal) -> Self {
        Self {
            account,
            debit: amount,
            credit: Decimal::ZERO,
        }
    }

    pub fn credit(account: Account, amount: Decimal) -> Self {
        Self {
            account,
            debit: Decimal::ZERO,
            credit: amount,
        }
    }

    /// True when the line carries exactly one non-negative, non-zero side.
    pub fn is_well_formed(&self) -> bool {
        self.debit >= Decimal::ZERO
            && self.credit >= Decimal::ZERO
            && (self.debit.is_zero() != self.credit.is_zero())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Journal {
    pub id: Uuid,
    pub trade_id: TradeId,
    pub journal_type: JournalType,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<JournalLine>,
}

impl Journal {
    pub fn total_debit(&self) -> Decimal {
        self.lines.iter().map(|line| line.debit).sum()
    }

    pub fn total_credit(&self) -> Decimal {
        self.lines.iter().map(|line| line.credit).sum()
    }

    pub fn is_balanced(&self) -> bool {
        self.total_debit() == self.total_credit()
    }

    /// First debit posted against `account`, if any.
    pub fn debit_on(&self, account: Account) -> Option<Decimal> {
        self.lines
            .iter()
            .find(|line| line.account == account && !line.debit.is_zero())
            .map(|line| line.debit)
    }
}

/// Commit marker written together with a settlement-date journal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementMarker {
    pub trade_id: TradeId,
    pub settled_at: DateTime<Utc>,
}
