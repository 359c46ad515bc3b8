use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{PortfolioId, Side, TradeId};

/// Why a cash row exists. Rendered as `SIDE:tradeId` or `ADMIN:RESET_BALANCE`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum CashReason {
    Trade { side: Side, trade_id: TradeId },
    ResetBalance,
}

impl CashReason {
    const RESET: &'static str = "ADMIN:RESET_BALANCE";

    pub fn is_admin(&self) -> bool {
        matches!(self, CashReason::ResetBalance)
    }
}

impl fmt::Display for CashReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CashReason::Trade { side, trade_id } => write!(f, "{side}:{trade_id}"),
            CashReason::ResetBalance => f.write_str(Self::RESET),
        }
    }
}

impl FromStr for CashReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::RESET {
            return Ok(CashReason::ResetBalance);
        }
        let (side, trade_id) = s
            .split_once(':')
            .ok_or_else(|| format!("malformed cash reason: {s}"))?;
        let side = side.parse::<Side>().map_err(|err| err.to_string())?;
        let trade_id = trade_id.parse::<TradeId>().map_err(|err| err.to_string())?;
        Ok(CashReason::Trade { side, trade_id })
    }
}

impl From<CashReason> for String {
    fn from(value: CashReason) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for CashReason {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Append-only cash movement. A portfolio's balance is the sum of its deltas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashEntry {
    pub id: i64,
    pub portfolio_id: PortfolioId,
    pub delta: Decimal,
    /// Only populated on rows written by a balance reset.
    pub balance: Option<Decimal>,
    pub currency: String,
    pub reason: CashReason,
    pub trade_id: Option<TradeId>,
    pub created_at: DateTime<Utc>,
}

/// Current balance of a portfolio's cash ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashBalance {
    pub portfolio_id: PortfolioId,
    pub balance: Decimal,
    pub currency: String,
}

/// Result of an administrative balance reset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashResetOutcome {
    pub portfolio_id: PortfolioId,
    pub entries_cleared: usize,
    pub balance: Decimal,
    pub currency: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_formats_side_and_trade() {
        let trade_id = TradeId::new();
        let reason = CashReason::Trade {
            side: Side::Buy,
            trade_id,
        };
        assert_eq!(reason.to_string(), format!("BUY:{trade_id}"));
        assert_eq!(reason.to_string().parse::<CashReason>().unwrap(), reason);
    }

    #[test]
    fn reset_reason_is_distinguishable() {
        let reason: CashReason = "ADMIN:RESET_BALANCE".parse().unwrap();
        assert!(reason.is_admin());
        assert!("SELL:nope".parse::<CashReason>().is_err());
    }
}
