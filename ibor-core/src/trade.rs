use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Isin, PortfolioId, TradeId, ValidationError};

/// Direction of a trade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    /// Sign applied to the traded quantity when moving the position.
    pub fn position_sign(self) -> Decimal {
        match self {
            Side::Buy => Decimal::ONE,
            Side::Sell => Decimal::NEGATIVE_ONE,
        }
    }

    /// Sign applied to the trade notional when moving cash.
    pub fn cash_sign(self) -> Decimal {
        -self.position_sign()
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(ValidationError::new(
                "side",
                format!("unknown trade side: {other}"),
            )),
        }
    }
}

/// Lifecycle state of a booked trade. Only the status ever changes after booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    New,
    Settled,
}

impl TradeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeStatus::New => "NEW",
            TradeStatus::Settled => "SETTLED",
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(TradeStatus::New),
            "SETTLED" => Ok(TradeStatus::Settled),
            other => Err(format!("unknown trade status: {other}")),
        }
    }
}

/// Persisted trade record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub trade_id: TradeId,
    pub isin: Isin,
    pub quantity: i64,
    pub price: Decimal,
    pub side: Side,
    pub trade_date: NaiveDate,
    pub settle_date: NaiveDate,
    pub status: TradeStatus,
    pub portfolio_id: PortfolioId,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Trade {
    /// Gross consideration (`quantity × price`) before any rounding.
    pub fn notional(&self) -> Decimal {
        Decimal::from(self.quantity) * self.price
    }
}

/// Booking request as submitted by a client.
///
/// Fields are loose (`String` ISIN, signed quantity); the booking engine reports
/// each rule it checks as a field-tagged [`ValidationError`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequest {
    #[serde(default)]
    pub trade_id: Option<TradeId>,
    pub isin: String,
    pub quantity: i64,
    pub price: Decimal,
    pub side: Side,
    pub trade_date: NaiveDate,
    #[serde(default)]
    pub settle_date: Option<NaiveDate>,
    #[serde(default)]
    pub portfolio_id: Option<PortfolioId>,
}

impl TradeRequest {
    pub fn new(
        isin: impl Into<String>,
        quantity: i64,
        price: Decimal,
        side: Side,
        trade_date: NaiveDate,
    ) -> Self {
        Self {
            trade_id: None,
            isin: isin.into(),
            quantity,
            price,
            side,
            trade_date,
            settle_date: None,
            portfolio_id: None,
        }
    }

    #[must_use]
    pub fn with_trade_id(mut self, trade_id: TradeId) -> Self {
        self.trade_id = Some(trade_id);
        self
    }

    #[must_use]
    pub fn with_settle_date(mut self, settle_date: NaiveDate) -> Self {
        self.settle_date = Some(settle_date);
        self
    }

    #[must_use]
    pub fn with_portfolio(mut self, portfolio_id: impl Into<PortfolioId>) -> Self {
        self.portfolio_id = Some(portfolio_id.into());
        self
    }
}

/// Outcome of a booking call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingReceipt {
    pub trade_id: TradeId,
    pub status: TradeStatus,
    pub idempotent_hit: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn side_signs_are_opposite_for_cash_and_position() {
        assert_eq!(Side::Buy.position_sign(), dec!(1));
        assert_eq!(Side::Buy.cash_sign(), dec!(-1));
        assert_eq!(Side::Sell.position_sign(), dec!(-1));
        assert_eq!(Side::Sell.cash_sign(), dec!(1));
    }

    #[test]
    fn side_parses_case_insensitively() {
        assert_eq!("buy".parse::<Side>().unwrap(), Side::Buy);
        assert_eq!("SELL".parse::<Side>().unwrap(), Side::Sell);
        assert_eq!("hold".parse::<Side>().unwrap_err().field(), "side");
    }

    #[test]
    fn request_deserializes_from_camel_case() {
        let json = r#"{
            "isin": "US0378331005",
            "quantity": 100,
            "price": "175.50",
            "side": "BUY",
            "tradeDate": "2024-05-10"
        }"#;
        let request: TradeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.quantity, 100);
        assert_eq!(request.price, dec!(175.50));
        assert!(request.trade_id.is_none());
        assert!(request.settle_date.is_none());
    }
}
