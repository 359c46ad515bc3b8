//! Domain types shared by every IBOR crate.

pub mod calendar;
mod cash;
mod clock;
mod error;
mod ids;
mod journal;
pub mod money;
mod nav;
mod oracle;
mod position;
mod trade;

pub use cash::{CashBalance, CashEntry, CashReason, CashResetOutcome};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::ValidationError;
pub use ids::{Isin, PortfolioId, TradeId};
pub use journal::{Account, Journal, JournalLine, JournalType, SettlementMarker};
pub use nav::NavSnapshot;
pub use oracle::{PriceOracle, StaticPriceOracle};
pub use position::{Position, ProcessedTrade};
pub use trade::{BookingReceipt, Side, Trade, TradeRequest, TradeStatus};
