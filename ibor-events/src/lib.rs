//! Side-channel notifications emitted by the book of record.
//!
//! Events are observational only: nothing in the ledger depends on a subscriber
//! receiving them, and publishing never fails when nobody is listening.

use chrono::{DateTime, Utc};
use ibor_core::{Isin, JournalType, PortfolioId, Side, TradeId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeBookedEvent {
    pub trade_id: TradeId,
    pub isin: Isin,
    pub side: Side,
    pub quantity: i64,
    pub price: Decimal,
    pub portfolio_id: PortfolioId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdatedEvent {
    pub trade_id: TradeId,
    pub isin: Isin,
    pub delta: Decimal,
    pub quantity: Decimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CashMovementEvent {
    pub trade_id: Option<TradeId>,
    pub portfolio_id: PortfolioId,
    pub delta: Decimal,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JournalPostedEvent {
    pub journal_id: Uuid,
    pub trade_id: TradeId,
    pub journal_type: JournalType,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavCalculatedEvent {
    pub snapshot_id: Uuid,
    pub portfolio_id: PortfolioId,
    pub net_value: Decimal,
    pub nav_per_share: Decimal,
}

/// Raised for defensive failures that need operator attention.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub kind: String,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Event {
    TradeBooked(TradeBookedEvent),
    PositionUpdated(PositionUpdatedEvent),
    CashMovement(CashMovementEvent),
    JournalPosted(JournalPostedEvent),
    NavCalculated(NavCalculatedEvent),
    Alert(AlertEvent),
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::TradeBooked(_) => "trade_booked",
            Event::PositionUpdated(_) => "position_updated",
            Event::CashMovement(_) => "cash_movement",
            Event::JournalPosted(_) => "journal_posted",
            Event::NavCalculated(_) => "nav_calculated",
            Event::Alert(_) => "alert",
        }
    }
}

pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn publish(&self, event: Event) {
        if let Ok(payload) = serde_json::to_string(&event) {
            debug!(kind = event.kind(), %payload, "publishing event");
        }
        let _ = self.sender.send(event);
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.publish(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

pub struct EventStream {
    receiver: broadcast::Receiver<Event>,
}

impl EventStream {
    /// Non-blocking poll, for synchronous consumers.
    pub fn try_recv(&mut self) -> Result<Event, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Drain everything currently buffered.
    ///
    /// Events overwritten while the subscriber lagged are skipped with a
    /// warning and draining continues from the oldest retained event.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscriber lagged; events dropped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        events
    }
}
