use std::sync::Arc;

use ibor_core::Clock;
use ibor_events::{AlertEvent, Event, EventBus};
use ibor_ledger::{LedgerSession, SqliteLedger};
use tracing::error;

use crate::{IborError, IborResult};

/// Open transaction plus the events it will publish once committed.
pub struct UnitOfWork<'a, 'c> {
    session: &'a LedgerSession<'c>,
    events: Vec<Event>,
}

impl<'a, 'c> UnitOfWork<'a, 'c> {
    pub fn new(session: &'a LedgerSession<'c>) -> Self {
        Self {
            session,
            events: Vec::new(),
        }
    }

    pub fn session(&self) -> &'a LedgerSession<'c> {
        self.session
    }

    /// Queue an event; it is dropped if the unit of work rolls back.
    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    fn into_events(self) -> Vec<Event> {
        self.events
    }
}

/// Ledger, bus and clock shared by the components.
#[derive(Clone)]
pub struct Store {
    ledger: SqliteLedger,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
}

impl Store {
    pub fn new(ledger: SqliteLedger, bus: Arc<EventBus>, clock: Arc<dyn Clock>) -> Self {
        Self { ledger, bus, clock }
    }

    pub fn ledger(&self) -> &SqliteLedger {
        &self.ledger
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Run `work` atomically and publish its events after commit.
    pub fn transact<T, F>(&self, work: F) -> IborResult<T>
    where
        F: FnOnce(&mut UnitOfWork<'_, '_>) -> IborResult<T>,
    {
        let outcome: IborResult<(T, Vec<Event>)> = self.ledger.write(|session| {
            let mut uow = UnitOfWork::new(session);
            let value = work(&mut uow)?;
            Ok((value, uow.into_events()))
        });
        match outcome {
            Ok((value, events)) => {
                self.bus.publish_all(events);
                Ok(value)
            }
            Err(err) => Err(self.escalate(err)),
        }
    }

    pub fn read<T, F>(&self, work: F) -> IborResult<T>
    where
        F: FnOnce(&LedgerSession<'_>) -> IborResult<T>,
    {
        self.ledger.read(work).map_err(|err| self.escalate(err))
    }

    /// Log alerting errors loudly and broadcast them; pass the error through.
    pub fn escalate(&self, err: IborError) -> IborError {
        if err.is_alert() {
            error!(
                alert = true,
                kind = err.kind(),
                error = %err,
                "book of record invariant violated"
            );
            self.bus.publish(Event::Alert(AlertEvent {
                kind: err.kind().to_string(),
                message: err.to_string(),
                raised_at: self.clock.now(),
            }));
        }
        err
    }
}
