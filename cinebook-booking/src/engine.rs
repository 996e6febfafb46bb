use crate::checkout::CheckoutOrchestrator;
use crate::events::SeatEventPublisher;
use crate::locks::LockManager;
use crate::pricing::PriceQuotes;
use crate::settlement::PaymentSettlement;
use crate::status::StatusQuery;
use cinebook_core::{Clock, ExpiryPolicy, SeatLedger};
use cinebook_shared::SeatEvent;
use std::sync::Arc;
use tokio::sync::broadcast;

/// All booking components wired to one ledger, clock and event channel.
pub struct BookingEngine {
    pub locks: LockManager,
    pub checkout: CheckoutOrchestrator,
    pub settlement: PaymentSettlement,
    pub status: StatusQuery,
    pub pricing: PriceQuotes,
    events: SeatEventPublisher,
}

impl BookingEngine {
    pub fn new(
        ledger: Arc<dyn SeatLedger>,
        clock: Arc<dyn Clock>,
        policy: ExpiryPolicy,
        provider: impl Into<String>,
    ) -> Self {
        let events = SeatEventPublisher::default();
        Self {
            locks: LockManager::new(ledger.clone(), clock.clone(), policy, events.clone()),
            checkout: CheckoutOrchestrator::new(ledger.clone(), clock.clone(), policy, provider, events.clone()),
            settlement: PaymentSettlement::new(ledger.clone(), clock.clone(), policy, events.clone()),
            status: StatusQuery::new(ledger.clone(), clock, policy),
            pricing: PriceQuotes::new(ledger),
            events,
        }
    }

    pub fn policy(&self) -> ExpiryPolicy {
        self.locks.policy()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SeatEvent> {
        self.events.subscribe()
    }
}
