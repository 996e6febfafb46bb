use crate::error::{BookingError, BookingResult};
use crate::events::SeatEventPublisher;
use chrono::{DateTime, Utc};
use cinebook_core::{
    Clock, ExpiryPolicy, LedgerTx, Payment, PaymentId, PaymentStatus, ReservationStatus, SeatKey,
    SeatLedger, Ticket, TicketId, TicketStatus, UserId,
};
use cinebook_shared::SeatEventKind;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed(Payment),
    AlreadyCompleted(Payment),
    /// The payment was cancelled or expired, possibly by this very call.
    Closed(PaymentStatus),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled(Vec<SeatKey>),
    AlreadyClosed(PaymentStatus),
    /// Completed payments are refunded through the provider, not here.
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketCancelOutcome {
    Cancelled(Ticket),
    AlreadyCancelled,
}

/// A payment as its owner sees it on the checkout page.
#[derive(Debug, Clone)]
pub struct PaymentSummary {
    pub payment: Payment,
    pub tickets: Vec<Ticket>,
    /// Earliest reservation deadline while the payment is pending.
    pub expires_at: Option<DateTime<Utc>>,
}

pub struct PaymentSettlement {
    ledger: Arc<dyn SeatLedger>,
    clock: Arc<dyn Clock>,
    policy: ExpiryPolicy,
    events: SeatEventPublisher,
}

impl PaymentSettlement {
    pub fn new(
        ledger: Arc<dyn SeatLedger>,
        clock: Arc<dyn Clock>,
        policy: ExpiryPolicy,
        events: SeatEventPublisher,
    ) -> Self {
        Self { ledger, clock, policy, events }
    }

    /// Apply the provider's capture confirmation.
    pub async fn confirm(&self, id: PaymentId, provider_transaction_id: &str) -> BookingResult<ConfirmOutcome> {
        let now = self.clock.now();
        let mut tx = self.ledger.begin().await?;
        let payment = tx
            .payment(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("payment {}", id)))?;

        if payment.status == PaymentStatus::Completed {
            return Ok(ConfirmOutcome::AlreadyCompleted(payment));
        }
        if payment.status.is_closed() {
            warn!(payment = %id, status = %payment.status, "confirmation for a closed payment");
            return Ok(ConfirmOutcome::Closed(payment.status));
        }

        if self.has_lapsed(tx.as_mut(), id, now).await? {
            let freed = tear_down(tx.as_mut(), id, PaymentStatus::Expired, now).await?;
            tx.commit().await?;
            self.events.publish(&freed, SeatEventKind::Freed, now);
            warn!(payment = %id, "confirmation arrived after the reservation window, payment expired");
            return Ok(ConfirmOutcome::Closed(PaymentStatus::Expired));
        }

        tx.settle_payment_rows(id, TicketStatus::Confirmed, ReservationStatus::Confirmed, now).await?;
        tx.set_payment_status(id, PaymentStatus::Completed, Some(provider_transaction_id), now).await?;
        let booked: Vec<SeatKey> = tx.payment_tickets(id).await?.iter().map(Ticket::key).collect();
        let payment = tx
            .payment(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("payment {}", id)))?;
        tx.commit().await?;

        self.events.publish(&booked, SeatEventKind::Booked, now);
        info!(payment = %id, seats = booked.len(), "payment confirmed");
        Ok(ConfirmOutcome::Confirmed(payment))
    }

    /// Owner abandons a pending checkout.
    pub async fn cancel(&self, id: PaymentId, user: &UserId) -> BookingResult<CancelOutcome> {
        let now = self.clock.now();
        let mut tx = self.ledger.begin().await?;
        let payment = owned_payment(tx.as_mut(), id, user).await?;

        match payment.status {
            PaymentStatus::Completed => Ok(CancelOutcome::Completed),
            status if status.is_closed() => Ok(CancelOutcome::AlreadyClosed(status)),
            _ => {
                let freed = tear_down(tx.as_mut(), id, PaymentStatus::Cancelled, now).await?;
                tx.commit().await?;
                self.events.publish(&freed, SeatEventKind::Freed, now);
                info!(payment = %id, user = %user, "payment cancelled");
                Ok(CancelOutcome::Cancelled(freed))
            }
        }
    }

    /// Expire every pending payment whose reservation window has passed.
    pub async fn sweep_expired(&self) -> BookingResult<Vec<PaymentId>> {
        let now = self.clock.now();
        let mut tx = self.ledger.begin().await?;
        let expired = tx.expired_pending_payments(now).await?;

        let mut freed = Vec::new();
        for id in &expired {
            freed.extend(tear_down(tx.as_mut(), *id, PaymentStatus::Expired, now).await?);
        }
        tx.commit().await?;

        if !expired.is_empty() {
            self.events.publish(&freed, SeatEventKind::Freed, now);
            info!(payments = expired.len(), seats = freed.len(), "expired pending payments");
        }
        Ok(expired)
    }

    /// The owner's view of a payment. A pending payment past its window is
    /// expired on the way.
    pub async fn summary(&self, id: PaymentId, user: &UserId) -> BookingResult<PaymentSummary> {
        let now = self.clock.now();
        let mut tx = self.ledger.begin().await?;
        let mut payment = owned_payment(tx.as_mut(), id, user).await?;

        if payment.status == PaymentStatus::Pending && self.has_lapsed(tx.as_mut(), id, now).await? {
            let freed = tear_down(tx.as_mut(), id, PaymentStatus::Expired, now).await?;
            payment = owned_payment(tx.as_mut(), id, user).await?;
            tx.commit().await?;
            self.events.publish(&freed, SeatEventKind::Freed, now);
            info!(payment = %id, "pending payment expired on load");
            return Ok(PaymentSummary { payment, tickets: Vec::new(), expires_at: None });
        }

        let tickets = tx.payment_tickets(id).await?;
        let expires_at = if payment.status == PaymentStatus::Pending {
            tx.payment_reservations(id)
                .await?
                .iter()
                .filter(|r| r.status == ReservationStatus::Pending)
                .map(|r| r.expiration_time)
                .min()
        } else {
            None
        };
        Ok(PaymentSummary { payment, tickets, expires_at })
    }

    /// Owner gives back a confirmed ticket before the screening starts.
    pub async fn cancel_ticket(&self, id: TicketId, user: &UserId) -> BookingResult<TicketCancelOutcome> {
        let now = self.clock.now();
        let mut tx = self.ledger.begin().await?;
        let ticket = tx
            .ticket(id)
            .await?
            .filter(|t| &t.user_id == user)
            .ok_or_else(|| BookingError::NotFound(format!("ticket {}", id)))?;

        match ticket.status {
            TicketStatus::Cancelled => return Ok(TicketCancelOutcome::AlreadyCancelled),
            TicketStatus::Pending => {
                return Err(BookingError::Validation(format!(
                    "ticket {} is not paid yet, cancel payment {} instead",
                    id, ticket.payment_id
                )))
            }
            TicketStatus::Confirmed => {}
        }

        let screening = tx
            .screening(ticket.screening_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("screening {}", ticket.screening_id)))?;
        if now >= screening.start_time {
            return Err(BookingError::Closed(format!("screening {} has already started", screening.id)));
        }

        tx.cancel_ticket(&ticket, now).await?;
        tx.commit().await?;

        self.events.publish(&[ticket.key()], SeatEventKind::Freed, now);
        info!(ticket = %id, user = %user, "ticket cancelled");
        Ok(TicketCancelOutcome::Cancelled(Ticket { status: TicketStatus::Cancelled, ..ticket }))
    }

    /// Confirmed tickets of `user`, newest first.
    pub async fn list_tickets(&self, user: &UserId) -> BookingResult<Vec<Ticket>> {
        let mut tx = self.ledger.begin().await?;
        Ok(tx.user_tickets(user, TicketStatus::Confirmed).await?)
    }

    async fn has_lapsed(&self, tx: &mut dyn LedgerTx, id: PaymentId, now: DateTime<Utc>) -> BookingResult<bool> {
        Ok(tx
            .payment_reservations(id)
            .await?
            .iter()
            .any(|r| r.status == ReservationStatus::Pending && !self.policy.is_reservation_live(r, now)))
    }
}

async fn owned_payment(tx: &mut dyn LedgerTx, id: PaymentId, user: &UserId) -> BookingResult<Payment> {
    // Someone else's payment is reported exactly like a missing one
    tx.payment(id)
        .await?
        .filter(|p| &p.user_id == user)
        .ok_or_else(|| BookingError::NotFound(format!("payment {}", id)))
}

async fn tear_down(
    tx: &mut dyn LedgerTx,
    id: PaymentId,
    status: PaymentStatus,
    now: DateTime<Utc>,
) -> BookingResult<Vec<SeatKey>> {
    let freed = tx.delete_pending_rows(id).await?;
    tx.set_payment_status(id, status, None, now).await?;
    Ok(freed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::{CheckoutOrchestrator, CheckoutOutcome, ScreeningPicks, SeatPick};
    use crate::locks::LockManager;
    use crate::testing::{fixture, Fixture};
    use chrono::Duration;

    struct Parts {
        locks: LockManager,
        checkout: CheckoutOrchestrator,
        settlement: PaymentSettlement,
    }

    fn parts(f: &Fixture) -> Parts {
        let events = SeatEventPublisher::default();
        let policy = ExpiryPolicy::default();
        Parts {
            locks: LockManager::new(f.ledger.clone(), f.clock.clone(), policy, events.clone()),
            checkout: CheckoutOrchestrator::new(f.ledger.clone(), f.clock.clone(), policy, "stripe", events.clone()),
            settlement: PaymentSettlement::new(f.ledger.clone(), f.clock.clone(), policy, events),
        }
    }

    async fn pending_payment(p: &Parts, f: &Fixture, user: &UserId, seat: usize) -> PaymentId {
        p.locks.acquire(f.key(seat), user).await.unwrap();
        let picks = [ScreeningPicks {
            screening_id: f.screening,
            seats: vec![SeatPick { seat_id: f.seats[seat], price: 1000 }],
        }];
        match p.checkout.checkout(user, &picks).await.unwrap() {
            CheckoutOutcome::Created(created) => created.payment.id,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_confirm_is_idempotent() {
        let f = fixture();
        let p = parts(&f);
        let id = pending_payment(&p, &f, &f.alice, 0).await;

        let first = p.settlement.confirm(id, "ch_1").await.unwrap();
        let payment = match first {
            ConfirmOutcome::Confirmed(payment) => payment,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.provider_transaction_id.as_deref(), Some("ch_1"));

        assert!(matches!(p.settlement.confirm(id, "ch_1").await.unwrap(), ConfirmOutcome::AlreadyCompleted(_)));
        assert_eq!(p.settlement.list_tickets(&f.alice).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_after_window_expires_payment() {
        let f = fixture();
        let p = parts(&f);
        let id = pending_payment(&p, &f, &f.alice, 0).await;

        f.clock.advance(Duration::minutes(15) + Duration::seconds(1));
        assert_eq!(
            p.settlement.confirm(id, "ch_late").await.unwrap(),
            ConfirmOutcome::Closed(PaymentStatus::Expired)
        );
        assert_eq!(
            p.settlement.confirm(id, "ch_late").await.unwrap(),
            ConfirmOutcome::Closed(PaymentStatus::Expired)
        );
        assert!(p.settlement.list_tickets(&f.alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_rules() {
        let f = fixture();
        let p = parts(&f);
        let id = pending_payment(&p, &f, &f.alice, 0).await;

        assert!(matches!(p.settlement.cancel(id, &f.bob).await, Err(BookingError::NotFound(_))));
        assert_eq!(p.settlement.cancel(id, &f.alice).await.unwrap(), CancelOutcome::Cancelled(vec![f.key(0)]));
        assert_eq!(
            p.settlement.cancel(id, &f.alice).await.unwrap(),
            CancelOutcome::AlreadyClosed(PaymentStatus::Cancelled)
        );
        assert_eq!(
            p.settlement.confirm(id, "ch_1").await.unwrap(),
            ConfirmOutcome::Closed(PaymentStatus::Cancelled)
        );

        let paid = pending_payment(&p, &f, &f.alice, 1).await;
        p.settlement.confirm(paid, "ch_2").await.unwrap();
        assert_eq!(p.settlement.cancel(paid, &f.alice).await.unwrap(), CancelOutcome::Completed);
    }

    #[tokio::test]
    async fn test_summary_expires_lazily() {
        let f = fixture();
        let p = parts(&f);
        let id = pending_payment(&p, &f, &f.alice, 0).await;

        let summary = p.settlement.summary(id, &f.alice).await.unwrap();
        assert_eq!(summary.tickets.len(), 1);
        assert_eq!(summary.expires_at, Some(f.clock.now() + Duration::minutes(15)));

        f.clock.advance(Duration::minutes(16));
        let summary = p.settlement.summary(id, &f.alice).await.unwrap();
        assert_eq!(summary.payment.status, PaymentStatus::Expired);
        assert!(summary.tickets.is_empty());
        assert!(summary.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_sweep_expired_only_touches_lapsed_payments() {
        let f = fixture();
        let p = parts(&f);
        let old = pending_payment(&p, &f, &f.alice, 0).await;
        f.clock.advance(Duration::minutes(10));
        let fresh = pending_payment(&p, &f, &f.bob, 1).await;
        f.clock.advance(Duration::minutes(6));

        assert_eq!(p.settlement.sweep_expired().await.unwrap(), vec![old]);
        assert!(p.settlement.sweep_expired().await.unwrap().is_empty());
        assert!(matches!(p.settlement.confirm(fresh, "ch").await.unwrap(), ConfirmOutcome::Confirmed(_)));
    }

    #[tokio::test]
    async fn test_sweep_and_confirm_agree_at_the_deadline() {
        let f = fixture();
        let p = parts(&f);
        let on_time = pending_payment(&p, &f, &f.alice, 0).await;
        let late = pending_payment(&p, &f, &f.bob, 1).await;

        // Exactly at the deadline both paths still treat the payment as open
        f.clock.advance(Duration::minutes(15));
        assert!(p.settlement.sweep_expired().await.unwrap().is_empty());
        assert_eq!(p.settlement.summary(late, &f.bob).await.unwrap().payment.status, PaymentStatus::Pending);
        assert!(matches!(p.settlement.confirm(on_time, "ch_edge").await.unwrap(), ConfirmOutcome::Confirmed(_)));

        f.clock.advance(Duration::seconds(1));
        assert_eq!(p.settlement.sweep_expired().await.unwrap(), vec![late]);
        assert_eq!(
            p.settlement.confirm(late, "ch_late").await.unwrap(),
            ConfirmOutcome::Closed(PaymentStatus::Expired)
        );
    }

    #[tokio::test]
    async fn test_ticket_cancellation_frees_the_seat() {
        let f = fixture();
        let p = parts(&f);
        let id = pending_payment(&p, &f, &f.alice, 0).await;
        p.settlement.confirm(id, "ch").await.unwrap();
        let ticket = p.settlement.list_tickets(&f.alice).await.unwrap().remove(0);

        assert!(matches!(p.settlement.cancel_ticket(ticket.id, &f.bob).await, Err(BookingError::NotFound(_))));
        let outcome = p.settlement.cancel_ticket(ticket.id, &f.alice).await.unwrap();
        assert!(matches!(outcome, TicketCancelOutcome::Cancelled(t) if t.status == TicketStatus::Cancelled));
        assert_eq!(
            p.settlement.cancel_ticket(ticket.id, &f.alice).await.unwrap(),
            TicketCancelOutcome::AlreadyCancelled
        );

        assert!(matches!(
            p.locks.acquire(f.key(0), &f.bob).await.unwrap(),
            crate::locks::LockOutcome::Acquired(_)
        ));
    }

    #[tokio::test]
    async fn test_ticket_cannot_be_cancelled_after_start() {
        let f = fixture();
        let p = parts(&f);
        let id = pending_payment(&p, &f, &f.alice, 0).await;
        p.settlement.confirm(id, "ch").await.unwrap();
        let ticket = p.settlement.list_tickets(&f.alice).await.unwrap().remove(0);

        f.clock.advance(Duration::hours(2));
        assert!(matches!(p.settlement.cancel_ticket(ticket.id, &f.alice).await, Err(BookingError::Closed(_))));
    }
}
