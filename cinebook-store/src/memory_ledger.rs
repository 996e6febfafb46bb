use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cinebook_core::{
    ClaimKind, HallId, LedgerError, LedgerResult, LedgerTx, LockScope, NewPayment, NewReservation,
    NewTicket, Payment, PaymentId, PaymentStatus, Reservation, ReservationId, ReservationStatus,
    Screening, ScreeningId, ScreeningPrice, Seat, SeatClaim, SeatId, SeatKey, SeatLedger, SeatLock, Ticket,
    TicketId, TicketStatus, UserId,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct LedgerState {
    seats: BTreeMap<SeatId, Seat>,
    screenings: HashMap<ScreeningId, Screening>,
    locks: HashMap<SeatKey, SeatLock>,
    payments: BTreeMap<PaymentId, Payment>,
    tickets: BTreeMap<TicketId, Ticket>,
    reservations: BTreeMap<ReservationId, Reservation>,
    prices: PriceTable,
    next_id: i64,
}

/// Pricing reference rows: a default base price, per-screening overrides and
/// per-category surcharges.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    pub default_base_price: Option<i64>,
    pub screenings: HashMap<ScreeningId, ScreeningPrice>,
    pub categories: HashMap<String, i64>,
}

impl LedgerState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Seat ledger held in process memory.
///
/// A transaction holds the state mutex from `begin` until it is committed or
/// dropped and works on a private copy, so transactions are fully serialized
/// and an uncommitted one leaves no trace. Used for tests and local demos.
#[derive(Clone, Default)]
pub struct InMemorySeatLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemorySeatLedger {
    /// Seed the static reference rows that hall administration would own.
    pub fn new(seats: Vec<Seat>, screenings: Vec<Screening>) -> Self {
        Self::with_prices(seats, screenings, PriceTable::default())
    }

    pub fn with_prices(seats: Vec<Seat>, screenings: Vec<Screening>, prices: PriceTable) -> Self {
        let state = LedgerState {
            seats: seats.into_iter().map(|s| (s.id, s)).collect(),
            screenings: screenings.into_iter().map(|s| (s.id, s)).collect(),
            prices,
            ..LedgerState::default()
        };
        Self { state: Arc::new(Mutex::new(state)) }
    }
}

#[async_trait]
impl SeatLedger for InMemorySeatLedger {
    async fn begin(&self) -> LedgerResult<Box<dyn LedgerTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryLedgerTx { guard, working }))
    }
}

pub struct MemoryLedgerTx {
    guard: OwnedMutexGuard<LedgerState>,
    working: LedgerState,
}

fn matches_scope(lock: &SeatLock, seat: SeatId, screening: Option<ScreeningId>, user: &UserId) -> bool {
    lock.seat_id == seat
        && &lock.user_id == user
        && screening.map_or(true, |s| lock.screening_id == s)
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn seat(&mut self, id: SeatId) -> LedgerResult<Option<Seat>> {
        Ok(self.working.seats.get(&id).cloned())
    }

    async fn screening(&mut self, id: ScreeningId) -> LedgerResult<Option<Screening>> {
        Ok(self.working.screenings.get(&id).cloned())
    }

    async fn hall_seats(&mut self, hall_id: HallId) -> LedgerResult<Vec<Seat>> {
        let mut seats: Vec<Seat> = self
            .working
            .seats
            .values()
            .filter(|s| s.hall_id == hall_id)
            .cloned()
            .collect();
        seats.sort_by_key(|s| (s.row_number, s.column_number));
        Ok(seats)
    }

    async fn screening_price(&mut self, id: ScreeningId) -> LedgerResult<Option<ScreeningPrice>> {
        let prices = &self.working.prices;
        Ok(prices.screenings.get(&id).copied().or_else(|| {
            prices
                .default_base_price
                .map(|base_price| ScreeningPrice { base_price, modifier: 0 })
        }))
    }

    async fn category_modifier(&mut self, category: &str) -> LedgerResult<i64> {
        Ok(self.working.prices.categories.get(category).copied().unwrap_or(0))
    }

    async fn purge_locks(&mut self, scope: LockScope, cutoff: DateTime<Utc>) -> LedgerResult<Vec<SeatKey>> {
        let stale: Vec<SeatKey> = self
            .working
            .locks
            .values()
            .filter(|lock| match scope {
                LockScope::Seat(key) => lock.key() == key,
                LockScope::All => true,
            })
            .filter(|lock| lock.locked_at <= cutoff)
            .map(SeatLock::key)
            .collect();

        for key in &stale {
            self.working.locks.remove(key);
        }
        Ok(stale)
    }

    async fn lock(&mut self, key: SeatKey) -> LedgerResult<Option<SeatLock>> {
        Ok(self.working.locks.get(&key).cloned())
    }

    async fn peek_lock(&mut self, key: SeatKey) -> LedgerResult<Option<SeatLock>> {
        self.lock(key).await
    }

    async fn upsert_lock(
        &mut self,
        key: SeatKey,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> LedgerResult<Option<SeatLock>> {
        match self.working.locks.get_mut(&key) {
            Some(existing) if &existing.user_id != user => Ok(None),
            Some(existing) => {
                existing.locked_at = now;
                Ok(Some(existing.clone()))
            }
            None => {
                let lock = SeatLock {
                    seat_id: key.seat_id,
                    screening_id: key.screening_id,
                    user_id: user.clone(),
                    locked_at: now,
                };
                self.working.locks.insert(key, lock.clone());
                Ok(Some(lock))
            }
        }
    }

    async fn delete_locks(
        &mut self,
        seat: SeatId,
        screening: Option<ScreeningId>,
        user: &UserId,
    ) -> LedgerResult<Vec<SeatKey>> {
        let mut released = Vec::new();
        self.working.locks.retain(|key, lock| {
            if matches_scope(lock, seat, screening, user) {
                released.push(*key);
                false
            } else {
                true
            }
        });
        released.sort();
        Ok(released)
    }

    async fn touch_locks(
        &mut self,
        seat: SeatId,
        screening: Option<ScreeningId>,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> LedgerResult<u64> {
        let mut touched = 0;
        for lock in self.working.locks.values_mut() {
            if matches_scope(lock, seat, screening, user) {
                lock.locked_at = now;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn seat_claim(&mut self, key: SeatKey, now: DateTime<Utc>) -> LedgerResult<Option<SeatClaim>> {
        let ticket = self
            .working
            .tickets
            .values()
            .find(|t| t.key() == key && t.status == TicketStatus::Confirmed)
            .map(|t| SeatClaim { user_id: t.user_id.clone(), kind: ClaimKind::ConfirmedTicket });
        if ticket.is_some() {
            return Ok(ticket);
        }

        let live: Vec<&Reservation> = self
            .working
            .reservations
            .values()
            .filter(|r| r.key() == key)
            .filter(|r| match r.status {
                ReservationStatus::Confirmed => true,
                ReservationStatus::Pending => r.expiration_time >= now,
                _ => false,
            })
            .collect();

        let claim = live
            .iter()
            .find(|r| r.status == ReservationStatus::Confirmed)
            .map(|r| SeatClaim { user_id: r.user_id.clone(), kind: ClaimKind::ConfirmedReservation })
            .or_else(|| {
                live.first().map(|r| SeatClaim {
                    user_id: r.user_id.clone(),
                    kind: ClaimKind::PendingReservation { expires_at: r.expiration_time },
                })
            });
        Ok(claim)
    }

    async fn insert_payment(&mut self, new: NewPayment) -> LedgerResult<Payment> {
        if new.amount < 0 {
            return Err(LedgerError::Constraint("payments.amount must not be negative".into()));
        }
        let payment = Payment {
            id: PaymentId(self.working.next_id()),
            user_id: new.user_id,
            amount: new.amount,
            status: PaymentStatus::Pending,
            provider: new.provider,
            provider_transaction_id: None,
            created_at: new.created_at,
            updated_at: new.created_at,
        };
        self.working.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn insert_ticket(&mut self, new: NewTicket) -> LedgerResult<Ticket> {
        if self.working.tickets.values().any(|t| t.ticket_code == new.ticket_code) {
            return Err(LedgerError::Constraint("tickets.ticket_code must be unique".into()));
        }
        if !self.working.payments.contains_key(&new.payment_id) {
            return Err(LedgerError::Constraint(format!("payment {} does not exist", new.payment_id)));
        }
        let ticket = Ticket {
            id: TicketId(self.working.next_id()),
            user_id: new.user_id,
            screening_id: new.key.screening_id,
            seat_id: new.key.seat_id,
            payment_id: new.payment_id,
            price: new.price,
            ticket_code: new.ticket_code,
            status: TicketStatus::Pending,
            created_at: new.created_at,
        };
        self.working.tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn insert_reservation(&mut self, new: NewReservation) -> LedgerResult<Reservation> {
        if !self.working.payments.contains_key(&new.payment_id) {
            return Err(LedgerError::Constraint(format!("payment {} does not exist", new.payment_id)));
        }
        let reservation = Reservation {
            id: ReservationId(self.working.next_id()),
            seat_id: new.key.seat_id,
            screening_id: new.key.screening_id,
            user_id: new.user_id,
            payment_id: new.payment_id,
            status: ReservationStatus::Pending,
            created_at: new.created_at,
            expiration_time: new.expiration_time,
        };
        self.working.reservations.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn payment(&mut self, id: PaymentId) -> LedgerResult<Option<Payment>> {
        Ok(self.working.payments.get(&id).cloned())
    }

    async fn set_payment_status(
        &mut self,
        id: PaymentId,
        status: PaymentStatus,
        provider_transaction_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> LedgerResult<()> {
        if let Some(payment) = self.working.payments.get_mut(&id) {
            payment.status = status;
            if let Some(tx_id) = provider_transaction_id {
                payment.provider_transaction_id = Some(tx_id.to_string());
            }
            payment.updated_at = now;
        }
        Ok(())
    }

    async fn payment_tickets(&mut self, id: PaymentId) -> LedgerResult<Vec<Ticket>> {
        Ok(self.working.tickets.values().filter(|t| t.payment_id == id).cloned().collect())
    }

    async fn payment_reservations(&mut self, id: PaymentId) -> LedgerResult<Vec<Reservation>> {
        Ok(self.working.reservations.values().filter(|r| r.payment_id == id).cloned().collect())
    }

    async fn settle_payment_rows(
        &mut self,
        id: PaymentId,
        ticket_status: TicketStatus,
        reservation_status: ReservationStatus,
        _now: DateTime<Utc>,
    ) -> LedgerResult<()> {
        if ticket_status == TicketStatus::Confirmed {
            // Same guarantee as the partial unique index on the Postgres side
            for ticket in self.working.tickets.values().filter(|t| t.payment_id == id) {
                let taken = self.working.tickets.values().any(|other| {
                    other.id != ticket.id
                        && other.key() == ticket.key()
                        && other.status == TicketStatus::Confirmed
                });
                if taken {
                    return Err(LedgerError::Constraint(format!(
                        "{} already has a confirmed ticket",
                        ticket.key()
                    )));
                }
            }
        }

        for ticket in self.working.tickets.values_mut().filter(|t| t.payment_id == id) {
            ticket.status = ticket_status;
        }
        for reservation in self.working.reservations.values_mut().filter(|r| r.payment_id == id) {
            reservation.status = reservation_status;
        }
        Ok(())
    }

    async fn delete_pending_rows(&mut self, id: PaymentId) -> LedgerResult<Vec<SeatKey>> {
        let mut keys = Vec::new();
        self.working.tickets.retain(|_, t| {
            let doomed = t.payment_id == id && t.status == TicketStatus::Pending;
            if doomed {
                keys.push(t.key());
            }
            !doomed
        });
        self.working.reservations.retain(|_, r| {
            let doomed = r.payment_id == id && r.status == ReservationStatus::Pending;
            if doomed {
                keys.push(r.key());
            }
            !doomed
        });
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn expired_pending_payments(&mut self, now: DateTime<Utc>) -> LedgerResult<Vec<PaymentId>> {
        let reservations = &self.working.reservations;
        Ok(self
            .working
            .payments
            .values()
            .filter(|p| p.status == PaymentStatus::Pending)
            .filter(|p| {
                reservations.values().any(|r| {
                    r.payment_id == p.id
                        && r.status == ReservationStatus::Pending
                        && r.expiration_time < now
                })
            })
            .map(|p| p.id)
            .collect())
    }

    async fn ticket(&mut self, id: TicketId) -> LedgerResult<Option<Ticket>> {
        Ok(self.working.tickets.get(&id).cloned())
    }

    async fn cancel_ticket(&mut self, ticket: &Ticket, _now: DateTime<Utc>) -> LedgerResult<()> {
        if let Some(stored) = self.working.tickets.get_mut(&ticket.id) {
            stored.status = TicketStatus::Cancelled;
        }
        for reservation in self.working.reservations.values_mut() {
            if reservation.payment_id == ticket.payment_id
                && reservation.key() == ticket.key()
                && matches!(reservation.status, ReservationStatus::Pending | ReservationStatus::Confirmed)
            {
                reservation.status = ReservationStatus::Cancelled;
            }
        }
        Ok(())
    }

    async fn user_tickets(&mut self, user: &UserId, status: TicketStatus) -> LedgerResult<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self
            .working
            .tickets
            .values()
            .filter(|t| &t.user_id == user && t.status == status)
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tickets)
    }

    async fn commit(self: Box<Self>) -> LedgerResult<()> {
        let MemoryLedgerTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use cinebook_core::SeatStatus;
    use cinebook_shared::Masked;

    fn at(minutes: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T18:00:00Z").unwrap().with_timezone(&Utc)
            + Duration::minutes(minutes)
    }

    fn ledger() -> InMemorySeatLedger {
        let seat = Seat {
            id: SeatId(1),
            hall_id: HallId(1),
            row_number: 0,
            column_number: 0,
            label: "A1".into(),
            category: "standard".into(),
            status: SeatStatus::Active,
        };
        let screening = Screening {
            id: ScreeningId(10),
            hall_id: HallId(1),
            movie_id: "tt0133093".into(),
            start_time: at(120),
            end_time: at(256),
        };
        InMemorySeatLedger::new(vec![seat], vec![screening])
    }

    fn key() -> SeatKey {
        SeatKey::new(SeatId(1), ScreeningId(10))
    }

    #[tokio::test]
    async fn test_upsert_refuses_foreign_holder() {
        let ledger = ledger();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        let mut tx = ledger.begin().await.unwrap();
        assert!(tx.upsert_lock(key(), &alice, at(0)).await.unwrap().is_some());
        assert!(tx.upsert_lock(key(), &bob, at(1)).await.unwrap().is_none());

        let restamped = tx.upsert_lock(key(), &alice, at(2)).await.unwrap().unwrap();
        assert_eq!(restamped.locked_at, at(2));
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_peek_lock_sees_the_same_row_as_lock() {
        let ledger = ledger();
        let alice = UserId::new("alice");

        let mut tx = ledger.begin().await.unwrap();
        assert!(tx.peek_lock(key()).await.unwrap().is_none());
        tx.upsert_lock(key(), &alice, at(0)).await.unwrap();
        assert_eq!(tx.peek_lock(key()).await.unwrap(), tx.lock(key()).await.unwrap());
        tx.commit().await.unwrap();

        let mut tx = ledger.begin().await.unwrap();
        assert_eq!(tx.peek_lock(key()).await.unwrap().map(|l| l.user_id), Some(alice));
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let ledger = ledger();
        let alice = UserId::new("alice");

        {
            let mut tx = ledger.begin().await.unwrap();
            tx.upsert_lock(key(), &alice, at(0)).await.unwrap();
        }

        let mut tx = ledger.begin().await.unwrap();
        assert!(tx.lock(key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_confirmed_ticket_is_a_constraint_violation() {
        let ledger = ledger();
        let mut tx = ledger.begin().await.unwrap();

        let mut payments = Vec::new();
        for (n, user) in ["alice", "bob"].iter().enumerate() {
            let payment = tx
                .insert_payment(NewPayment {
                    user_id: UserId::new(*user),
                    amount: 1000,
                    provider: "stripe".into(),
                    created_at: at(0),
                })
                .await
                .unwrap();
            tx.insert_ticket(NewTicket {
                user_id: UserId::new(*user),
                key: key(),
                payment_id: payment.id,
                price: 1000,
                ticket_code: Masked(format!("code-{}", n)),
                created_at: at(0),
            })
            .await
            .unwrap();
            payments.push(payment.id);
        }

        tx.settle_payment_rows(payments[0], TicketStatus::Confirmed, ReservationStatus::Confirmed, at(1))
            .await
            .unwrap();
        let err = tx
            .settle_payment_rows(payments[1], TicketStatus::Confirmed, ReservationStatus::Confirmed, at(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Constraint(_)));
    }

    #[tokio::test]
    async fn test_purge_only_touches_stale_rows_in_scope() {
        let ledger = ledger();
        let alice = UserId::new("alice");
        let other = SeatKey::new(SeatId(1), ScreeningId(11));

        let mut tx = ledger.begin().await.unwrap();
        tx.upsert_lock(key(), &alice, at(0)).await.unwrap();
        tx.upsert_lock(other, &alice, at(0)).await.unwrap();

        let purged = tx.purge_locks(LockScope::Seat(key()), at(5)).await.unwrap();
        assert_eq!(purged, vec![key()]);
        assert!(tx.lock(other).await.unwrap().is_some());

        let purged = tx.purge_locks(LockScope::All, at(4)).await.unwrap();
        assert!(purged.is_empty());
    }
}
