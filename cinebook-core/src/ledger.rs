use crate::error::LedgerResult;
use crate::ids::{HallId, PaymentId, ScreeningId, SeatId, SeatKey, TicketId, UserId};
use crate::models::{
    NewPayment, NewReservation, NewTicket, Payment, PaymentStatus, Reservation, ReservationStatus,
    Screening, ScreeningPrice, Seat, SeatClaim, SeatLock, Ticket, TicketStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Which locks a stale-lock purge may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockScope {
    Seat(SeatKey),
    All,
}

/// Persisted source of truth for seat state.
///
/// All access goes through a transaction obtained from [`SeatLedger::begin`].
/// Dropping a transaction without calling [`LedgerTx::commit`] rolls it back.
#[async_trait]
pub trait SeatLedger: Send + Sync {
    async fn begin(&self) -> LedgerResult<Box<dyn LedgerTx>>;
}

/// One scoped unit of work against the ledger.
///
/// Reads on lock and payment rows take row locks where the backend supports
/// them, so a check followed by a write in the same transaction cannot be
/// interleaved by a competing writer on the same row.
#[async_trait]
pub trait LedgerTx: Send {
    async fn seat(&mut self, id: SeatId) -> LedgerResult<Option<Seat>>;

    async fn screening(&mut self, id: ScreeningId) -> LedgerResult<Option<Screening>>;

    /// Seats of a hall ordered by row, then column.
    async fn hall_seats(&mut self, hall_id: HallId) -> LedgerResult<Vec<Seat>>;

    /// The screening's own base price and surcharge, or the default base
    /// price with no surcharge. `None` when neither is configured.
    async fn screening_price(&mut self, id: ScreeningId) -> LedgerResult<Option<ScreeningPrice>>;

    /// Surcharge for a seat category; 0 for categories without one.
    async fn category_modifier(&mut self, category: &str) -> LedgerResult<i64>;

    /// Delete locks with `locked_at <= cutoff`. Returns the keys removed.
    async fn purge_locks(&mut self, scope: LockScope, cutoff: DateTime<Utc>) -> LedgerResult<Vec<SeatKey>>;

    /// The lock row for `key` regardless of age, row-locked until the
    /// transaction ends.
    async fn lock(&mut self, key: SeatKey) -> LedgerResult<Option<SeatLock>>;

    /// Same row as [`LedgerTx::lock`] but without a row lock, for read-only
    /// projections that must not queue behind or block lock writers.
    async fn peek_lock(&mut self, key: SeatKey) -> LedgerResult<Option<SeatLock>>;

    /// Insert a lock, or re-stamp it when `user` already holds it.
    ///
    /// Returns `None` when another user holds the row; that row is left as it was.
    async fn upsert_lock(
        &mut self,
        key: SeatKey,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> LedgerResult<Option<SeatLock>>;

    /// Delete `user`'s locks on `seat`, for one screening or all of them.
    async fn delete_locks(
        &mut self,
        seat: SeatId,
        screening: Option<ScreeningId>,
        user: &UserId,
    ) -> LedgerResult<Vec<SeatKey>>;

    /// Re-stamp `user`'s locks on `seat`. Returns the number of rows touched.
    async fn touch_locks(
        &mut self,
        seat: SeatId,
        screening: Option<ScreeningId>,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> LedgerResult<u64>;

    /// The strongest live claim on `key`: a confirmed ticket, a confirmed
    /// reservation, or a pending reservation with `expiration_time >= now`.
    async fn seat_claim(&mut self, key: SeatKey, now: DateTime<Utc>) -> LedgerResult<Option<SeatClaim>>;

    async fn insert_payment(&mut self, new: NewPayment) -> LedgerResult<Payment>;

    async fn insert_ticket(&mut self, new: NewTicket) -> LedgerResult<Ticket>;

    async fn insert_reservation(&mut self, new: NewReservation) -> LedgerResult<Reservation>;

    async fn payment(&mut self, id: PaymentId) -> LedgerResult<Option<Payment>>;

    async fn set_payment_status(
        &mut self,
        id: PaymentId,
        status: PaymentStatus,
        provider_transaction_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> LedgerResult<()>;

    async fn payment_tickets(&mut self, id: PaymentId) -> LedgerResult<Vec<Ticket>>;

    async fn payment_reservations(&mut self, id: PaymentId) -> LedgerResult<Vec<Reservation>>;

    /// Move every ticket and reservation of a payment to the given statuses.
    ///
    /// Fails with a constraint error if that would leave two confirmed tickets
    /// on one seat for one screening.
    async fn settle_payment_rows(
        &mut self,
        id: PaymentId,
        ticket_status: TicketStatus,
        reservation_status: ReservationStatus,
        now: DateTime<Utc>,
    ) -> LedgerResult<()>;

    /// Delete the pending tickets and reservations of a payment. Returns the
    /// seat keys they occupied.
    async fn delete_pending_rows(&mut self, id: PaymentId) -> LedgerResult<Vec<SeatKey>>;

    /// Pending payments owning at least one reservation with
    /// `expiration_time < now`.
    async fn expired_pending_payments(&mut self, now: DateTime<Utc>) -> LedgerResult<Vec<PaymentId>>;

    async fn ticket(&mut self, id: TicketId) -> LedgerResult<Option<Ticket>>;

    /// Cancel one ticket along with the reservation for the same seat,
    /// screening and payment.
    async fn cancel_ticket(&mut self, ticket: &Ticket, now: DateTime<Utc>) -> LedgerResult<()>;

    /// Tickets of `user` in `status`, newest first.
    async fn user_tickets(&mut self, user: &UserId, status: TicketStatus) -> LedgerResult<Vec<Ticket>>;

    async fn commit(self: Box<Self>) -> LedgerResult<()>;
}
