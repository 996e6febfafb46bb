use crate::error::{BookingError, BookingResult};
use crate::events::SeatEventPublisher;
use crate::seats;
use cinebook_core::{
    Clock, ExpiryPolicy, LockScope, ScreeningId, SeatId, SeatKey, SeatLedger, SeatLock, SeatStatus, UserId,
};
use cinebook_shared::SeatEventKind;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    Acquired(SeatLock),
    HeldByOther,
    AlreadyBooked,
}

/// Hands out and takes back the short-lived per-seat selection locks.
pub struct LockManager {
    ledger: Arc<dyn SeatLedger>,
    clock: Arc<dyn Clock>,
    policy: ExpiryPolicy,
    events: SeatEventPublisher,
}

impl LockManager {
    pub fn new(
        ledger: Arc<dyn SeatLedger>,
        clock: Arc<dyn Clock>,
        policy: ExpiryPolicy,
        events: SeatEventPublisher,
    ) -> Self {
        Self { ledger, clock, policy, events }
    }

    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    /// Try to take the lock on `key` for `user`.
    ///
    /// Stale locks on the seat are purged first. A seat that is booked or
    /// reserved is refused before the lock table is consulted, and the final
    /// upsert only lands when nobody else holds the row.
    pub async fn acquire(&self, key: SeatKey, user: &UserId) -> BookingResult<LockOutcome> {
        let now = self.clock.now();
        let mut tx = self.ledger.begin().await?;

        let (seat, _) = seats::resolve(tx.as_mut(), key).await?;
        if seat.status != SeatStatus::Active {
            return Err(BookingError::Validation(format!("seat {} is not bookable", seat.id)));
        }

        let purged = tx.purge_locks(LockScope::Seat(key), self.policy.lock_cutoff(now)).await?;

        if tx.seat_claim(key, now).await?.is_some() {
            tx.commit().await?;
            self.events.publish(&purged, SeatEventKind::Released, now);
            warn!(%key, user = %user, "lock refused, seat already booked");
            return Ok(LockOutcome::AlreadyBooked);
        }

        if let Some(existing) = tx.lock(key).await? {
            if &existing.user_id != user {
                tx.commit().await?;
                self.events.publish(&purged, SeatEventKind::Released, now);
                warn!(%key, user = %user, "lock refused, held by another user");
                return Ok(LockOutcome::HeldByOther);
            }
        }

        match tx.upsert_lock(key, user, now).await? {
            Some(lock) => {
                tx.commit().await?;
                self.events.publish(&[key], SeatEventKind::Locked, now);
                info!(%key, user = %user, "seat locked");
                Ok(LockOutcome::Acquired(lock))
            }
            None => {
                tx.commit().await?;
                self.events.publish(&purged, SeatEventKind::Released, now);
                warn!(%key, user = %user, "lock upsert lost to a concurrent holder");
                Ok(LockOutcome::HeldByOther)
            }
        }
    }

    /// Drop `user`'s lock(s) on the seat. Locks held by anyone else are left
    /// alone, and releasing nothing still succeeds.
    pub async fn release(
        &self,
        seat: SeatId,
        screening: Option<ScreeningId>,
        user: &UserId,
    ) -> BookingResult<Vec<SeatKey>> {
        let now = self.clock.now();
        let mut tx = self.ledger.begin().await?;
        let released = tx.delete_locks(seat, screening, user).await?;
        tx.commit().await?;

        if !released.is_empty() {
            self.events.publish(&released, SeatEventKind::Released, now);
            info!(seat = %seat, user = %user, count = released.len(), "seat lock released");
        }
        Ok(released)
    }

    /// Extend `user`'s live lock(s) on the seat. Returns whether any were.
    pub async fn refresh(
        &self,
        seat: SeatId,
        screening: Option<ScreeningId>,
        user: &UserId,
    ) -> BookingResult<bool> {
        let now = self.clock.now();
        let scope = match screening {
            Some(screening) => LockScope::Seat(SeatKey::new(seat, screening)),
            None => LockScope::All,
        };

        let mut tx = self.ledger.begin().await?;
        let purged = tx.purge_locks(scope, self.policy.lock_cutoff(now)).await?;
        let touched = tx.touch_locks(seat, screening, user, now).await?;
        tx.commit().await?;

        self.events.publish(&purged, SeatEventKind::Released, now);
        Ok(touched > 0)
    }

    /// Delete every stale lock.
    pub async fn sweep(&self) -> BookingResult<Vec<SeatKey>> {
        let now = self.clock.now();
        let mut tx = self.ledger.begin().await?;
        let purged = tx.purge_locks(LockScope::All, self.policy.lock_cutoff(now)).await?;
        tx.commit().await?;

        if !purged.is_empty() {
            self.events.publish(&purged, SeatEventKind::Released, now);
            info!(count = purged.len(), "stale seat locks swept");
        }
        Ok(purged)
    }
}
