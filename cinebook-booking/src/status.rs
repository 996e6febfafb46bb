use crate::error::{BookingError, BookingResult};
use crate::seats;
use chrono::{DateTime, Utc};
use cinebook_core::{
    ClaimKind, Clock, ExpiryPolicy, ScreeningId, Seat, SeatClaim, SeatId, SeatKey, SeatLedger, SeatLock,
    SeatStatus, UserId,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeatState {
    Available,
    Locked,
    Reserved,
    Booked,
    Inactive,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeatStatusView {
    pub seat_id: SeatId,
    pub screening_id: ScreeningId,
    pub label: String,
    pub row_number: i32,
    pub column_number: i32,
    pub category: String,
    pub is_booked: bool,
    pub is_locked: bool,
    pub locked_by: Option<UserId>,
    pub is_available: bool,
    pub status: SeatState,
    pub held_by_you: bool,
}

/// Read-only availability projection. Never writes, so stale locks are
/// simply ignored rather than purged.
pub struct StatusQuery {
    ledger: Arc<dyn SeatLedger>,
    clock: Arc<dyn Clock>,
    policy: ExpiryPolicy,
}

impl StatusQuery {
    pub fn new(ledger: Arc<dyn SeatLedger>, clock: Arc<dyn Clock>, policy: ExpiryPolicy) -> Self {
        Self { ledger, clock, policy }
    }

    pub async fn status(&self, key: SeatKey, viewer: Option<&UserId>) -> BookingResult<SeatStatusView> {
        let now = self.clock.now();
        let mut tx = self.ledger.begin().await?;
        let (seat, _) = seats::resolve(tx.as_mut(), key).await?;

        let lock = tx.peek_lock(key).await?;
        let claim = tx.seat_claim(key, now).await?;
        Ok(project(&seat, key, lock, claim, &self.policy, now, viewer))
    }

    /// Every seat of the screening's hall, by row then column.
    pub async fn seat_map(&self, screening: ScreeningId, viewer: Option<&UserId>) -> BookingResult<Vec<SeatStatusView>> {
        let now = self.clock.now();
        let mut tx = self.ledger.begin().await?;
        let screening = tx
            .screening(screening)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("screening {}", screening)))?;

        let seats = tx.hall_seats(screening.hall_id).await?;
        let mut views = Vec::with_capacity(seats.len());
        for seat in &seats {
            let key = SeatKey::new(seat.id, screening.id);
            let lock = tx.peek_lock(key).await?;
            let claim = tx.seat_claim(key, now).await?;
            views.push(project(seat, key, lock, claim, &self.policy, now, viewer));
        }
        Ok(views)
    }
}

fn project(
    seat: &Seat,
    key: SeatKey,
    lock: Option<SeatLock>,
    claim: Option<SeatClaim>,
    policy: &ExpiryPolicy,
    now: DateTime<Utc>,
    viewer: Option<&UserId>,
) -> SeatStatusView {
    let live_lock = lock.filter(|l| policy.is_lock_live(l, now));
    let is_locked = live_lock.is_some();
    let is_booked = claim.is_some();
    let active = seat.status == SeatStatus::Active;

    let status = if !active {
        SeatState::Inactive
    } else {
        match claim.as_ref().map(|c| c.kind) {
            Some(ClaimKind::ConfirmedTicket) | Some(ClaimKind::ConfirmedReservation) => SeatState::Booked,
            Some(ClaimKind::PendingReservation { .. }) => SeatState::Reserved,
            None if is_locked => SeatState::Locked,
            None => SeatState::Available,
        }
    };

    let locked_by = live_lock.map(|l| l.user_id);
    let held_by_you = matches!((&locked_by, viewer), (Some(holder), Some(viewer)) if holder == viewer);

    SeatStatusView {
        seat_id: key.seat_id,
        screening_id: key.screening_id,
        label: seat.label.clone(),
        row_number: seat.row_number,
        column_number: seat.column_number,
        category: seat.category.clone(),
        is_booked,
        is_locked,
        locked_by,
        is_available: active && !is_booked && !is_locked,
        status,
        held_by_you,
    }
}
