use crate::models::{Reservation, ReservationStatus, SeatLock};
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

/// Source of "now" for every expiry decision.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Arc::new(Mutex::new(start)) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }

}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// How long claims on a seat stay valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    pub lock_ttl: Duration,
    pub reservation_window: Duration,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            lock_ttl: Duration::minutes(5),
            reservation_window: Duration::minutes(15),
        }
    }
}

/// Upper bound for either claim duration (30 days).
pub const MAX_CLAIM_SECONDS: u64 = 30 * 24 * 60 * 60;

fn claim_duration(seconds: u64) -> Option<Duration> {
    if seconds == 0 || seconds > MAX_CLAIM_SECONDS {
        return None;
    }
    Duration::try_seconds(i64::try_from(seconds).ok()?)
}

impl ExpiryPolicy {
    /// `None` when either duration is zero or above [`MAX_CLAIM_SECONDS`].
    pub fn from_seconds(lock_ttl_seconds: u64, reservation_window_seconds: u64) -> Option<Self> {
        Some(Self {
            lock_ttl: claim_duration(lock_ttl_seconds)?,
            reservation_window: claim_duration(reservation_window_seconds)?,
        })
    }

    /// Locks acquired at or before this instant are stale.
    pub fn lock_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.lock_ttl
    }

    pub fn lock_expires_at(&self, lock: &SeatLock) -> DateTime<Utc> {
        lock.locked_at + self.lock_ttl
    }

    pub fn is_lock_live(&self, lock: &SeatLock, now: DateTime<Utc>) -> bool {
        lock.locked_at > self.lock_cutoff(now)
    }

    pub fn reservation_expires_at(&self, created_at: DateTime<Utc>) -> DateTime<Utc> {
        created_at + self.reservation_window
    }

    /// Confirmed reservations never lapse; pending ones hold through
    /// `expiration_time` and lapse strictly after it.
    pub fn is_reservation_live(&self, reservation: &Reservation, now: DateTime<Utc>) -> bool {
        match reservation.status {
            ReservationStatus::Confirmed => true,
            ReservationStatus::Pending => reservation.expiration_time >= now,
            ReservationStatus::Cancelled | ReservationStatus::Expired => false,
        }
    }
}
