use crate::error::{BookingError, BookingResult};
use crate::events::SeatEventPublisher;
use crate::seats;
use crate::ticket_code::generate_ticket_code;
use chrono::{DateTime, Utc};
use cinebook_core::{
    Clock, ExpiryPolicy, NewPayment, NewReservation, NewTicket, Payment, ScreeningId, SeatId, SeatKey,
    SeatLedger, SeatStatus, Ticket, UserId,
};
use cinebook_shared::SeatEventKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeatPick {
    pub seat_id: SeatId,
    /// Minor units.
    pub price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningPicks {
    pub screening_id: ScreeningId,
    pub seats: Vec<SeatPick>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ConflictReason {
    AlreadyBooked,
    HeldByOther,
    NotLocked,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeatConflict {
    pub seat_id: SeatId,
    pub screening_id: ScreeningId,
    pub reason: ConflictReason,
}

#[derive(Debug, Clone)]
pub struct CreatedCheckout {
    pub payment: Payment,
    pub tickets: Vec<Ticket>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum CheckoutOutcome {
    Created(CreatedCheckout),
    Conflict(Vec<SeatConflict>),
}

/// Turns a user's locked seats into a pending payment with its tickets and
/// reservations, all in one transaction.
pub struct CheckoutOrchestrator {
    ledger: Arc<dyn SeatLedger>,
    clock: Arc<dyn Clock>,
    policy: ExpiryPolicy,
    provider: String,
    events: SeatEventPublisher,
}

impl CheckoutOrchestrator {
    pub fn new(
        ledger: Arc<dyn SeatLedger>,
        clock: Arc<dyn Clock>,
        policy: ExpiryPolicy,
        provider: impl Into<String>,
        events: SeatEventPublisher,
    ) -> Self {
        Self { ledger, clock, policy, provider: provider.into(), events }
    }

    pub async fn checkout(&self, user: &UserId, picks: &[ScreeningPicks]) -> BookingResult<CheckoutOutcome> {
        let (items, amount) = flatten(picks)?;
        let now = self.clock.now();
        let mut tx = self.ledger.begin().await?;

        let mut invalid = Vec::new();
        for (key, _) in &items {
            match seats::resolve(tx.as_mut(), *key).await {
                Ok((seat, _)) if seat.status == SeatStatus::Active => {}
                Ok(_) => invalid.push(format!("{} (inactive)", key)),
                Err(BookingError::Validation(reason)) => invalid.push(format!("{} ({})", key, reason)),
                Err(other) => return Err(other),
            }
        }
        if !invalid.is_empty() {
            return Err(BookingError::Validation(format!("invalid seats: {}", invalid.join(", "))));
        }

        let mut conflicts = Vec::new();
        for (key, _) in &items {
            let reason = if tx.seat_claim(*key, now).await?.is_some() {
                Some(ConflictReason::AlreadyBooked)
            } else {
                match tx.lock(*key).await? {
                    Some(lock) if !self.policy.is_lock_live(&lock, now) => Some(ConflictReason::NotLocked),
                    Some(lock) if &lock.user_id != user => Some(ConflictReason::HeldByOther),
                    Some(_) => None,
                    None => Some(ConflictReason::NotLocked),
                }
            };
            if let Some(reason) = reason {
                conflicts.push(SeatConflict { seat_id: key.seat_id, screening_id: key.screening_id, reason });
            }
        }
        if !conflicts.is_empty() {
            warn!(user = %user, conflicts = conflicts.len(), "checkout rejected");
            return Ok(CheckoutOutcome::Conflict(conflicts));
        }

        let payment = tx
            .insert_payment(NewPayment {
                user_id: user.clone(),
                amount,
                provider: self.provider.clone(),
                created_at: now,
            })
            .await?;

        let expires_at = self.policy.reservation_expires_at(now);
        let mut tickets = Vec::with_capacity(items.len());
        for (key, price) in &items {
            let ticket = tx
                .insert_ticket(NewTicket {
                    user_id: user.clone(),
                    key: *key,
                    payment_id: payment.id,
                    price: *price,
                    ticket_code: generate_ticket_code(),
                    created_at: now,
                })
                .await?;
            tx.insert_reservation(NewReservation {
                user_id: user.clone(),
                key: *key,
                payment_id: payment.id,
                created_at: now,
                expiration_time: expires_at,
            })
            .await?;
            tx.delete_locks(key.seat_id, Some(key.screening_id), user).await?;
            tickets.push(ticket);
        }
        tx.commit().await?;

        let keys: Vec<SeatKey> = items.iter().map(|(key, _)| *key).collect();
        self.events.publish(&keys, SeatEventKind::Reserved, now);
        info!(payment = %payment.id, user = %user, seats = keys.len(), amount, "checkout created");

        Ok(CheckoutOutcome::Created(CreatedCheckout { payment, tickets, expires_at }))
    }
}

/// Shape checks that need no ledger access.
fn flatten(picks: &[ScreeningPicks]) -> BookingResult<(Vec<(SeatKey, i64)>, i64)> {
    let mut items = Vec::new();
    let mut seen = HashSet::new();
    let mut amount: i64 = 0;

    for screening in picks {
        for pick in &screening.seats {
            let key = SeatKey::new(pick.seat_id, screening.screening_id);
            if !seen.insert(key) {
                return Err(BookingError::Validation(format!("{} appears more than once", key)));
            }
            if pick.price < 0 {
                return Err(BookingError::Validation(format!("{} has a negative price", key)));
            }
            amount = amount
                .checked_add(pick.price)
                .ok_or_else(|| BookingError::Validation("order total overflows".into()))?;
            items.push((key, pick.price));
        }
    }

    if items.is_empty() {
        return Err(BookingError::Validation("no seats selected".into()));
    }
    Ok((items, amount))
}
