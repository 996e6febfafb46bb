use crate::ids::{HallId, PaymentId, ReservationId, ScreeningId, SeatId, SeatKey, TicketId, UserId};
use chrono::{DateTime, Utc};
use cinebook_shared::Masked;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} status: {value}")]
pub struct UnknownStatus {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! status_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownStatus;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownStatus { kind: $kind, value: other.to_string() }),
                }
            }
        }
    };
}

status_enum!(SeatStatus, "seat", {
    Active => "active",
    Inactive => "inactive",
});

status_enum!(ReservationStatus, "reservation", {
    Pending => "pending",
    Confirmed => "confirmed",
    Cancelled => "cancelled",
    Expired => "expired",
});

status_enum!(PaymentStatus, "payment", {
    Pending => "pending",
    Completed => "completed",
    Cancelled => "cancelled",
    Expired => "expired",
});

status_enum!(TicketStatus, "ticket", {
    Pending => "pending",
    Confirmed => "confirmed",
    Cancelled => "cancelled",
});

impl PaymentStatus {
    /// Terminal states accept no further settlement.
    pub fn is_closed(&self) -> bool {
        matches!(self, PaymentStatus::Cancelled | PaymentStatus::Expired)
    }
}

/// A physical seat in a hall. Maintained by hall administration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Seat {
    pub id: SeatId,
    pub hall_id: HallId,
    pub row_number: i32,
    pub column_number: i32,
    pub label: String,
    pub category: String,
    pub status: SeatStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Screening {
    pub id: ScreeningId,
    pub hall_id: HallId,
    pub movie_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Price inputs that come from the screening: a base price and a surcharge,
/// both in minor currency units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScreeningPrice {
    pub base_price: i64,
    pub modifier: i64,
}

/// A short-lived claim on one seat for one screening.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeatLock {
    pub seat_id: SeatId,
    pub screening_id: ScreeningId,
    pub user_id: UserId,
    pub locked_at: DateTime<Utc>,
}

impl SeatLock {
    pub fn key(&self) -> SeatKey {
        SeatKey::new(self.seat_id, self.screening_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reservation {
    pub id: ReservationId,
    pub seat_id: SeatId,
    pub screening_id: ScreeningId,
    pub user_id: UserId,
    pub payment_id: PaymentId,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub expiration_time: DateTime<Utc>,
}

impl Reservation {
    pub fn key(&self) -> SeatKey {
        SeatKey::new(self.seat_id, self.screening_id)
    }
}

/// One checkout. Amount is in minor currency units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    pub amount: i64,
    pub status: PaymentStatus,
    pub provider: String,
    pub provider_transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ticket {
    pub id: TicketId,
    pub user_id: UserId,
    pub screening_id: ScreeningId,
    pub seat_id: SeatId,
    pub payment_id: PaymentId,
    pub price: i64,
    pub ticket_code: Masked<String>,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    pub fn key(&self) -> SeatKey {
        SeatKey::new(self.seat_id, self.screening_id)
    }
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub user_id: UserId,
    pub amount: i64,
    pub provider: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub user_id: UserId,
    pub key: SeatKey,
    pub payment_id: PaymentId,
    pub price: i64,
    pub ticket_code: Masked<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReservation {
    pub user_id: UserId,
    pub key: SeatKey,
    pub payment_id: PaymentId,
    pub created_at: DateTime<Utc>,
    pub expiration_time: DateTime<Utc>,
}

/// Why a seat counts as taken for a screening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimKind {
    ConfirmedTicket,
    ConfirmedReservation,
    PendingReservation { expires_at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatClaim {
    pub user_id: UserId,
    pub kind: ClaimKind,
}

impl SeatClaim {
    pub fn is_confirmed(&self) -> bool {
        !matches!(self.kind, ClaimKind::PendingReservation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_matches_storage() {
        assert_eq!(PaymentStatus::Completed.as_str(), "completed");
        assert_eq!("expired".parse::<ReservationStatus>().unwrap(), ReservationStatus::Expired);
        assert_eq!(serde_json::to_string(&TicketStatus::Confirmed).unwrap(), "\"confirmed\"");

        let err = "refunded".parse::<TicketStatus>().unwrap_err();
        assert_eq!(err.kind, "ticket");
        assert_eq!(err.value, "refunded");
    }

    #[test]
    fn test_closed_payment_states() {
        assert!(PaymentStatus::Expired.is_closed());
        assert!(PaymentStatus::Cancelled.is_closed());
        assert!(!PaymentStatus::Pending.is_closed());
        assert!(!PaymentStatus::Completed.is_closed());
    }
}
