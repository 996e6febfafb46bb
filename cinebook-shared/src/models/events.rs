use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to a seat, as pushed to seat-map subscribers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SeatEventKind {
    Locked,
    Released,
    Reserved,
    Booked,
    Freed,
}

impl SeatEventKind {
    /// SSE event name, e.g. `seat_locked`.
    pub fn event_name(&self) -> &'static str {
        match self {
            SeatEventKind::Locked => "seat_locked",
            SeatEventKind::Released => "seat_released",
            SeatEventKind::Reserved => "seat_reserved",
            SeatEventKind::Booked => "seat_booked",
            SeatEventKind::Freed => "seat_freed",
        }
    }
}

/// Published only after the change it describes has been committed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeatEvent {
    pub seat_id: i64,
    pub screening_id: i64,
    pub kind: SeatEventKind,
    pub at: DateTime<Utc>,
}

impl SeatEvent {
    pub fn new(seat_id: i64, screening_id: i64, kind: SeatEventKind, at: DateTime<Utc>) -> Self {
        Self { seat_id, screening_id, kind, at }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let at = DateTime::parse_from_rfc3339("2025-01-01T18:00:00Z").unwrap().with_timezone(&Utc);
        let event = SeatEvent::new(7, 10, SeatEventKind::Booked, at);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["seatId"], 7);
        assert_eq!(json["screeningId"], 10);
        assert_eq!(json["kind"], "booked");
        assert_eq!(event.kind.event_name(), "seat_booked");
    }
}
