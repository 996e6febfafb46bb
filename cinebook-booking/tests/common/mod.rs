#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use cinebook_booking::{BookingEngine, CheckoutOutcome, CreatedCheckout, ScreeningPicks, SeatPick};
use cinebook_core::{
    ExpiryPolicy, HallId, ManualClock, Screening, ScreeningId, Seat, SeatId, SeatKey, SeatStatus, UserId,
};
use cinebook_store::InMemorySeatLedger;
use std::sync::Arc;

pub const SCREENING: ScreeningId = ScreeningId(10);

pub struct World {
    pub engine: Arc<BookingEngine>,
    pub ledger: Arc<InMemorySeatLedger>,
    pub clock: Arc<ManualClock>,
}

pub fn start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-03-01T17:00:00Z").unwrap().with_timezone(&Utc)
}

/// Hall 1, rows A-C with four seats each. Seat ids count up from 1 in row
/// order, so A1 = 1, B2 = 6.
pub fn world() -> World {
    let mut seats = Vec::new();
    for row in 0..3 {
        for column in 0..4 {
            seats.push(Seat {
                id: SeatId((row * 4 + column + 1) as i64),
                hall_id: HallId(1),
                row_number: row,
                column_number: column,
                label: format!("{}{}", (b'A' + row as u8) as char, column + 1),
                category: "standard".into(),
                status: SeatStatus::Active,
            });
        }
    }
    let screening = Screening {
        id: SCREENING,
        hall_id: HallId(1),
        movie_id: "tt0062622".into(),
        start_time: start() + Duration::hours(3),
        end_time: start() + Duration::hours(5),
    };

    let ledger = Arc::new(InMemorySeatLedger::new(seats, vec![screening]));
    let clock = Arc::new(ManualClock::new(start()));
    let engine = Arc::new(BookingEngine::new(ledger.clone(), clock.clone(), ExpiryPolicy::default(), "stripe"));
    World { engine, ledger, clock }
}

pub fn seat(label: &str) -> SeatId {
    let mut chars = label.chars();
    let row = chars.next().map(|c| c as i64 - 'A' as i64).unwrap_or(0);
    let column: i64 = chars.as_str().parse().unwrap_or(1);
    SeatId(row * 4 + column)
}

pub fn key(label: &str) -> SeatKey {
    SeatKey::new(seat(label), SCREENING)
}

pub fn user(name: &str) -> UserId {
    UserId::new(name)
}

pub fn picks(seats: &[(&str, i64)]) -> Vec<ScreeningPicks> {
    vec![ScreeningPicks {
        screening_id: SCREENING,
        seats: seats.iter().map(|(label, price)| SeatPick { seat_id: seat(label), price: *price }).collect(),
    }]
}

pub fn created(outcome: CheckoutOutcome) -> CreatedCheckout {
    match outcome {
        CheckoutOutcome::Created(created) => created,
        other => panic!("expected a created checkout, got {:?}", other),
    }
}
