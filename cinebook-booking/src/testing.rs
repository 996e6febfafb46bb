use chrono::{DateTime, Duration, Utc};
use cinebook_core::{
    HallId, ManualClock, Screening, ScreeningId, ScreeningPrice, Seat, SeatId, SeatKey, SeatStatus, UserId,
};
use cinebook_store::{InMemorySeatLedger, PriceTable};
use std::sync::Arc;

pub(crate) struct Fixture {
    pub ledger: Arc<InMemorySeatLedger>,
    pub clock: Arc<ManualClock>,
    pub screening: ScreeningId,
    pub later_screening: ScreeningId,
    pub seats: Vec<SeatId>,
    pub inactive_seat: SeatId,
    pub other_hall_seat: SeatId,
    pub alice: UserId,
    pub bob: UserId,
}

impl Fixture {
    pub fn key(&self, n: usize) -> SeatKey {
        SeatKey::new(self.seats[n], self.screening)
    }
}

fn seat(id: i64, hall: i64, row: i32, column: i32, status: SeatStatus) -> Seat {
    Seat {
        id: SeatId(id),
        hall_id: HallId(hall),
        row_number: row,
        column_number: column,
        label: format!("{}{}", (b'A' + row as u8) as char, column + 1),
        category: "standard".into(),
        status,
    }
}

pub(crate) fn start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-01-01T16:00:00Z").unwrap().with_timezone(&Utc)
}

/// Hall 1 with a 2x2 block of active seats and one inactive seat, plus a
/// single seat in hall 2. Two screenings in hall 1.
pub(crate) fn fixture() -> Fixture {
    build(PriceTable::default())
}

/// Same layout with prices: default base 1000, screening 10 at 1200 + 150,
/// and seat A1 in the "premium" category at +300.
pub(crate) fn priced_fixture() -> Fixture {
    let prices = PriceTable {
        default_base_price: Some(1000),
        screenings: [(ScreeningId(10), ScreeningPrice { base_price: 1200, modifier: 150 })].into(),
        categories: [("premium".to_string(), 300)].into(),
    };
    build(prices)
}

fn build(prices: PriceTable) -> Fixture {
    let mut seats = vec![
        seat(1, 1, 0, 0, SeatStatus::Active),
        seat(2, 1, 0, 1, SeatStatus::Active),
        seat(3, 1, 1, 0, SeatStatus::Active),
        seat(4, 1, 1, 1, SeatStatus::Active),
        seat(5, 1, 1, 2, SeatStatus::Inactive),
        seat(100, 2, 0, 0, SeatStatus::Active),
    ];
    seats[0].category = "premium".into();
    let screenings = vec![
        Screening {
            id: ScreeningId(10),
            hall_id: HallId(1),
            movie_id: "tt0133093".into(),
            start_time: start() + Duration::hours(2),
            end_time: start() + Duration::hours(4),
        },
        Screening {
            id: ScreeningId(11),
            hall_id: HallId(1),
            movie_id: "tt0133093".into(),
            start_time: start() + Duration::hours(5),
            end_time: start() + Duration::hours(7),
        },
    ];

    Fixture {
        ledger: Arc::new(InMemorySeatLedger::with_prices(seats, screenings, prices)),
        clock: Arc::new(ManualClock::new(start())),
        screening: ScreeningId(10),
        later_screening: ScreeningId(11),
        seats: vec![SeatId(1), SeatId(2), SeatId(3), SeatId(4)],
        inactive_seat: SeatId(5),
        other_hall_seat: SeatId(100),
        alice: UserId::new("alice"),
        bob: UserId::new("bob"),
    }
}
