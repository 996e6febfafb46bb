mod common;

use chrono::Duration;
use cinebook_booking::CheckoutOutcome;
use cinebook_core::{PaymentId, SeatLedger, TicketStatus};
use common::{key, picks, user, world};
use proptest::prelude::*;
use std::collections::HashMap;

const SEATS: [&str; 3] = ["A1", "A2", "A3"];
const USERS: [&str; 3] = ["ann", "ben", "cat"];

#[derive(Debug, Clone)]
enum Op {
    Acquire { seat: usize, user: usize },
    Release { seat: usize, user: usize },
    Checkout { seats: Vec<usize>, user: usize },
    Confirm { payment: usize },
    Cancel { payment: usize, user: usize },
    Advance { minutes: i64 },
    Sweep,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..3usize, 0..3usize).prop_map(|(seat, user)| Op::Acquire { seat, user }),
        1 => (0..3usize, 0..3usize).prop_map(|(seat, user)| Op::Release { seat, user }),
        3 => (proptest::collection::vec(0..3usize, 1..3), 0..3usize)
            .prop_map(|(seats, user)| Op::Checkout { seats, user }),
        3 => (0..8usize).prop_map(|payment| Op::Confirm { payment }),
        1 => (0..8usize, 0..3usize).prop_map(|(payment, user)| Op::Cancel { payment, user }),
        2 => (1..20i64).prop_map(|minutes| Op::Advance { minutes }),
        1 => Just(Op::Sweep),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_never_two_confirmed_tickets_per_seat(ops in proptest::collection::vec(op(), 1..40)) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let violations = rt.block_on(async move {
            let w = world();
            let mut payments: Vec<PaymentId> = Vec::new();

            for op in ops {
                match op {
                    Op::Acquire { seat, user: u } => {
                        w.engine.locks.acquire(key(SEATS[seat]), &user(USERS[u])).await.unwrap();
                    }
                    Op::Release { seat, user: u } => {
                        w.engine.locks.release(common::seat(SEATS[seat]), None, &user(USERS[u])).await.unwrap();
                    }
                    Op::Checkout { mut seats, user: u } => {
                        seats.sort();
                        seats.dedup();
                        let chosen: Vec<(&str, i64)> = seats.iter().map(|s| (SEATS[*s], 1000)).collect();
                        let outcome = w.engine.checkout.checkout(&user(USERS[u]), &picks(&chosen)).await.unwrap();
                        if let CheckoutOutcome::Created(created) = outcome {
                            payments.push(created.payment.id);
                        }
                    }
                    Op::Confirm { payment } => {
                        if let Some(id) = payments.get(payment) {
                            w.engine.settlement.confirm(*id, "pi_prop").await.unwrap();
                        }
                    }
                    Op::Cancel { payment, user: u } => {
                        if let Some(id) = payments.get(payment) {
                            // Foreign cancels surface as NotFound
                            let _ = w.engine.settlement.cancel(*id, &user(USERS[u])).await;
                        }
                    }
                    Op::Advance { minutes } => w.clock.advance(Duration::minutes(minutes)),
                    Op::Sweep => {
                        w.engine.locks.sweep().await.unwrap();
                        w.engine.settlement.sweep_expired().await.unwrap();
                    }
                }
            }

            let mut tx = w.ledger.begin().await.unwrap();
            let mut confirmed = HashMap::new();
            for name in USERS {
                for ticket in tx.user_tickets(&user(name), TicketStatus::Confirmed).await.unwrap() {
                    *confirmed.entry(ticket.key()).or_insert(0) += 1;
                }
            }
            confirmed.values().filter(|count| **count > 1).count()
        });

        prop_assert_eq!(violations, 0);
    }
}
