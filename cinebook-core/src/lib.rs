pub mod error;
pub mod expiry;
pub mod ids;
pub mod ledger;
pub mod models;

pub use error::{LedgerError, LedgerResult};
pub use expiry::{Clock, ExpiryPolicy, ManualClock, SystemClock};
pub use ids::{HallId, PaymentId, ReservationId, ScreeningId, SeatId, SeatKey, TicketId, UserId};
pub use ledger::{LedgerTx, LockScope, SeatLedger};
pub use models::{
    ClaimKind, NewPayment, NewReservation, NewTicket, Payment, PaymentStatus, Reservation,
    ReservationStatus, Screening, ScreeningPrice, Seat, SeatClaim, SeatLock, SeatStatus, Ticket, TicketStatus,
};
