pub mod checkout;
pub mod engine;
pub mod error;
pub mod events;
pub mod locks;
pub mod pricing;
mod seats;
pub mod settlement;
pub mod status;
pub mod ticket_code;

#[cfg(test)]
mod testing;

pub use checkout::{
    CheckoutOrchestrator, CheckoutOutcome, ConflictReason, CreatedCheckout, ScreeningPicks, SeatConflict, SeatPick,
};
pub use engine::BookingEngine;
pub use error::{BookingError, BookingResult};
pub use events::SeatEventPublisher;
pub use locks::{LockManager, LockOutcome};
pub use pricing::{PriceBreakdown, PriceQuote, PriceQuotes};
pub use settlement::{CancelOutcome, ConfirmOutcome, PaymentSettlement, PaymentSummary, TicketCancelOutcome};
pub use status::{SeatState, SeatStatusView, StatusQuery};
