use chrono::{DateTime, Utc};
use cinebook_core::{PaymentId, ScreeningId, SeatId, Ticket, TicketId, TicketStatus};
use serde::Serialize;

/// Ticket as returned to its owner. The code is only handed out once the
/// ticket is confirmed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    pub ticket_id: TicketId,
    pub payment_id: PaymentId,
    pub screening_id: ScreeningId,
    pub seat_id: SeatId,
    pub price: i64,
    pub status: TicketStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Ticket> for TicketView {
    fn from(ticket: Ticket) -> Self {
        let ticket_code = (ticket.status == TicketStatus::Confirmed).then(|| ticket.ticket_code.into_inner());
        Self {
            ticket_id: ticket.id,
            payment_id: ticket.payment_id,
            screening_id: ticket.screening_id,
            seat_id: ticket.seat_id,
            price: ticket.price,
            status: ticket.status,
            ticket_code,
            created_at: ticket.created_at,
        }
    }
}
