use crate::error::{BookingError, BookingResult};
use cinebook_core::{LedgerTx, Screening, Seat, SeatKey};

/// Load the seat and screening behind `key`, rejecting unknown rows and seats
/// that are not in the screening's hall.
pub(crate) async fn resolve(tx: &mut dyn LedgerTx, key: SeatKey) -> BookingResult<(Seat, Screening)> {
    let screening = tx
        .screening(key.screening_id)
        .await?
        .ok_or_else(|| BookingError::Validation(format!("unknown screening {}", key.screening_id)))?;
    let seat = tx
        .seat(key.seat_id)
        .await?
        .ok_or_else(|| BookingError::Validation(format!("unknown seat {}", key.seat_id)))?;

    if seat.hall_id != screening.hall_id {
        return Err(BookingError::Validation(format!(
            "seat {} is not in the hall of screening {}",
            seat.id, screening.id
        )));
    }
    Ok((seat, screening))
}
