use crate::error::{BookingError, BookingResult};
use crate::seats;
use cinebook_core::{LedgerError, ScreeningId, SeatId, SeatKey, SeatLedger};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub base_price: i64,
    pub screening_modifier: i64,
    pub category_modifier: i64,
    pub category_name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub seat_id: SeatId,
    pub screening_id: ScreeningId,
    pub price: i64,
    pub breakdown: PriceBreakdown,
}

/// Read-only seat price lookup: base price plus the screening and category
/// surcharges. Checkout does not consult it.
pub struct PriceQuotes {
    ledger: Arc<dyn SeatLedger>,
}

impl PriceQuotes {
    pub fn new(ledger: Arc<dyn SeatLedger>) -> Self {
        Self { ledger }
    }

    pub async fn quote(&self, key: SeatKey) -> BookingResult<PriceQuote> {
        let mut tx = self.ledger.begin().await?;
        let (seat, screening) = seats::resolve(tx.as_mut(), key).await?;

        let screening_price = tx
            .screening_price(screening.id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("price for screening {}", screening.id)))?;
        let category_modifier = tx.category_modifier(&seat.category).await?;

        let price = screening_price
            .base_price
            .checked_add(screening_price.modifier)
            .and_then(|p| p.checked_add(category_modifier))
            .ok_or_else(|| LedgerError::Corrupt(format!("price for {} overflows", key)))?;

        Ok(PriceQuote {
            seat_id: seat.id,
            screening_id: screening.id,
            price,
            breakdown: PriceBreakdown {
                base_price: screening_price.base_price,
                screening_modifier: screening_price.modifier,
                category_modifier,
                category_name: seat.category,
            },
        })
    }
}
