use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cinebook_core::models::UnknownStatus;
use cinebook_core::{
    ClaimKind, HallId, LedgerError, LedgerResult, LedgerTx, LockScope, NewPayment, NewReservation,
    NewTicket, Payment, PaymentId, PaymentStatus, Reservation, ReservationStatus, Screening,
    ScreeningId, ScreeningPrice, Seat, SeatClaim, SeatId, SeatKey, SeatLedger, SeatLock, Ticket, TicketId,
    TicketStatus, UserId,
};
use cinebook_shared::Masked;
use sqlx::{PgPool, Postgres, Transaction};
use std::str::FromStr;

/// Postgres-backed seat ledger. One `sqlx` transaction per [`LedgerTx`].
#[derive(Clone)]
pub struct PgSeatLedger {
    pool: PgPool,
}

impl PgSeatLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SeatLedger for PgSeatLedger {
    async fn begin(&self) -> LedgerResult<Box<dyn LedgerTx>> {
        let tx = self.pool.begin().await.map_err(db_err)?;
        Ok(Box::new(PgLedgerTx { tx }))
    }
}

pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

pub(crate) fn db_err(err: sqlx::Error) -> LedgerError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            LedgerError::Unavailable(err.to_string())
        }
        sqlx::Error::Database(db) => {
            // 40001 serialization_failure, 40P01 deadlock_detected
            if matches!(db.code().as_deref(), Some("40001") | Some("40P01")) {
                LedgerError::Unavailable(db.message().to_string())
            } else if db.is_unique_violation() || db.is_check_violation() || db.is_foreign_key_violation() {
                LedgerError::Constraint(db.message().to_string())
            } else {
                LedgerError::Backend(Box::new(sqlx::Error::Database(db)))
            }
        }
        other => LedgerError::Backend(Box::new(other)),
    }
}

fn parse_status<T>(value: &str) -> LedgerResult<T>
where
    T: FromStr<Err = UnknownStatus>,
{
    value.parse().map_err(|e: UnknownStatus| LedgerError::Corrupt(e.to_string()))
}

// Row shapes, converted into core models at the boundary

#[derive(sqlx::FromRow)]
struct SeatRow {
    id: i64,
    hall_id: i64,
    row_number: i32,
    column_number: i32,
    seat_label: String,
    category: String,
    status: String,
}

impl TryFrom<SeatRow> for Seat {
    type Error = LedgerError;

    fn try_from(row: SeatRow) -> LedgerResult<Self> {
        Ok(Seat {
            id: SeatId(row.id),
            hall_id: HallId(row.hall_id),
            row_number: row.row_number,
            column_number: row.column_number,
            label: row.seat_label,
            category: row.category,
            status: parse_status(&row.status)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ScreeningRow {
    id: i64,
    hall_id: i64,
    movie_id: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

impl From<ScreeningRow> for Screening {
    fn from(row: ScreeningRow) -> Self {
        Screening {
            id: ScreeningId(row.id),
            hall_id: HallId(row.hall_id),
            movie_id: row.movie_id,
            start_time: row.start_time,
            end_time: row.end_time,
        }
    }
}

#[derive(sqlx::FromRow)]
struct KeyRow {
    seat_id: i64,
    screening_id: i64,
}

impl From<KeyRow> for SeatKey {
    fn from(row: KeyRow) -> Self {
        SeatKey::new(SeatId(row.seat_id), ScreeningId(row.screening_id))
    }
}

#[derive(sqlx::FromRow)]
struct LockRow {
    seat_id: i64,
    screening_id: i64,
    user_id: String,
    locked_at: DateTime<Utc>,
}

impl From<LockRow> for SeatLock {
    fn from(row: LockRow) -> Self {
        SeatLock {
            seat_id: SeatId(row.seat_id),
            screening_id: ScreeningId(row.screening_id),
            user_id: UserId(row.user_id),
            locked_at: row.locked_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ClaimRow {
    user_id: String,
    source: String,
    expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<ClaimRow> for SeatClaim {
    type Error = LedgerError;

    fn try_from(row: ClaimRow) -> LedgerResult<Self> {
        let kind = match (row.source.as_str(), row.expires_at) {
            ("ticket", _) => ClaimKind::ConfirmedTicket,
            ("confirmed", _) => ClaimKind::ConfirmedReservation,
            ("pending", Some(expires_at)) => ClaimKind::PendingReservation { expires_at },
            (other, _) => return Err(LedgerError::Corrupt(format!("unexpected claim source: {}", other))),
        };
        Ok(SeatClaim { user_id: UserId(row.user_id), kind })
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    user_id: String,
    amount: i64,
    status: String,
    provider: String,
    provider_transaction_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = LedgerError;

    fn try_from(row: PaymentRow) -> LedgerResult<Self> {
        Ok(Payment {
            id: PaymentId(row.id),
            user_id: UserId(row.user_id),
            amount: row.amount,
            status: parse_status(&row.status)?,
            provider: row.provider,
            provider_transaction_id: row.provider_transaction_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: i64,
    user_id: String,
    screening_id: i64,
    seat_id: i64,
    payment_id: i64,
    price: i64,
    ticket_code: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = LedgerError;

    fn try_from(row: TicketRow) -> LedgerResult<Self> {
        Ok(Ticket {
            id: TicketId(row.id),
            user_id: UserId(row.user_id),
            screening_id: ScreeningId(row.screening_id),
            seat_id: SeatId(row.seat_id),
            payment_id: PaymentId(row.payment_id),
            price: row.price,
            ticket_code: Masked(row.ticket_code),
            status: parse_status(&row.status)?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: i64,
    seat_id: i64,
    screening_id: i64,
    user_id: String,
    payment_id: i64,
    status: String,
    created_at: DateTime<Utc>,
    expiration_time: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = LedgerError;

    fn try_from(row: ReservationRow) -> LedgerResult<Self> {
        Ok(Reservation {
            id: cinebook_core::ReservationId(row.id),
            seat_id: SeatId(row.seat_id),
            screening_id: ScreeningId(row.screening_id),
            user_id: UserId(row.user_id),
            payment_id: PaymentId(row.payment_id),
            status: parse_status(&row.status)?,
            created_at: row.created_at,
            expiration_time: row.expiration_time,
        })
    }
}

const SEAT_COLUMNS: &str = "id, hall_id, row_number, column_number, seat_label, category, status";
const PAYMENT_COLUMNS: &str =
    "id, user_id, amount, status, provider, provider_transaction_id, created_at, updated_at";
const TICKET_COLUMNS: &str =
    "id, user_id, screening_id, seat_id, payment_id, price, ticket_code, status, created_at";
const RESERVATION_COLUMNS: &str =
    "id, seat_id, screening_id, user_id, payment_id, status, created_at, expiration_time";

fn convert_all<R, T>(rows: Vec<R>) -> LedgerResult<Vec<T>>
where
    T: TryFrom<R, Error = LedgerError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn seat(&mut self, id: SeatId) -> LedgerResult<Option<Seat>> {
        let sql = format!("SELECT {} FROM seats WHERE id = $1", SEAT_COLUMNS);
        let row = sqlx::query_as::<_, SeatRow>(&sql)
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?;
        row.map(Seat::try_from).transpose()
    }

    async fn screening(&mut self, id: ScreeningId) -> LedgerResult<Option<Screening>> {
        let row = sqlx::query_as::<_, ScreeningRow>(
            "SELECT id, hall_id, movie_id, start_time, end_time FROM screenings WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(row.map(Screening::from))
    }

    async fn hall_seats(&mut self, hall_id: HallId) -> LedgerResult<Vec<Seat>> {
        let sql = format!(
            "SELECT {} FROM seats WHERE hall_id = $1 ORDER BY row_number, column_number",
            SEAT_COLUMNS
        );
        let rows = sqlx::query_as::<_, SeatRow>(&sql)
            .bind(hall_id.get())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_err)?;
        convert_all(rows)
    }

    async fn screening_price(&mut self, id: ScreeningId) -> LedgerResult<Option<ScreeningPrice>> {
        let row: Option<(i32, i64, i64)> = sqlx::query_as(
            r#"
            SELECT 0, bp.base_price, sp.price_modifier
            FROM screening_prices sp
            JOIN base_prices bp ON bp.id = sp.base_price_id
            WHERE sp.screening_id = $1
            UNION ALL
            SELECT 1, base_price, 0 FROM base_prices WHERE is_default
            ORDER BY 1
            LIMIT 1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(row.map(|(_, base_price, modifier)| ScreeningPrice { base_price, modifier }))
    }

    async fn category_modifier(&mut self, category: &str) -> LedgerResult<i64> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT price_modifier FROM seat_categories WHERE name = $1")
            .bind(category)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(row.map_or(0, |(modifier,)| modifier))
    }

    async fn purge_locks(&mut self, scope: LockScope, cutoff: DateTime<Utc>) -> LedgerResult<Vec<SeatKey>> {
        let rows = match scope {
            LockScope::Seat(key) => {
                sqlx::query_as::<_, KeyRow>(
                    r#"
                    DELETE FROM seat_locks
                    WHERE seat_id = $1 AND screening_id = $2 AND locked_at <= $3
                    RETURNING seat_id, screening_id
                    "#,
                )
                .bind(key.seat_id.get())
                .bind(key.screening_id.get())
                .bind(cutoff)
                .fetch_all(&mut *self.tx)
                .await
            }
            LockScope::All => {
                sqlx::query_as::<_, KeyRow>(
                    "DELETE FROM seat_locks WHERE locked_at <= $1 RETURNING seat_id, screening_id",
                )
                .bind(cutoff)
                .fetch_all(&mut *self.tx)
                .await
            }
        }
        .map_err(db_err)?;
        Ok(rows.into_iter().map(SeatKey::from).collect())
    }

    async fn lock(&mut self, key: SeatKey) -> LedgerResult<Option<SeatLock>> {
        let row = sqlx::query_as::<_, LockRow>(
            r#"
            SELECT seat_id, screening_id, user_id, locked_at
            FROM seat_locks
            WHERE seat_id = $1 AND screening_id = $2
            FOR UPDATE
            "#,
        )
        .bind(key.seat_id.get())
        .bind(key.screening_id.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(row.map(SeatLock::from))
    }

    async fn peek_lock(&mut self, key: SeatKey) -> LedgerResult<Option<SeatLock>> {
        let row = sqlx::query_as::<_, LockRow>(
            r#"
            SELECT seat_id, screening_id, user_id, locked_at
            FROM seat_locks
            WHERE seat_id = $1 AND screening_id = $2
            "#,
        )
        .bind(key.seat_id.get())
        .bind(key.screening_id.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(row.map(SeatLock::from))
    }

    async fn upsert_lock(
        &mut self,
        key: SeatKey,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> LedgerResult<Option<SeatLock>> {
        // The WHERE on the conflict arm makes this a compare-and-swap on the holder:
        // a foreign row is left alone and RETURNING yields nothing.
        let row = sqlx::query_as::<_, LockRow>(
            r#"
            INSERT INTO seat_locks (seat_id, screening_id, user_id, locked_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (seat_id, screening_id)
            DO UPDATE SET locked_at = EXCLUDED.locked_at
            WHERE seat_locks.user_id = EXCLUDED.user_id
            RETURNING seat_id, screening_id, user_id, locked_at
            "#,
        )
        .bind(key.seat_id.get())
        .bind(key.screening_id.get())
        .bind(user.as_str())
        .bind(now)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(row.map(SeatLock::from))
    }

    async fn delete_locks(
        &mut self,
        seat: SeatId,
        screening: Option<ScreeningId>,
        user: &UserId,
    ) -> LedgerResult<Vec<SeatKey>> {
        let rows = sqlx::query_as::<_, KeyRow>(
            r#"
            DELETE FROM seat_locks
            WHERE seat_id = $1 AND user_id = $2 AND ($3::BIGINT IS NULL OR screening_id = $3)
            RETURNING seat_id, screening_id
            "#,
        )
        .bind(seat.get())
        .bind(user.as_str())
        .bind(screening.map(ScreeningId::get))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(SeatKey::from).collect())
    }

    async fn touch_locks(
        &mut self,
        seat: SeatId,
        screening: Option<ScreeningId>,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> LedgerResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE seat_locks SET locked_at = $4
            WHERE seat_id = $1 AND user_id = $2 AND ($3::BIGINT IS NULL OR screening_id = $3)
            "#,
        )
        .bind(seat.get())
        .bind(user.as_str())
        .bind(screening.map(ScreeningId::get))
        .bind(now)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected())
    }

    async fn seat_claim(&mut self, key: SeatKey, now: DateTime<Utc>) -> LedgerResult<Option<SeatClaim>> {
        let row = sqlx::query_as::<_, ClaimRow>(
            r#"
            SELECT user_id, source, expires_at FROM (
                SELECT user_id, 'ticket' AS source, NULL::TIMESTAMPTZ AS expires_at, 0 AS rank
                FROM tickets
                WHERE seat_id = $1 AND screening_id = $2 AND status = 'confirmed'
                UNION ALL
                SELECT user_id, status AS source, expiration_time AS expires_at,
                       CASE WHEN status = 'confirmed' THEN 1 ELSE 2 END AS rank
                FROM seat_reservations
                WHERE seat_id = $1 AND screening_id = $2
                  AND (status = 'confirmed' OR (status = 'pending' AND expiration_time >= $3))
            ) claims
            ORDER BY rank
            LIMIT 1
            "#,
        )
        .bind(key.seat_id.get())
        .bind(key.screening_id.get())
        .bind(now)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        row.map(SeatClaim::try_from).transpose()
    }

    async fn insert_payment(&mut self, new: NewPayment) -> LedgerResult<Payment> {
        let sql = format!(
            r#"
            INSERT INTO payments (user_id, amount, status, provider, created_at, updated_at)
            VALUES ($1, $2, 'pending', $3, $4, $4)
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        );
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(new.user_id.as_str())
            .bind(new.amount)
            .bind(&new.provider)
            .bind(new.created_at)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Payment::try_from(row)
    }

    async fn insert_ticket(&mut self, new: NewTicket) -> LedgerResult<Ticket> {
        let sql = format!(
            r#"
            INSERT INTO tickets (user_id, screening_id, seat_id, payment_id, price, ticket_code, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $7)
            RETURNING {}
            "#,
            TICKET_COLUMNS
        );
        let row = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(new.user_id.as_str())
            .bind(new.key.screening_id.get())
            .bind(new.key.seat_id.get())
            .bind(new.payment_id.get())
            .bind(new.price)
            .bind(new.ticket_code.expose())
            .bind(new.created_at)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ticket::try_from(row)
    }

    async fn insert_reservation(&mut self, new: NewReservation) -> LedgerResult<Reservation> {
        let sql = format!(
            r#"
            INSERT INTO seat_reservations (seat_id, screening_id, user_id, payment_id, status, created_at, expiration_time)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6)
            RETURNING {}
            "#,
            RESERVATION_COLUMNS
        );
        let row = sqlx::query_as::<_, ReservationRow>(&sql)
            .bind(new.key.seat_id.get())
            .bind(new.key.screening_id.get())
            .bind(new.user_id.as_str())
            .bind(new.payment_id.get())
            .bind(new.created_at)
            .bind(new.expiration_time)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Reservation::try_from(row)
    }

    async fn payment(&mut self, id: PaymentId) -> LedgerResult<Option<Payment>> {
        let sql = format!("SELECT {} FROM payments WHERE id = $1 FOR UPDATE", PAYMENT_COLUMNS);
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?;
        row.map(Payment::try_from).transpose()
    }

    async fn set_payment_status(
        &mut self,
        id: PaymentId,
        status: PaymentStatus,
        provider_transaction_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> LedgerResult<()> {
        sqlx::query(
            r#"
            UPDATE payments
            SET status = $2,
                provider_transaction_id = COALESCE($3, provider_transaction_id),
                updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .bind(status.as_str())
        .bind(provider_transaction_id)
        .bind(now)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn payment_tickets(&mut self, id: PaymentId) -> LedgerResult<Vec<Ticket>> {
        let sql = format!("SELECT {} FROM tickets WHERE payment_id = $1 ORDER BY id", TICKET_COLUMNS);
        let rows = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(id.get())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_err)?;
        convert_all(rows)
    }

    async fn payment_reservations(&mut self, id: PaymentId) -> LedgerResult<Vec<Reservation>> {
        let sql = format!(
            "SELECT {} FROM seat_reservations WHERE payment_id = $1 ORDER BY id",
            RESERVATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, ReservationRow>(&sql)
            .bind(id.get())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_err)?;
        convert_all(rows)
    }

    async fn settle_payment_rows(
        &mut self,
        id: PaymentId,
        ticket_status: TicketStatus,
        reservation_status: ReservationStatus,
        now: DateTime<Utc>,
    ) -> LedgerResult<()> {
        // tickets_one_confirmed_per_seat rejects a second confirmed ticket here
        sqlx::query("UPDATE tickets SET status = $2, updated_at = $3 WHERE payment_id = $1")
            .bind(id.get())
            .bind(ticket_status.as_str())
            .bind(now)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;

        sqlx::query("UPDATE seat_reservations SET status = $2 WHERE payment_id = $1")
            .bind(id.get())
            .bind(reservation_status.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_pending_rows(&mut self, id: PaymentId) -> LedgerResult<Vec<SeatKey>> {
        let tickets = sqlx::query_as::<_, KeyRow>(
            "DELETE FROM tickets WHERE payment_id = $1 AND status = 'pending' RETURNING seat_id, screening_id",
        )
        .bind(id.get())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err)?;

        let reservations = sqlx::query_as::<_, KeyRow>(
            "DELETE FROM seat_reservations WHERE payment_id = $1 AND status = 'pending' RETURNING seat_id, screening_id",
        )
        .bind(id.get())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err)?;

        let mut keys: Vec<SeatKey> = tickets
            .into_iter()
            .chain(reservations)
            .map(SeatKey::from)
            .collect();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn expired_pending_payments(&mut self, now: DateTime<Utc>) -> LedgerResult<Vec<PaymentId>> {
        // SKIP LOCKED leaves payments that a confirm is settling right now to that confirm
        let ids: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT p.id FROM payments p
            WHERE p.status = 'pending'
              AND EXISTS (
                  SELECT 1 FROM seat_reservations r
                  WHERE r.payment_id = p.id AND r.status = 'pending' AND r.expiration_time < $1
              )
            ORDER BY p.id
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(now)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(ids.into_iter().map(|(id,)| PaymentId(id)).collect())
    }

    async fn ticket(&mut self, id: TicketId) -> LedgerResult<Option<Ticket>> {
        let sql = format!("SELECT {} FROM tickets WHERE id = $1 FOR UPDATE", TICKET_COLUMNS);
        let row = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?;
        row.map(Ticket::try_from).transpose()
    }

    async fn cancel_ticket(&mut self, ticket: &Ticket, now: DateTime<Utc>) -> LedgerResult<()> {
        sqlx::query("UPDATE tickets SET status = 'cancelled', updated_at = $2 WHERE id = $1")
            .bind(ticket.id.get())
            .bind(now)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;

        sqlx::query(
            r#"
            UPDATE seat_reservations SET status = 'cancelled'
            WHERE payment_id = $1 AND seat_id = $2 AND screening_id = $3
              AND status IN ('pending', 'confirmed')
            "#,
        )
        .bind(ticket.payment_id.get())
        .bind(ticket.seat_id.get())
        .bind(ticket.screening_id.get())
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn user_tickets(&mut self, user: &UserId, status: TicketStatus) -> LedgerResult<Vec<Ticket>> {
        let sql = format!(
            "SELECT {} FROM tickets WHERE user_id = $1 AND status = $2 ORDER BY created_at DESC, id DESC",
            TICKET_COLUMNS
        );
        let rows = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(user.as_str())
            .bind(status.as_str())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_err)?;
        convert_all(rows)
    }

    async fn commit(self: Box<Self>) -> LedgerResult<()> {
        self.tx.commit().await.map_err(db_err)
    }
}
