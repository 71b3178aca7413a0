use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use travelbook_core::{
    Booking, BookingDraft, BookingError, BookingId, BookingRepository, BookingStatus, CoreResult,
    Reservation,
};
use travelbook_shared::UserId;
use uuid::Uuid;

use crate::database::{is_unique_violation, storage_error};

const BOOKING_COLUMNS: &str =
    "booking_id, user_id, travel_option_id, seats, total_price, status, created_at, cancelled_at";

/// Postgres booking ledger.
///
/// Seat counts are only ever changed by single conditional `UPDATE`s, so the
/// row lock taken by that statement serializes concurrent writers on the same
/// travel option and the guard in its `WHERE` clause can never be bypassed.
pub struct StoreBookingRepository {
    pool: PgPool,
}

impl StoreBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    booking_id: String,
    user_id: String,
    travel_option_id: Uuid,
    seats: i32,
    total_price: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = BookingError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let corrupt = |e: String| BookingError::Storage(format!("booking {}: {}", row.booking_id, e));

        let booking_id = BookingId::parse(&row.booking_id).map_err(|e| corrupt(e.to_string()))?;
        let user_id = UserId::new(&row.user_id).map_err(|e| corrupt(e.to_string()))?;
        let status = row.status.parse::<BookingStatus>()?;

        Ok(Booking {
            booking_id,
            user_id,
            travel_option_id: row.travel_option_id,
            seats: row.seats,
            total_price: row.total_price,
            status,
            created_at: row.created_at,
            cancelled_at: row.cancelled_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SeatRow {
    price: Decimal,
    available_seats: i32,
}

async fn begin(pool: &PgPool) -> CoreResult<Transaction<'static, Postgres>> {
    pool.begin().await.map_err(storage_error)
}

#[async_trait]
impl BookingRepository for StoreBookingRepository {
    async fn reserve(&self, draft: BookingDraft) -> CoreResult<Reservation> {
        let mut tx = begin(&self.pool).await?;

        let taken = sqlx::query_as::<_, SeatRow>(
            r#"
            UPDATE travel_options
            SET available_seats = available_seats - $2
            WHERE id = $1 AND available_seats >= $2
            RETURNING price, available_seats
            "#,
        )
        .bind(draft.travel_option_id)
        .bind(draft.seats)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_error)?;

        let Some(seats) = taken else {
            // Tell an unknown option apart from a short one
            let available: Option<i32> =
                sqlx::query_scalar("SELECT available_seats FROM travel_options WHERE id = $1")
                    .bind(draft.travel_option_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(storage_error)?;

            return Err(match available {
                Some(available) => BookingError::InsufficientInventory {
                    requested: draft.seats,
                    available,
                },
                None => BookingError::NotFound(format!("travel option {}", draft.travel_option_id)),
            });
        };

        let booking = Booking::confirm(draft, seats.price)?;

        sqlx::query(
            r#"
            INSERT INTO bookings (booking_id, user_id, travel_option_id, seats, total_price, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(booking.booking_id.as_str())
        .bind(booking.user_id.as_str())
        .bind(booking.travel_option_id)
        .bind(booking.seats)
        .bind(booking.total_price)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                BookingError::DuplicateBookingId(booking.booking_id.to_string())
            } else {
                storage_error(e)
            }
        })?;

        tx.commit().await.map_err(storage_error)?;

        debug!(
            "Reserved {} seats on {} as {}",
            booking.seats, booking.travel_option_id, booking.booking_id
        );
        Ok(Reservation {
            booking,
            available_seats: seats.available_seats,
        })
    }

    async fn cancel(&self, user_id: &UserId, booking_id: &BookingId) -> CoreResult<Reservation> {
        let mut tx = begin(&self.pool).await?;

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE booking_id = $1 AND user_id = $2 FOR UPDATE",
            BOOKING_COLUMNS
        ))
        .bind(booking_id.as_str())
        .bind(user_id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| BookingError::NotFound(format!("booking {}", booking_id)))?;

        let mut booking = Booking::try_from(row)?;
        booking.cancel()?;

        let available_seats: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE travel_options
            SET available_seats = available_seats + $2
            WHERE id = $1 AND available_seats + $2 <= total_capacity
            RETURNING available_seats
            "#,
        )
        .bind(booking.travel_option_id)
        .bind(booking.seats)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_error)?;

        let available_seats = available_seats.ok_or_else(|| {
            BookingError::InvalidState(format!(
                "returning {} seats would exceed the capacity of travel option {}",
                booking.seats, booking.travel_option_id
            ))
        })?;

        sqlx::query("UPDATE bookings SET status = $2, cancelled_at = $3 WHERE booking_id = $1")
            .bind(booking.booking_id.as_str())
            .bind(booking.status.as_str())
            .bind(booking.cancelled_at)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;

        Ok(Reservation {
            booking,
            available_seats,
        })
    }

    async fn get_booking(&self, user_id: &UserId, booking_id: &BookingId) -> CoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE booking_id = $1 AND user_id = $2",
            BOOKING_COLUMNS
        ))
        .bind(booking_id.as_str())
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(Booking::try_from).transpose()
    }

    async fn list_bookings(&self, user_id: &UserId) -> CoreResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC, booking_id",
            BOOKING_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn remove_user(&self, user_id: &UserId) -> CoreResult<usize> {
        let mut tx = begin(&self.pool).await?;

        // Return the seats still held, then drop the ledger rows. Options are
        // updated in id order so concurrent removals lock them consistently.
        let restored = sqlx::query(
            r#"
            UPDATE travel_options t
            SET available_seats = t.available_seats + held.seats
            FROM (
                SELECT travel_option_id, SUM(seats)::INTEGER AS seats
                FROM bookings
                WHERE user_id = $1 AND status = 'confirmed'
                GROUP BY travel_option_id
                ORDER BY travel_option_id
            ) held
            WHERE t.id = held.travel_option_id
            "#,
        )
        .bind(user_id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_check_violation() => BookingError::InvalidState(
                "returning held seats would exceed a travel option's capacity".to_string(),
            ),
            other => storage_error(other),
        })?;

        let removed = sqlx::query("DELETE FROM bookings WHERE user_id = $1")
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;

        debug!(
            "Removed {} bookings of {} across {} travel options",
            removed.rows_affected(),
            user_id,
            restored.rows_affected()
        );
        Ok(removed.rows_affected() as usize)
    }
}
